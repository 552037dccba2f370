//! Method names and the per-receiver record of completed ancestor calls.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

/// Name of a method slot in a class's advice table.
///
/// # Example
///
/// ```
/// use lumen_lifecycle::MethodName;
///
/// let name = MethodName::from("set_up");
/// assert_eq!(name.as_str(), "set_up");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodName(Cow<'static, str>);

impl MethodName {
    /// Slot holding the constructor run by [`crate::Hierarchy::construct`].
    pub const CONSTRUCTOR: Self = Self(Cow::Borrowed("__construct__"));

    /// Creates a name from a static string without allocating.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for MethodName {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for MethodName {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&MethodName> for MethodName {
    fn from(name: &MethodName) -> Self {
        name.clone()
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of governed methods whose ancestor marker ran for one receiver.
///
/// Instances own their record; class-level calls use a record held by the
/// hierarchy for each class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallRecord {
    called: BTreeSet<MethodName>,
}

impl CallRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the ancestor implementation of `name` was entered.
    pub fn mark(&mut self, name: &MethodName) {
        self.called.insert(name.clone());
    }

    /// Forgets `name`, returning whether it was present.
    pub fn clear(&mut self, name: &MethodName) -> bool {
        self.called.remove(name)
    }

    /// Returns whether `name` has been marked since it was last cleared.
    #[must_use]
    pub fn contains(&self, name: &MethodName) -> bool {
        self.called.contains(name)
    }

    /// Drops every mark.
    pub fn reset(&mut self) {
        self.called.clear();
    }

    /// Returns `true` when nothing is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.called.is_empty()
    }
}
