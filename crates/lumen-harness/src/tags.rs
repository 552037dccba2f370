use std::collections::BTreeSet;

/// Component names attached to a test so a run can be filtered to one
/// project or feature.
///
/// # Example
///
/// ```
/// use lumen_harness::ComponentTags;
///
/// let tags = ComponentTags::new(["terra", "backend"]);
/// assert!(tags.contains("backend"));
///
/// let skipped = ComponentTags::new(["nature"]).when(false);
/// assert!(skipped.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentTags {
    components: BTreeSet<String>,
}

impl ComponentTags {
    /// Creates tags for `components`.
    #[must_use]
    pub fn new<I, T>(components: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Keeps the tags only when `condition` holds.
    #[must_use]
    pub fn when(self, condition: bool) -> Self {
        if condition { self } else { Self::default() }
    }

    /// Adds the components of `other`.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.components.extend(other.components);
        self
    }

    /// Returns `true` if `component` is tagged.
    #[must_use]
    pub fn contains(&self, component: &str) -> bool {
        self.components.contains(component)
    }

    /// Tagged components, sorted.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(String::as_str)
    }

    /// Number of tagged components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` when nothing is tagged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
