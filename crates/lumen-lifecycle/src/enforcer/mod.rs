//! Enforcement that governed overrides call their ancestor implementation.
//!
//! Applying a [`CallEnforcer`] to a root class installs three kinds of
//! advice:
//!
//! - the root's constructor gains an `after` callback that clears the
//!   instance's [`CallRecord`](crate::CallRecord);
//! - every governed method on the root gains a `before` callback that marks
//!   the method as called;
//! - a subclass hook wraps each governed method a descendant declares
//!   itself, clearing the mark before the override runs and requiring it
//!   afterwards.
//!
//! Because ancestor calls resolve above the class that owns the executing
//! body, a chain of overrides across several generations checks each level
//! independently, and the root marker fires only when the chain actually
//! reaches it.

use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::advice::{Callback, callback};
use crate::error::LifecycleError;
use crate::hierarchy::{ClassId, Hierarchy};
use crate::record::MethodName;

/// Tracing target for enforcement decisions and violations.
const ENFORCER_TARGET: &str = "lumen_lifecycle::enforcer";

/// Requires overrides of a fixed set of methods to chain to their ancestor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallEnforcer {
    methods: BTreeSet<MethodName>,
}

impl CallEnforcer {
    /// Creates an enforcer governing `methods`.
    ///
    /// # Example
    ///
    /// ```
    /// use lumen_lifecycle::{CallEnforcer, MethodName};
    ///
    /// let enforcer = CallEnforcer::new(["set_up", "tear_down"]);
    /// assert!(enforcer.governs(&MethodName::from("set_up")));
    /// ```
    #[must_use]
    pub fn new<I, N>(methods: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<MethodName>,
    {
        Self {
            methods: methods.into_iter().map(Into::into).collect(),
        }
    }

    /// Governed method names, sorted.
    pub fn methods(&self) -> impl Iterator<Item = &MethodName> {
        self.methods.iter()
    }

    /// Returns `true` if `name` is governed.
    #[must_use]
    pub fn governs(&self, name: &MethodName) -> bool {
        self.methods.contains(name)
    }

    /// Installs enforcement on `class` and every descendant defined later.
    ///
    /// The class-level record of `class` is cleared first, so applying to a
    /// class whose class-level methods already ran starts from a clean
    /// slate.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnboundMethod`] when a governed name is
    /// not defined on `class` or any of its ancestors, or
    /// [`LifecycleError::UnknownClass`] for a foreign identifier.
    pub fn apply<S: 'static>(
        &self,
        hierarchy: &mut Hierarchy<S>,
        class: ClassId,
    ) -> Result<(), LifecycleError> {
        hierarchy.reset_class_record(class)?;
        hierarchy.bind(class, MethodName::CONSTRUCTOR, None, Some(arm_record()))?;
        for name in &self.methods {
            hierarchy.bind(class, name.clone(), Some(mark_called(name.clone())), None)?;
        }
        let methods = self.methods.clone();
        hierarchy.add_subclass_hook(
            class,
            Rc::new(move |hierarchy: &mut Hierarchy<S>, subclass: ClassId| {
                wrap_overrides(hierarchy, subclass, &methods)
            }),
        )?;
        debug!(
            target: ENFORCER_TARGET,
            class = hierarchy.class_name(class).unwrap_or_default(),
            methods = self.methods.len(),
            "call enforcement applied"
        );
        Ok(())
    }
}

fn wrap_overrides<S: 'static>(
    hierarchy: &mut Hierarchy<S>,
    subclass: ClassId,
    methods: &BTreeSet<MethodName>,
) -> Result<(), LifecycleError> {
    for name in hierarchy.declared_methods(subclass) {
        if !methods.contains(&name) {
            continue;
        }
        hierarchy.bind(
            subclass,
            name.clone(),
            Some(clear_called(name.clone())),
            Some(require_called(name)),
        )?;
    }
    Ok(())
}

fn arm_record<S: 'static>() -> Callback<S> {
    callback(|call| {
        call.with_record(|record| record.reset());
        Ok(())
    })
}

fn mark_called<S: 'static>(name: MethodName) -> Callback<S> {
    callback(move |call| {
        call.with_record(|record| record.mark(&name));
        Ok(())
    })
}

fn clear_called<S: 'static>(name: MethodName) -> Callback<S> {
    callback(move |call| {
        call.with_record(|record| record.clear(&name));
        Ok(())
    })
}

fn require_called<S: 'static>(name: MethodName) -> Callback<S> {
    callback(move |call| {
        if call.with_record(|record| record.contains(&name)) {
            return Ok(());
        }
        let class = call
            .hierarchy()
            .class_name(call.owner())
            .map_or_else(|| call.owner().to_string(), str::to_owned);
        warn!(
            target: ENFORCER_TARGET,
            class = %class,
            method = %name,
            "override did not call its ancestor implementation"
        );
        Err(LifecycleError::Enforcement {
            class,
            method: name.to_string(),
        })
    })
}
