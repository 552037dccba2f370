//! Method advice: before and after callbacks wrapped around a method body.
//!
//! A [`MethodAdvice`] replaces a method slot in a class's advice table. When
//! dispatched it binds the receiver (the instance, or the class for
//! class-level methods), runs every `before` callback, runs the original
//! body, then runs every `after` callback. Callback results are discarded;
//! the first error stops the chain and propagates, so `after` callbacks only
//! observe normal completion of the body.

use std::error::Error as StdError;
use std::rc::Rc;

use crate::error::LifecycleError;
use crate::hierarchy::{ClassId, Hierarchy, Instance};
use crate::record::{CallRecord, MethodName};

/// Signature shared by method bodies and advice callbacks.
pub type MethodFn<S> = dyn Fn(&mut Call<'_, '_, S>) -> Result<(), LifecycleError>;

/// Shared handle to a method body or advice callback.
pub type Callback<S> = Rc<MethodFn<S>>;

/// Wraps a closure as a [`Callback`], fixing its signature for inference.
///
/// # Example
///
/// ```
/// use lumen_lifecycle::{Callback, callback};
///
/// let count_calls: Callback<u32> = callback(|call| {
///     *call.state()? += 1;
///     Ok(())
/// });
/// # drop(count_calls);
/// ```
pub fn callback<S, F>(body: F) -> Callback<S>
where
    F: Fn(&mut Call<'_, '_, S>) -> Result<(), LifecycleError> + 'static,
{
    Rc::new(body)
}

/// Receiver a method expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Invoked with the owning instance.
    Instance,
    /// Invoked with the class, even when reached through an instance.
    Class,
}

/// A plain, unadvised method body.
pub(crate) struct MethodDef<S> {
    body: Callback<S>,
    binding: Binding,
}

impl<S> MethodDef<S> {
    pub(crate) const fn new(body: Callback<S>, binding: Binding) -> Self {
        Self { body, binding }
    }

    pub(crate) const fn binding(&self) -> Binding {
        self.binding
    }

    pub(crate) fn body(&self) -> &MethodFn<S> {
        self.body.as_ref()
    }
}

/// Entry stored under a method name in a class's advice table.
pub(crate) enum Member<S> {
    Plain(MethodDef<S>),
    Advised(MethodAdvice<S>),
}

/// A method body together with its ordered `before` and `after` callbacks.
///
/// Advice is never mutated: rebinding the same name produces a new value
/// whose `before` chain starts with the newest callback and whose `after`
/// chain ends with it.
pub struct MethodAdvice<S> {
    target: Callback<S>,
    owner: ClassId,
    binding: Binding,
    before: Vec<Callback<S>>,
    after: Vec<Callback<S>>,
}

impl<S> MethodAdvice<S> {
    /// Wraps a plain body defined on `owner`.
    pub(crate) fn wrap(
        def: &MethodDef<S>,
        owner: ClassId,
        before: Option<Callback<S>>,
        after: Option<Callback<S>>,
    ) -> Self {
        Self {
            target: Rc::clone(&def.body),
            owner,
            binding: def.binding,
            before: before.into_iter().collect(),
            after: after.into_iter().collect(),
        }
    }

    /// Folds new callbacks into a copy of this advice.
    pub(crate) fn merge(&self, before: Option<Callback<S>>, after: Option<Callback<S>>) -> Self {
        let mut merged_before: Vec<Callback<S>> = before.into_iter().collect();
        merged_before.extend(self.before.iter().cloned());
        let mut merged_after = self.after.clone();
        merged_after.extend(after);
        Self {
            target: Rc::clone(&self.target),
            owner: self.owner,
            binding: self.binding,
            before: merged_before,
            after: merged_after,
        }
    }

    /// Class whose body this advice wraps; ancestor calls resolve above it.
    #[must_use]
    pub const fn owner(&self) -> ClassId {
        self.owner
    }

    /// Receiver the wrapped body expects.
    #[must_use]
    pub const fn binding(&self) -> Binding {
        self.binding
    }

    /// Number of callbacks run before the body.
    #[must_use]
    pub fn before_len(&self) -> usize {
        self.before.len()
    }

    /// Number of callbacks run after the body.
    #[must_use]
    pub fn after_len(&self) -> usize {
        self.after.len()
    }

    pub(crate) fn run(&self, call: &mut Call<'_, '_, S>) -> Result<(), LifecycleError> {
        for before in &self.before {
            before(call)?;
        }
        (self.target)(call)?;
        for after in &self.after {
            after(call)?;
        }
        Ok(())
    }
}

/// Receiver of a dispatched call.
pub enum Receiver<'r, S> {
    /// An instance; its own [`CallRecord`] is used.
    Instance(&'r mut Instance<S>),
    /// A class; the hierarchy's class-level record for it is used.
    Class(ClassId),
}

impl<S> Receiver<'_, S> {
    /// Dynamic class of the receiver.
    #[must_use]
    pub fn class(&self) -> ClassId {
        match self {
            Self::Instance(instance) => instance.class(),
            Self::Class(class) => *class,
        }
    }

    /// Borrows the receiver again for a nested call.
    pub fn reborrow(&mut self) -> Receiver<'_, S> {
        match self {
            Self::Instance(instance) => Receiver::Instance(&mut **instance),
            Self::Class(class) => Receiver::Class(*class),
        }
    }
}

/// Context handed to a method body or advice callback.
///
/// Gives access to the receiver's state and call record, and lets a body
/// reach its ancestor implementation.
pub struct Call<'h, 'r, S> {
    hierarchy: &'h Hierarchy<S>,
    receiver: Receiver<'r, S>,
    owner: ClassId,
    method: MethodName,
    args: &'r [String],
}

impl<'h, 'r, S> Call<'h, 'r, S> {
    pub(crate) const fn new(
        hierarchy: &'h Hierarchy<S>,
        receiver: Receiver<'r, S>,
        owner: ClassId,
        method: MethodName,
        args: &'r [String],
    ) -> Self {
        Self {
            hierarchy,
            receiver,
            owner,
            method,
            args,
        }
    }

    /// Hierarchy the call is dispatched through.
    #[must_use]
    pub const fn hierarchy(&self) -> &'h Hierarchy<S> {
        self.hierarchy
    }

    /// Name of the method being executed.
    #[must_use]
    pub const fn method(&self) -> &MethodName {
        &self.method
    }

    /// Class that defines the executing body.
    #[must_use]
    pub const fn owner(&self) -> ClassId {
        self.owner
    }

    /// Dynamic class of the receiver.
    #[must_use]
    pub fn receiver_class(&self) -> ClassId {
        self.receiver.class()
    }

    /// Returns `true` when the receiver is a class rather than an instance.
    #[must_use]
    pub const fn is_class_call(&self) -> bool {
        matches!(self.receiver, Receiver::Class(_))
    }

    /// Arguments passed to the call.
    #[must_use]
    pub const fn args(&self) -> &[String] {
        self.args
    }

    /// Mutable access to the receiving instance's state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ReceiverMismatch`] for class-level calls.
    pub fn state(&mut self) -> Result<&mut S, LifecycleError> {
        match &mut self.receiver {
            Receiver::Instance(instance) => Ok(instance.state_mut()),
            Receiver::Class(class) => Err(LifecycleError::ReceiverMismatch {
                class: self.hierarchy.display_name(*class),
                method: self.method.to_string(),
            }),
        }
    }

    /// Runs `f` against the receiver's call record.
    pub fn with_record<T>(&mut self, f: impl FnOnce(&mut CallRecord) -> T) -> T {
        match &mut self.receiver {
            Receiver::Instance(instance) => f(instance.record_mut()),
            Receiver::Class(class) => self.hierarchy.with_class_record(*class, f),
        }
    }

    /// Calls the ancestor implementation of the executing method.
    ///
    /// Resolution starts at the parent of [`Self::owner`], so advice
    /// installed on ancestors runs exactly as for a direct call.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NoAncestor`] when no ancestor defines the
    /// method, or any error raised along the ancestor chain.
    pub fn super_call(&mut self) -> Result<(), LifecycleError> {
        let hierarchy = self.hierarchy;
        let start = hierarchy
            .parent_of(self.owner)
            .filter(|parent| hierarchy.resolves(*parent, &self.method))
            .ok_or_else(|| LifecycleError::NoAncestor {
                class: hierarchy.display_name(self.owner),
                method: self.method.to_string(),
            })?;
        hierarchy.dispatch_from(start, self.receiver.reborrow(), &self.method, self.args)
    }

    /// Dispatches another method on the same receiver.
    ///
    /// # Errors
    ///
    /// Propagates any dispatch error.
    pub fn call_method(
        &mut self,
        name: impl Into<MethodName>,
        args: &[String],
    ) -> Result<(), LifecycleError> {
        let start = self.receiver.class();
        self.hierarchy
            .dispatch_from(start, self.receiver.reborrow(), &name.into(), args)
    }

    /// Wraps a body-specific error as [`LifecycleError::Failed`].
    #[must_use]
    pub fn fail(&self, source: impl StdError + Send + Sync + 'static) -> LifecycleError {
        LifecycleError::Failed {
            class: self.hierarchy.display_name(self.receiver.class()),
            method: self.method.to_string(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests;
