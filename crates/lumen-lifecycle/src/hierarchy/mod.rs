//! Explicit class hierarchy with per-class advice tables.
//!
//! Classes are registered through [`Hierarchy::define_root`] and
//! [`Hierarchy::define_subclass`]. Each class owns its declared members;
//! dispatch walks from the receiver's class towards the root and runs the
//! first entry found. Subclass hooks registered on an ancestor run every time
//! a descendant finishes being defined, which is how enforcement reaches
//! overrides declared later.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::advice::{
    Binding, Call, Callback, Member, MethodAdvice, MethodDef, Receiver, callback,
};
use crate::error::LifecycleError;
use crate::record::{CallRecord, MethodName};

/// Tracing target for advice binding and dispatch.
const LIFECYCLE_TARGET: &str = "lumen_lifecycle::hierarchy";

/// Hook run after a descendant class has been defined.
pub type SubclassHook<S> = Rc<dyn Fn(&mut Hierarchy<S>, ClassId) -> Result<(), LifecycleError>>;

/// Handle to a class registered in a [`Hierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(usize);

impl ClassId {
    /// Raw index of the class within its hierarchy.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declaration of a class: its name and the methods it defines itself.
///
/// # Example
///
/// ```
/// use lumen_lifecycle::ClassSpec;
///
/// let spec: ClassSpec<()> = ClassSpec::new("Case")
///     .method("set_up", |_call| Ok(()))
///     .class_method("set_up_class", |_call| Ok(()));
/// assert_eq!(spec.name(), "Case");
/// ```
pub struct ClassSpec<S> {
    name: String,
    members: BTreeMap<MethodName, MethodDef<S>>,
}

impl<S> ClassSpec<S> {
    /// Starts a declaration with no members.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeMap::new(),
        }
    }

    /// Declares an instance method.
    #[must_use]
    pub fn method<F>(self, name: impl Into<MethodName>, body: F) -> Self
    where
        F: Fn(&mut Call<'_, '_, S>) -> Result<(), LifecycleError> + 'static,
    {
        self.member(name.into(), Rc::new(body), Binding::Instance)
    }

    /// Declares a class-level method.
    #[must_use]
    pub fn class_method<F>(self, name: impl Into<MethodName>, body: F) -> Self
    where
        F: Fn(&mut Call<'_, '_, S>) -> Result<(), LifecycleError> + 'static,
    {
        self.member(name.into(), Rc::new(body), Binding::Class)
    }

    /// Declares the constructor run by [`Hierarchy::construct`].
    #[must_use]
    pub fn constructor<F>(self, body: F) -> Self
    where
        F: Fn(&mut Call<'_, '_, S>) -> Result<(), LifecycleError> + 'static,
    {
        self.method(MethodName::CONSTRUCTOR, body)
    }

    /// Declares a method from an existing callback.
    #[must_use]
    pub fn member(mut self, name: MethodName, body: Callback<S>, binding: Binding) -> Self {
        self.members.insert(name, MethodDef::new(body, binding));
        self
    }

    /// Name of the class being declared.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// An object of some class in a [`Hierarchy`].
#[derive(Debug)]
pub struct Instance<S> {
    class: ClassId,
    record: CallRecord,
    state: S,
}

impl<S> Instance<S> {
    /// Class the instance was constructed as.
    #[must_use]
    pub const fn class(&self) -> ClassId {
        self.class
    }

    /// Instance state.
    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// Mutable instance state.
    pub const fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Record of governed calls made against this instance.
    #[must_use]
    pub const fn record(&self) -> &CallRecord {
        &self.record
    }

    pub(crate) const fn record_mut(&mut self) -> &mut CallRecord {
        &mut self.record
    }

    /// Consumes the instance, returning its state.
    #[must_use]
    pub fn into_state(self) -> S {
        self.state
    }
}

struct ClassDef<S> {
    name: String,
    parent: Option<ClassId>,
    members: BTreeMap<MethodName, Member<S>>,
    subclass_hooks: Vec<SubclassHook<S>>,
}

/// A single-inheritance class hierarchy backed by explicit advice tables.
pub struct Hierarchy<S> {
    classes: Vec<ClassDef<S>>,
    by_name: HashMap<String, ClassId>,
    class_records: RefCell<BTreeMap<ClassId, CallRecord>>,
}

impl<S> Default for Hierarchy<S> {
    fn default() -> Self {
        Self {
            classes: Vec::new(),
            by_name: HashMap::new(),
            class_records: RefCell::new(BTreeMap::new()),
        }
    }
}

impl<S> fmt::Debug for Hierarchy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hierarchy")
            .field(
                "classes",
                &self.classes.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl<S: 'static> Hierarchy<S> {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class with no parent.
    ///
    /// Roots without an explicit constructor receive an empty one, so
    /// construction advice always has a slot to bind to.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DuplicateClass`] if the name is taken.
    pub fn define_root(&mut self, mut spec: ClassSpec<S>) -> Result<ClassId, LifecycleError> {
        spec.members
            .entry(MethodName::CONSTRUCTOR)
            .or_insert_with(|| MethodDef::new(callback(|_call| Ok(())), Binding::Instance));
        self.insert_class(spec, None)
    }

    /// Registers a subclass of `parent` and runs inherited subclass hooks.
    ///
    /// If a hook fails the class is removed again and the error returned.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DuplicateClass`],
    /// [`LifecycleError::UnknownClass`], or any error raised by a hook.
    pub fn define_subclass(
        &mut self,
        parent: ClassId,
        spec: ClassSpec<S>,
    ) -> Result<ClassId, LifecycleError> {
        self.check_class(parent)?;
        let class = self.insert_class(spec, Some(parent))?;
        let hooks = self.inherited_hooks(parent);
        for hook in hooks {
            if let Err(error) = hook(self, class) {
                self.remove_last_class();
                return Err(error);
            }
        }
        Ok(class)
    }

    /// Binds advice to `method` on `class`.
    ///
    /// The nearest definition of `method` in the ancestry of `class` is
    /// located first. Existing advice is merged: `before` runs ahead of the
    /// callbacks already present and `after` runs behind them. A plain body
    /// is wrapped fresh. The result is installed on `class` itself. Binding
    /// with neither callback leaves the table unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnboundMethod`] if no class in the
    /// ancestry defines `method`.
    pub fn bind(
        &mut self,
        class: ClassId,
        method: impl Into<MethodName>,
        before: Option<Callback<S>>,
        after: Option<Callback<S>>,
    ) -> Result<(), LifecycleError> {
        let name = method.into();
        self.check_class(class)?;
        let (found_in, member) =
            self.resolve(class, &name)
                .ok_or_else(|| LifecycleError::UnboundMethod {
                    class: self.display_name(class),
                    method: name.to_string(),
                })?;
        if before.is_none() && after.is_none() {
            return Ok(());
        }
        let advice = match member {
            Member::Advised(existing) => existing.merge(before, after),
            Member::Plain(def) => MethodAdvice::wrap(def, found_in, before, after),
        };
        debug!(
            target: LIFECYCLE_TARGET,
            class = %self.display_name(class),
            method = %name,
            found_in = %self.display_name(found_in),
            before = advice.before_len(),
            after = advice.after_len(),
            "bound method advice"
        );
        if let Some(def) = self.classes.get_mut(class.0) {
            def.members.insert(name, Member::Advised(advice));
        }
        Ok(())
    }

    /// Registers a hook to run whenever a descendant of `class` is defined.
    ///
    /// Hooks inherited from an ancestor are copied onto `class` first, so
    /// descendants run the ancestor's hooks followed by this one.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownClass`] for a foreign identifier.
    pub fn add_subclass_hook(
        &mut self,
        class: ClassId,
        hook: SubclassHook<S>,
    ) -> Result<(), LifecycleError> {
        self.check_class(class)?;
        let inherited = self.inherited_hooks(class);
        if let Some(def) = self.classes.get_mut(class.0) {
            if def.subclass_hooks.is_empty() {
                def.subclass_hooks = inherited;
            }
            def.subclass_hooks.push(hook);
        }
        Ok(())
    }

    /// Constructs an instance of `class` and runs its constructor chain.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownClass`] or any constructor error.
    pub fn construct(&self, class: ClassId, state: S) -> Result<Instance<S>, LifecycleError> {
        self.check_class(class)?;
        let mut instance = Instance {
            class,
            record: CallRecord::new(),
            state,
        };
        self.dispatch_from(
            class,
            Receiver::Instance(&mut instance),
            &MethodName::CONSTRUCTOR,
            &[],
        )?;
        Ok(instance)
    }

    /// Dispatches `name` on an instance.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::MissingMethod`] when nothing defines the
    /// method, or any error raised by the advice chain or body.
    pub fn invoke(
        &self,
        instance: &mut Instance<S>,
        name: impl Into<MethodName>,
        args: &[String],
    ) -> Result<(), LifecycleError> {
        let class = instance.class;
        self.dispatch_from(class, Receiver::Instance(instance), &name.into(), args)
    }

    /// Dispatches a class-level `name` with `class` as the receiver.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ReceiverMismatch`] when `name` resolves to
    /// an instance method, plus the errors of [`Self::invoke`].
    pub fn invoke_class(
        &self,
        class: ClassId,
        name: impl Into<MethodName>,
        args: &[String],
    ) -> Result<(), LifecycleError> {
        self.check_class(class)?;
        self.dispatch_from(class, Receiver::Class(class), &name.into(), args)
    }

    /// Clears the class-level call record of `class`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::UnknownClass`] for a foreign identifier.
    pub fn reset_class_record(&self, class: ClassId) -> Result<(), LifecycleError> {
        self.check_class(class)?;
        self.with_class_record(class, CallRecord::reset);
        Ok(())
    }
}

impl<S> Hierarchy<S> {
    /// Looks a class up by name.
    #[must_use]
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Returns the name of `class`.
    #[must_use]
    pub fn class_name(&self, class: ClassId) -> Option<&str> {
        self.classes.get(class.0).map(|def| def.name.as_str())
    }

    /// Returns the direct parent of `class`.
    #[must_use]
    pub fn parent_of(&self, class: ClassId) -> Option<ClassId> {
        self.classes.get(class.0).and_then(|def| def.parent)
    }

    /// Iterates `class` and its ancestors, most specific first.
    pub fn ancestry(&self, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::successors(
            self.classes.get(class.0).map(|_| class),
            move |current| self.parent_of(*current),
        )
    }

    /// Returns `true` if `class` declares `name` itself.
    #[must_use]
    pub fn declares(&self, class: ClassId, name: &MethodName) -> bool {
        self.classes
            .get(class.0)
            .is_some_and(|def| def.members.contains_key(name))
    }

    /// Names declared directly on `class`, in sorted order.
    #[must_use]
    pub fn declared_methods(&self, class: ClassId) -> Vec<MethodName> {
        self.classes
            .get(class.0)
            .map(|def| def.members.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Advice installed directly on `class` for `name`, if any.
    #[must_use]
    pub fn advice(&self, class: ClassId, name: &MethodName) -> Option<&MethodAdvice<S>> {
        match self.classes.get(class.0)?.members.get(name)? {
            Member::Advised(advice) => Some(advice),
            Member::Plain(_) => None,
        }
    }

    /// Copy of the class-level call record of `class`.
    #[must_use]
    pub fn class_record(&self, class: ClassId) -> CallRecord {
        self.class_records
            .borrow()
            .get(&class)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of classes defined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` when no classes are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub(crate) fn resolves(&self, class: ClassId, name: &MethodName) -> bool {
        self.resolve(class, name).is_some()
    }

    pub(crate) fn display_name(&self, class: ClassId) -> String {
        self.class_name(class)
            .map_or_else(|| class.to_string(), str::to_owned)
    }

    pub(crate) fn with_class_record<T>(
        &self,
        class: ClassId,
        f: impl FnOnce(&mut CallRecord) -> T,
    ) -> T {
        let mut records = self.class_records.borrow_mut();
        f(records.entry(class).or_default())
    }

    pub(crate) fn dispatch_from(
        &self,
        start: ClassId,
        receiver: Receiver<'_, S>,
        name: &MethodName,
        args: &[String],
    ) -> Result<(), LifecycleError> {
        let receiver_class = receiver.class();
        let (found_in, member) =
            self.resolve(start, name)
                .ok_or_else(|| LifecycleError::MissingMethod {
                    class: self.display_name(receiver_class),
                    method: name.to_string(),
                })?;
        match member {
            Member::Plain(def) => {
                let bound = self.bind_receiver(receiver, def.binding(), name)?;
                let mut call = Call::new(self, bound, found_in, name.clone(), args);
                (def.body())(&mut call)
            }
            Member::Advised(advice) => {
                let bound = self.bind_receiver(receiver, advice.binding(), name)?;
                let mut call = Call::new(self, bound, advice.owner(), name.clone(), args);
                advice.run(&mut call)
            }
        }
    }

    fn bind_receiver<'r>(
        &self,
        receiver: Receiver<'r, S>,
        binding: Binding,
        name: &MethodName,
    ) -> Result<Receiver<'r, S>, LifecycleError> {
        match (binding, receiver) {
            (Binding::Class, receiver) => Ok(Receiver::Class(receiver.class())),
            (Binding::Instance, Receiver::Class(class)) => Err(LifecycleError::ReceiverMismatch {
                class: self.display_name(class),
                method: name.to_string(),
            }),
            (Binding::Instance, receiver) => Ok(receiver),
        }
    }

    fn resolve(&self, start: ClassId, name: &MethodName) -> Option<(ClassId, &Member<S>)> {
        self.ancestry(start).find_map(|class| {
            self.classes
                .get(class.0)
                .and_then(|def| def.members.get(name))
                .map(|member| (class, member))
        })
    }

    fn check_class(&self, class: ClassId) -> Result<(), LifecycleError> {
        if class.0 < self.classes.len() {
            Ok(())
        } else {
            Err(LifecycleError::UnknownClass { id: class.0 })
        }
    }

    fn insert_class(
        &mut self,
        spec: ClassSpec<S>,
        parent: Option<ClassId>,
    ) -> Result<ClassId, LifecycleError> {
        if self.by_name.contains_key(&spec.name) {
            return Err(LifecycleError::DuplicateClass { name: spec.name });
        }
        let class = ClassId(self.classes.len());
        let members = spec
            .members
            .into_iter()
            .map(|(name, def)| (name, Member::Plain(def)))
            .collect();
        self.by_name.insert(spec.name.clone(), class);
        self.classes.push(ClassDef {
            name: spec.name,
            parent,
            members,
            subclass_hooks: Vec::new(),
        });
        Ok(class)
    }

    fn remove_last_class(&mut self) {
        if let Some(def) = self.classes.pop() {
            self.by_name.remove(&def.name);
            let removed = ClassId(self.classes.len());
            self.class_records.borrow_mut().remove(&removed);
        }
    }

    fn inherited_hooks(&self, class: ClassId) -> Vec<SubclassHook<S>> {
        self.ancestry(class)
            .filter_map(|ancestor| self.classes.get(ancestor.0))
            .find(|def| !def.subclass_hooks.is_empty())
            .map(|def| def.subclass_hooks.clone())
            .unwrap_or_default()
    }
}
