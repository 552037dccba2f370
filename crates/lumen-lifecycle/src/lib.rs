//! Cooperative-call enforcement for test lifecycle hierarchies.
//!
//! The `lumen-lifecycle` crate models a single-inheritance class hierarchy
//! as an explicit advice table. Every class owns a map from
//! [`MethodName`] to either a plain method body or a [`MethodAdvice`] that
//! runs `before` callbacks, the original body, and `after` callbacks in
//! sequence. Dispatch walks the ancestry of the receiver's class and calls
//! through the first entry it finds, so an overriding body reaches its
//! ancestor's implementation with [`Call::super_call`].
//!
//! On top of that table, [`CallEnforcer`] guarantees that every subclass
//! override of a governed method transitively invokes the ancestor
//! implementation. Violations surface as [`LifecycleError::Enforcement`] at
//! the end of the offending call.
//!
//! # Example
//!
//! ```
//! use lumen_lifecycle::{CallEnforcer, ClassSpec, Hierarchy, LifecycleError};
//!
//! type Spec = ClassSpec<Vec<&'static str>>;
//!
//! let mut hierarchy = Hierarchy::new();
//! let root = hierarchy
//!     .define_root(Spec::new("Base").method("set_up", |call| {
//!         call.state()?.push("base");
//!         Ok(())
//!     }))
//!     .expect("root defines");
//! CallEnforcer::new(["set_up"])
//!     .apply(&mut hierarchy, root)
//!     .expect("enforcement applies");
//!
//! let forgetful = hierarchy
//!     .define_subclass(
//!         root,
//!         Spec::new("Forgetful").method("set_up", |call| {
//!             call.state()?.push("forgetful");
//!             Ok(())
//!         }),
//!     )
//!     .expect("subclass defines");
//!
//! let mut instance = hierarchy.construct(forgetful, Vec::new()).expect("constructs");
//! let error = hierarchy
//!     .invoke(&mut instance, "set_up", &[])
//!     .expect_err("override never chained");
//! assert!(matches!(error, LifecycleError::Enforcement { .. }));
//! ```

pub mod advice;
pub mod enforcer;
pub mod error;
pub mod hierarchy;
mod record;

#[cfg(test)]
mod tests;

pub use self::advice::{Binding, Call, Callback, MethodAdvice, MethodFn, Receiver, callback};
pub use self::enforcer::CallEnforcer;
pub use self::error::LifecycleError;
pub use self::hierarchy::{ClassId, ClassSpec, Hierarchy, Instance, SubclassHook};
pub use self::record::{CallRecord, MethodName};
