//! Errors raised while defining classes and dispatching lifecycle calls.
//!
//! Every variant names the class and method involved so a failing test
//! report points straight at the offending override.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed error produced by a method body and carried through dispatch.
pub type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Errors arising from advice binding, class definition, or dispatch.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A governed override finished without reaching its ancestor.
    #[error(
        "parent '{method}' method was not called by '{class}.{method}'; \
         the override must call its ancestor implementation"
    )]
    Enforcement {
        /// Class whose override skipped the ancestor call.
        class: String,
        /// Governed method name.
        method: String,
    },

    /// Advice targeted a method defined nowhere in the class's ancestry.
    #[error("method '{method}' is not defined for class '{class}' or any of its ancestors")]
    UnboundMethod {
        /// Class the advice was bound on.
        class: String,
        /// Method that could not be located.
        method: String,
    },

    /// A call named a method that no class in the ancestry provides.
    #[error("'{class}' has no method '{method}'")]
    MissingMethod {
        /// Receiver class.
        class: String,
        /// Requested method.
        method: String,
    },

    /// A body asked for its ancestor implementation but none exists.
    #[error("'{class}.{method}' has no ancestor implementation to call")]
    NoAncestor {
        /// Class that owns the calling body.
        class: String,
        /// Method being chained.
        method: String,
    },

    /// An instance method was dispatched with a class receiver.
    #[error("instance method '{class}.{method}' requires an instance receiver")]
    ReceiverMismatch {
        /// Receiver class.
        class: String,
        /// Requested method.
        method: String,
    },

    /// A class with the same name is already part of the hierarchy.
    #[error("class '{name}' is already defined")]
    DuplicateClass {
        /// Conflicting class name.
        name: String,
    },

    /// A class identifier does not belong to this hierarchy.
    #[error("class id {id} is not part of this hierarchy")]
    UnknownClass {
        /// Raw identifier that was looked up.
        id: usize,
    },

    /// A method body failed for a reason of its own.
    #[error("'{class}.{method}' failed: {source}")]
    Failed {
        /// Receiver class.
        class: String,
        /// Method whose body failed.
        method: String,
        /// Error reported by the body.
        #[source]
        source: BoxedSource,
    },
}

impl LifecycleError {
    /// Returns the body error as `E` when this is a [`Self::Failed`] of that type.
    #[must_use]
    pub fn failure_source<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Failed { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}
