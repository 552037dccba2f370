//! Lifecycle steps the base test case governs.

use lumen_lifecycle::MethodName;
use strum::{Display, EnumIter, IntoStaticStr};

/// Lifecycle methods every test case override must chain to its ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Lifecycle {
    /// Prepares one test instance.
    SetUp,
    /// Cleans up one test instance.
    TearDown,
    /// Prepares a test class before any of its tests run.
    SetUpClass,
    /// Cleans up a test class after all of its tests ran.
    TearDownClass,
}

impl Lifecycle {
    /// Method name of this lifecycle step.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Method slot of this lifecycle step.
    #[must_use]
    pub const fn method_name(self) -> MethodName {
        MethodName::from_static(match self {
            Self::SetUp => "set_up",
            Self::TearDown => "tear_down",
            Self::SetUpClass => "set_up_class",
            Self::TearDownClass => "tear_down_class",
        })
    }

    /// Returns `true` for steps dispatched on the class.
    #[must_use]
    pub const fn is_class_level(self) -> bool {
        matches!(self, Self::SetUpClass | Self::TearDownClass)
    }
}
