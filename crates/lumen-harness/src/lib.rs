//! Base test case, lifecycle runner and assertion helpers for lumen.
//!
//! The `lumen-harness` crate ties the workspace together. A [`TestSuite`]
//! defines the [`BASE_CASE`] class on a lifecycle hierarchy and governs
//! `set_up`, `tear_down`, `set_up_class` and `tear_down_class` with a
//! [`lumen_lifecycle::CallEnforcer`], so every derived case must chain to
//! its ancestor. The base `set_up` loads configuration, initialises
//! telemetry, resolves the backend and records the test timeout through an
//! [`Environment`]. A [`CaseRunner`] drives instances through that
//! lifecycle and reports the first failure of each test.
//!
//! # Example
//!
//! ```
//! use lumen_config::StaticConfig;
//! use lumen_harness::{CaseRunner, CaseSpec, Environment, TestSuite};
//! use lumen_plugins::EntryPoints;
//!
//! let mut entry_points = EntryPoints::new();
//! lumen_plugin_sim::register(&mut entry_points).expect("simulator registers");
//! let mut suite = TestSuite::new(Environment::new(StaticConfig::empty(), entry_points))
//!     .expect("base case defines");
//! let case = suite
//!     .define_case(CaseSpec::new("SimulatorCase").method("test_backend", |call| {
//!         let name = call.state()?.backend().map(|backend| backend.name().to_owned());
//!         call.state()?.note(name.unwrap_or_default());
//!         Ok(())
//!     }))
//!     .expect("case defines");
//!
//! let report = CaseRunner::new(&suite).run_case(case, "test_backend");
//! assert!(report.passed());
//! ```

mod assertions;
mod case;
mod error;
mod lifecycle;
mod runner;
mod tags;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use self::assertions::{
    AlmostEqual, DEFAULT_DELTA, assert_dicts_almost_equal, dicts_almost_equal,
};
pub use self::case::{BASE_CASE, CaseCall, CaseSpec, CaseState, Environment, TestSuite};
pub use self::error::HarnessError;
pub use self::lifecycle::Lifecycle;
pub use self::runner::{CaseReport, CaseRunner, ClassReport};
pub use self::tags::ComponentTags;
pub use self::telemetry::{TelemetryError, TelemetryHandle, TelemetrySettings};
