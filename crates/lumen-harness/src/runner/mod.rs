//! Runs test cases through their lifecycle.
//!
//! Each test gets a fresh instance. `set_up` runs first; when it fails the
//! body and `tear_down` are skipped. Otherwise the body runs and
//! `tear_down` follows whether or not the body failed, and the first error
//! observed is reported. Class-level steps bracket all the tests of a
//! class.

use lumen_lifecycle::{ClassId, MethodName};
use tracing::{info, warn};

use crate::case::{CaseState, TestSuite};
use crate::error::HarnessError;
use crate::lifecycle::Lifecycle;

const RUNNER_TARGET: &str = "lumen_harness::runner";

/// Outcome of one test.
#[derive(Debug)]
pub struct CaseReport {
    class: String,
    test: String,
    state: Option<CaseState>,
    error: Option<HarnessError>,
}

impl CaseReport {
    /// Name of the class the test ran on.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Name of the test method.
    #[must_use]
    pub fn test(&self) -> &str {
        &self.test
    }

    /// Final state of the instance, if it could be constructed.
    #[must_use]
    pub const fn state(&self) -> Option<&CaseState> {
        self.state.as_ref()
    }

    /// First error raised while running the test.
    #[must_use]
    pub const fn error(&self) -> Option<&HarnessError> {
        self.error.as_ref()
    }

    /// Returns `true` when the test ran without error.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of every selected test of a class.
#[derive(Debug)]
pub struct ClassReport {
    class: String,
    cases: Vec<CaseReport>,
    class_errors: Vec<HarnessError>,
}

impl ClassReport {
    /// Name of the class.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Reports of the tests that ran, in name order.
    #[must_use]
    pub fn cases(&self) -> &[CaseReport] {
        &self.cases
    }

    /// Errors raised by `set_up_class` or `tear_down_class`.
    #[must_use]
    pub fn class_errors(&self) -> &[HarnessError] {
        &self.class_errors
    }

    /// Returns `true` when every step of the class succeeded.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.class_errors.is_empty() && self.cases.iter().all(CaseReport::passed)
    }
}

/// Runs tests of a [`TestSuite`], optionally limited to one component.
#[derive(Debug)]
pub struct CaseRunner<'s> {
    suite: &'s TestSuite,
    component: Option<String>,
}

impl<'s> CaseRunner<'s> {
    /// Creates a runner for every test of `suite`.
    #[must_use]
    pub const fn new(suite: &'s TestSuite) -> Self {
        Self {
            suite,
            component: None,
        }
    }

    /// Restricts [`Self::run_class`] to tests tagged with `component`.
    #[must_use]
    pub fn only_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Tests of `class` this runner selects.
    #[must_use]
    pub fn selected_tests(&self, class: ClassId) -> Vec<String> {
        let mut tests = self.suite.test_names(class);
        if let Some(component) = &self.component {
            tests.retain(|test| self.suite.tags_for(class, test).contains(component));
        }
        tests
    }

    /// Runs `test` on a fresh instance of `class`.
    #[must_use]
    pub fn run_case(&self, class: ClassId, test: &str) -> CaseReport {
        let hierarchy = self.suite.hierarchy();
        let class_name = hierarchy
            .class_name(class)
            .map_or_else(|| class.to_string(), str::to_owned);
        let mut instance = match hierarchy.construct(class, CaseState::new(test)) {
            Ok(instance) => instance,
            Err(error) => {
                return finish(CaseReport {
                    class: class_name,
                    test: test.to_owned(),
                    state: None,
                    error: Some(error.into()),
                });
            }
        };

        let error = match hierarchy.invoke(&mut instance, Lifecycle::SetUp.method_name(), &[]) {
            Err(error) => Some(error),
            Ok(()) => {
                let body = hierarchy.invoke(&mut instance, MethodName::from(test.to_owned()), &[]);
                let tear_down =
                    hierarchy.invoke(&mut instance, Lifecycle::TearDown.method_name(), &[]);
                body.err().or_else(|| tear_down.err())
            }
        };
        finish(CaseReport {
            class: class_name,
            test: test.to_owned(),
            state: Some(instance.into_state()),
            error: error.map(HarnessError::from),
        })
    }

    /// Runs `set_up_class`, every selected test, then `tear_down_class`.
    ///
    /// When `set_up_class` fails neither the tests nor `tear_down_class`
    /// run.
    #[must_use]
    pub fn run_class(&self, class: ClassId) -> ClassReport {
        let hierarchy = self.suite.hierarchy();
        let mut class_errors = Vec::new();
        let mut cases = Vec::new();
        match hierarchy.invoke_class(class, Lifecycle::SetUpClass.method_name(), &[]) {
            Ok(()) => {
                cases = self
                    .selected_tests(class)
                    .iter()
                    .map(|test| self.run_case(class, test))
                    .collect();
                if let Err(error) =
                    hierarchy.invoke_class(class, Lifecycle::TearDownClass.method_name(), &[])
                {
                    class_errors.push(HarnessError::from(error));
                }
            }
            Err(error) => class_errors.push(HarnessError::from(error)),
        }
        let report = ClassReport {
            class: hierarchy
                .class_name(class)
                .map_or_else(|| class.to_string(), str::to_owned),
            cases,
            class_errors,
        };
        info!(
            target: RUNNER_TARGET,
            class = %report.class,
            tests = report.cases.len(),
            passed = report.passed(),
            "class finished"
        );
        report
    }
}

fn finish(report: CaseReport) -> CaseReport {
    match &report.error {
        None => info!(
            target: RUNNER_TARGET,
            class = %report.class,
            test = %report.test,
            "test passed"
        ),
        Some(error) => warn!(
            target: RUNNER_TARGET,
            class = %report.class,
            test = %report.test,
            error = %error,
            "test failed"
        ),
    }
    report
}
