//! Crate-level tests for the harness.


use std::io;

use lumen_lifecycle::LifecycleError;
use rstest::rstest;

use crate::HarnessError;

#[rstest]
fn harness_cause_looks_through_lifecycle_failures() {
    let wrapped = HarnessError::from(LifecycleError::Failed {
        class: "Case".into(),
        method: "set_up".into(),
        source: Box::new(HarnessError::SetUpRepeated {
            class: "Case".into(),
        }),
    });
    assert!(matches!(
        wrapped.harness_cause(),
        Some(HarnessError::SetUpRepeated { .. })
    ));
    assert!(wrapped.to_string().contains("set_up was already called"));
}

#[rstest]
fn harness_cause_ignores_foreign_failures() {
    let foreign = HarnessError::from(LifecycleError::Failed {
        class: "Case".into(),
        method: "test_io".into(),
        source: Box::new(io::Error::other("disk full")),
    });
    assert!(foreign.harness_cause().is_none());
    assert!(HarnessError::ConflictingTolerance.harness_cause().is_none());
}
