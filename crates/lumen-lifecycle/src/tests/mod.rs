//! Crate-level integration and BDD tests.

use crate::{CallEnforcer, ClassSpec, Hierarchy, LifecycleError};


#[test]
fn enforcement_applies_to_classes_defined_before_and_after_hooks() {
    type Spec = ClassSpec<u32>;

    let mut hierarchy = Hierarchy::new();
    let root = hierarchy
        .define_root(Spec::new("Counter").method("set_up", |call| {
            *call.state()? += 1;
            Ok(())
        }))
        .expect("define root");
    CallEnforcer::new(["set_up"])
        .apply(&mut hierarchy, root)
        .expect("apply");
    let child = hierarchy
        .define_subclass(
            root,
            Spec::new("Twice").method("set_up", |call| {
                call.super_call()?;
                call.super_call()
            }),
        )
        .expect("define child");

    let mut instance = hierarchy.construct(child, 0).expect("construct");
    hierarchy
        .invoke(&mut instance, "set_up", &[])
        .expect("chained twice");
    assert_eq!(*instance.state(), 2);

    let forgetful = hierarchy
        .define_subclass(child, Spec::new("Forgetful").method("set_up", |_call| Ok(())))
        .expect("define grandchild");
    let mut instance = hierarchy.construct(forgetful, 0).expect("construct");
    let error = hierarchy
        .invoke(&mut instance, "set_up", &[])
        .expect_err("grandchild skipped");
    assert!(matches!(error, LifecycleError::Enforcement { .. }));
    assert_eq!(*instance.state(), 0);
}
