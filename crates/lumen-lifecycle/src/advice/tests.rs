//! Unit tests for advice chaining and receiver binding.

use std::io;

use rstest::{fixture, rstest};

use crate::advice::{Callback, callback};
use crate::error::LifecycleError;
use crate::hierarchy::{ClassId, ClassSpec, Hierarchy};
use crate::record::MethodName;

type Trace = Vec<&'static str>;
type Spec = ClassSpec<Trace>;

fn push(label: &'static str) -> Callback<Trace> {
    callback::<Trace, _>(move |call| {
        call.state()?.push(label);
        Ok(())
    })
}

struct Fixture {
    hierarchy: Hierarchy<Trace>,
    root: ClassId,
}

#[fixture]
fn fixture() -> Fixture {
    let mut hierarchy = Hierarchy::new();
    let root = hierarchy
        .define_root(
            Spec::new("Root")
                .method("run", |call| {
                    call.state()?.push("body");
                    Ok(())
                })
                .method("explode", |call| {
                    call.state()?.push("exploding");
                    Err(call.fail(io::Error::other("boom")))
                })
                .class_method("prepare", |call| {
                    let method = call.method().clone();
                    call.with_record(|record| record.mark(&method));
                    if call.is_class_call() {
                        Ok(())
                    } else {
                        Err(call.fail(io::Error::other("expected class receiver")))
                    }
                }),
        )
        .expect("define root");
    Fixture { hierarchy, root }
}

fn run(hierarchy: &Hierarchy<Trace>, class: ClassId, method: &'static str) -> Trace {
    let mut instance = hierarchy.construct(class, Vec::new()).expect("construct");
    hierarchy
        .invoke(&mut instance, method, &[])
        .expect("invoke succeeds");
    instance.into_state()
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[rstest]
fn before_and_after_surround_body(fixture: Fixture) {
    let Fixture {
        mut hierarchy,
        root,
    } = fixture;
    hierarchy
        .bind(root, "run", Some(push("before")), Some(push("after")))
        .expect("bind");
    assert_eq!(run(&hierarchy, root, "run"), vec!["before", "body", "after"]);
}

#[rstest]
fn rebinding_prepends_before_and_appends_after(fixture: Fixture) {
    let Fixture {
        mut hierarchy,
        root,
    } = fixture;
    hierarchy
        .bind(root, "run", Some(push("b1")), Some(push("a1")))
        .expect("first bind");
    hierarchy
        .bind(root, "run", Some(push("b2")), Some(push("a2")))
        .expect("second bind");
    assert_eq!(
        run(&hierarchy, root, "run"),
        vec!["b2", "b1", "body", "a1", "a2"]
    );
    let advice = hierarchy
        .advice(root, &MethodName::from("run"))
        .expect("advice installed");
    assert_eq!(advice.before_len(), 2);
    assert_eq!(advice.after_len(), 2);
    assert_eq!(advice.owner(), root);
}

#[rstest]
fn binding_on_subclass_copies_ancestor_advice(fixture: Fixture) {
    let Fixture {
        mut hierarchy,
        root,
    } = fixture;
    hierarchy
        .bind(root, "run", Some(push("root-before")), None)
        .expect("bind root");
    let child = hierarchy
        .define_subclass(root, Spec::new("Child"))
        .expect("define child");
    hierarchy
        .bind(child, "run", Some(push("child-before")), None)
        .expect("bind child");

    assert_eq!(
        run(&hierarchy, child, "run"),
        vec!["child-before", "root-before", "body"]
    );
    assert_eq!(run(&hierarchy, root, "run"), vec!["root-before", "body"]);
    assert!(hierarchy.declares(child, &MethodName::from("run")));
}

#[rstest]
fn binding_without_callbacks_leaves_method_plain(fixture: Fixture) {
    let Fixture {
        mut hierarchy,
        root,
    } = fixture;
    hierarchy.bind(root, "run", None, None).expect("bind");
    assert!(hierarchy.advice(root, &MethodName::from("run")).is_none());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[rstest]
fn failing_body_skips_after_callbacks(fixture: Fixture) {
    let Fixture {
        mut hierarchy,
        root,
    } = fixture;
    hierarchy
        .bind(root, "explode", Some(push("before")), Some(push("after")))
        .expect("bind");
    let mut instance = hierarchy.construct(root, Vec::new()).expect("construct");
    let error = hierarchy
        .invoke(&mut instance, "explode", &[])
        .expect_err("body fails");
    assert!(matches!(error, LifecycleError::Failed { .. }));
    assert!(error.failure_source::<io::Error>().is_some());
    assert_eq!(instance.state(), &vec!["before", "exploding"]);
}

#[rstest]
fn binding_unknown_method_is_rejected(fixture: Fixture) {
    let Fixture {
        mut hierarchy,
        root,
    } = fixture;
    let error = hierarchy
        .bind(root, "missing", Some(push("before")), None)
        .expect_err("nothing defines missing");
    assert!(matches!(error, LifecycleError::UnboundMethod { .. }));
    assert!(error.to_string().contains("Root"));
}

// ---------------------------------------------------------------------------
// Receivers
// ---------------------------------------------------------------------------

#[rstest]
fn class_method_reached_through_instance_binds_class(fixture: Fixture) {
    let Fixture { hierarchy, root } = fixture;
    let mut instance = hierarchy.construct(root, Vec::new()).expect("construct");
    hierarchy
        .invoke(&mut instance, "prepare", &[])
        .expect("class method runs");
    assert!(instance.record().is_empty(), "instance record untouched");
    assert!(
        hierarchy
            .class_record(root)
            .contains(&MethodName::from("prepare"))
    );
}

#[rstest]
fn instance_method_rejects_class_receiver(fixture: Fixture) {
    let Fixture { hierarchy, root } = fixture;
    let error = hierarchy
        .invoke_class(root, "run", &[])
        .expect_err("run needs an instance");
    assert!(matches!(error, LifecycleError::ReceiverMismatch { .. }));
}

#[rstest]
fn arguments_reach_callbacks_and_body() {
    let mut hierarchy = Hierarchy::new();
    let root = hierarchy
        .define_root(Spec::new("Root").method("greet", |call| {
            let first = call.args().first().map(String::as_str) == Some("hello");
            call.state()?.push(if first { "body-hello" } else { "body-other" });
            Ok(())
        }))
        .expect("define root");
    let seen_args = callback::<Trace, _>(|call| {
        let label = if call.args().len() == 1 {
            "before-one-arg"
        } else {
            "before-wrong"
        };
        call.state()?.push(label);
        Ok(())
    });
    hierarchy
        .bind(root, "greet", Some(seen_args), None)
        .expect("bind");
    let mut instance = hierarchy.construct(root, Vec::new()).expect("construct");
    hierarchy
        .invoke(&mut instance, "greet", &[String::from("hello")])
        .expect("invoke");
    assert_eq!(instance.state(), &vec!["before-one-arg", "body-hello"]);
}
