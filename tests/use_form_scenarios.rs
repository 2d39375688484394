use std::sync::Arc;
use std::sync::Mutex;

use calm_submit::prelude::*;
use futures::executor::block_on;
use serde_json::json;

#[derive(Clone, Debug, Eq, PartialEq)]
struct FooInput {
    foo: String,
}

fn foo_input(foo: &str) -> FooInput {
    FooInput {
        foo: foo.to_string(),
    }
}

fn report_json(report: Option<ErrorReport>) -> serde_json::Value {
    serde_json::to_value(report).expect("serialize report")
}

#[test]
fn schema_rejects_then_accepts_after_input_changes() {
    let input = ReactiveCell::new(foo_input(""));
    let schema = schema_fn(|value: &FooInput| {
        let foo = value.foo.trim();
        if foo.is_empty() {
            Validation::Failure(vec![Issue::new("Please enter foo.").at("foo")])
        } else {
            Validation::Success(foo_input(foo))
        }
    });
    let controller = use_form(
        FormConfig::from_schema(Source::reactive(input.clone()), schema)
            .on_submit(|value: FooInput, _: ()| async move { Ok(json!({ "input": value.foo })) }),
    );

    assert_eq!(block_on(controller.submit(())).expect("first submit"), None);
    assert_eq!(
        report_json(controller.errors().get()),
        json!({ "nested": { "foo": ["Please enter foo."] } })
    );

    input.set(foo_input(" test"));
    let result = block_on(controller.submit(())).expect("second submit");

    assert_eq!(result, Some(json!({ "input": "test" })));
    assert_eq!(controller.errors().get(), None);
    assert!(controller.submitted().get());
}

#[test]
fn without_schema_the_raw_input_is_submitted() {
    let controller = use_form(
        FormConfig::from_input(Source::value(foo_input("")))
            .on_submit(|input: FooInput, _: ()| async move { Ok(input) }),
    );

    let result = block_on(controller.submit(())).expect("submit");

    assert_eq!(result, Some(foo_input("")));
    assert_eq!(controller.errors().get(), None);
    assert!(controller.submitted().get());
}

#[test]
fn bare_callback_returns_its_value() {
    let controller = use_form(|_: ()| async { Ok(123) });

    assert_eq!(block_on(controller.submit(())).expect("submit"), Some(123));
}

#[test]
fn errors_assigned_by_the_callback_block_submitted() {
    let input = ReactiveCell::new(String::new());
    let errors = ReactiveCell::new(None);
    let controller = {
        let sink = errors.clone();
        use_form(
            FormConfig::from_input(Source::reactive(input.clone()))
                .errors(errors.clone())
                .on_submit(move |value: String, _: ()| {
                    if value.is_empty() {
                        sink.set(Some(ErrorReport::root("Input required.")));
                    } else {
                        sink.set(None);
                    }
                    async { Ok(()) }
                }),
        )
    };

    block_on(controller.submit(())).expect("empty submit");
    assert_eq!(report_json(errors.get()), json!({ "root": ["Input required."] }));
    assert!(!controller.submitted().get());

    input.set("test".to_string());
    block_on(controller.submit(())).expect("filled submit");
    assert_eq!(errors.get(), None);
    assert!(controller.submitted().get());

    input.set(String::new());
    block_on(controller.submit(())).expect("emptied submit");
    assert!(controller.has_errors());
    assert!(!controller.submitted().get());
}

#[test]
fn plain_callback_errors_reach_the_caller() {
    let input = ReactiveCell::new(String::new());
    let controller = use_form(
        FormConfig::from_input(Source::reactive(input.clone())).on_submit(
            |value: String, _: ()| async move {
                if value.is_empty() {
                    Err(anyhow::anyhow!("Input required."))
                } else {
                    Ok(())
                }
            },
        ),
    );

    let error = block_on(controller.submit(())).expect_err("error propagates");
    assert_eq!(error.to_string(), "Input required.");
    assert_eq!(controller.errors().get(), None);
    assert!(!controller.submitted().get());
    assert!(!controller.is_submitting());

    input.set("test".to_string());
    block_on(controller.submit(())).expect("submit");
    assert!(controller.submitted().get());
}

#[test]
fn submission_error_payload_lands_in_errors_and_on_errors() {
    let input = ReactiveCell::new(String::new());
    let reported = Arc::new(Mutex::new(Vec::new()));
    let controller = {
        let reported = reported.clone();
        use_form(
            FormConfig::from_input(Source::reactive(input.clone()))
                .on_submit(|value: String, _: ()| async move {
                    if value.is_empty() {
                        Err(anyhow::Error::new(SubmissionError::root("Input required.")))
                    } else {
                        Ok(value)
                    }
                })
                .on_errors(move |report| {
                    reported.lock().expect("reported lock").push(report);
                    async {}
                }),
        )
    };

    let result = block_on(controller.submit(())).expect("declined submit resolves");

    let payload = json!({ "root": ["Input required."] });
    assert_eq!(result, None);
    assert_eq!(report_json(controller.errors().get()), payload);
    let reported = reported.lock().expect("reported lock");
    assert_eq!(reported.len(), 1);
    assert_eq!(report_json(reported.first().cloned()), payload);
    assert_eq!(controller.last_outcome(), Some(SubmitOutcome::Declined));
}

#[test]
fn snapshot_serializes_for_ui_layers() {
    let controller = use_form(|_: ()| async {
        Err::<(), _>(anyhow::Error::new(SubmissionError::field("email", "Taken.")))
    });

    block_on(controller.submit(())).expect("submit");

    let snapshot = serde_json::to_value(controller.snapshot()).expect("serialize snapshot");
    assert_eq!(
        snapshot,
        json!({
            "submitting": false,
            "submitted": false,
            "errors": { "nested": { "email": ["Taken."] } },
            "attempts": 1,
            "last_outcome": "declined",
        })
    );
}

#[test]
fn watcher_tracks_the_same_input_outside_submission() {
    let input = ReactiveCell::new(foo_input(""));
    let schema = Arc::new(schema_fn(|value: &FooInput| {
        if value.foo.trim().is_empty() {
            Validation::Failure(vec![Issue::new("Please enter foo.").at("foo")])
        } else {
            Validation::Success(value.foo.trim().to_string())
        }
    }));
    let watcher = ValidationWatcher::new(
        Source::reactive(input.clone()),
        Source::value(schema),
        WatchOptions {
            flush: Flush::Sync,
            immediate: true,
        },
    );
    let errors = watcher.errors();
    assert_eq!(
        report_json(errors.get()),
        json!({ "nested": { "foo": ["Please enter foo."] } })
    );

    input.set(foo_input(" ok "));
    assert_eq!(errors.get(), None);
    assert_eq!(watcher.current_output().as_deref(), Some("ok"));
}
