//! Integration tests for subscriber registries.

use std::sync::Arc;
use sulfide::{
    Arg, HookError, HookRegistry, Module,
    testing::{FailingModule, RecordingModule},
};

#[test]
fn test_attach_notifies_subscriber_with_subject() {
    let hooks = HookRegistry::new("core", "test");
    let recorder = RecordingModule::new("audit");

    hooks.attach("audit", recorder.clone()).unwrap();

    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "core_test_hooked");
    assert_eq!(calls[0].subject, Some(hooks.id()));
}

#[test]
fn test_duplicate_attach_is_rejected() {
    let hooks = HookRegistry::new("core", "test");
    let first = RecordingModule::new("audit");
    let second = RecordingModule::new("audit");

    hooks.attach("audit", first.clone()).unwrap();
    let err = hooks.attach("audit", second.clone()).unwrap_err();

    assert!(matches!(err, HookError::DuplicateSubscriber { ref name, .. } if name == "audit"));
    assert_eq!(hooks.len(), 1);
    assert!(second.calls().is_empty());
}

#[test]
fn test_emit_without_subscribers_is_a_no_op() {
    let hooks = HookRegistry::new("core", "test");
    hooks.emit("anything", &[Arg::Text("x")]).unwrap();
    assert!(hooks.collect("anything", &[]).unwrap().is_empty());
}

#[test]
fn test_collect_returns_replies_in_attach_order() {
    let hooks = HookRegistry::new("core", "test");
    for name in ["first", "second", "third"] {
        hooks.attach(name, RecordingModule::new(name)).unwrap();
    }

    let replies = hooks.collect("ping", &[]).unwrap();
    let names: Vec<String> = replies
        .into_iter()
        .map(|reply| *reply.unwrap().downcast::<String>().unwrap())
        .collect();

    assert_eq!(names, vec!["first", "second", "third"]);
    assert_eq!(hooks.names(), vec!["first", "second", "third"]);
}

#[test]
fn test_emit_delivers_arguments_in_order() {
    let hooks = HookRegistry::new("core", "test");
    let recorder = RecordingModule::new("audit");
    hooks.attach("audit", recorder.clone()).unwrap();
    recorder.clear();

    hooks
        .emit("moved", &[Arg::Text("from"), Arg::Text("to")])
        .unwrap();

    let calls = recorder.calls();
    assert_eq!(calls[0].method, "core_test_moved");
    assert_eq!(calls[0].args, vec![r#"Text("from")"#, r#"Text("to")"#]);
}

#[test]
fn test_detach_notifies_then_removes() {
    let hooks = HookRegistry::new("core", "test");
    let recorder = RecordingModule::new("audit");
    hooks.attach("audit", recorder.clone()).unwrap();

    hooks.detach("audit").unwrap();
    hooks.emit("after", &[]).unwrap();

    assert_eq!(recorder.methods(), vec!["core_test_hooked", "core_test_unhooked"]);
    assert!(!hooks.contains("audit"));
    assert!(matches!(
        hooks.detach("audit"),
        Err(HookError::SubscriberNotFound { .. })
    ));
}

#[test]
fn test_failing_subscriber_stops_emission() {
    let hooks = HookRegistry::new("core", "test");
    let recorder = RecordingModule::new("later");
    hooks
        .attach("broken", FailingModule::new("broken", "boom"))
        .unwrap();
    hooks.attach("later", recorder.clone()).unwrap();

    let err = hooks.emit("boom", &[]).unwrap_err();

    assert!(matches!(err, HookError::Subscriber { ref name, ref method, .. }
        if name == "broken" && method == "core_test_boom"));
    assert_eq!(recorder.methods_named("core_test_boom"), 0);
}

#[test]
fn test_subscriber_can_be_shared_between_subjects() {
    let routing = HookRegistry::new("core", "routing");
    let modules = HookRegistry::new("core", "modules");
    let recorder = RecordingModule::new("audit");
    let shared: Arc<dyn Module> = recorder.clone();

    routing.attach("audit", shared.clone()).unwrap();
    modules.attach("audit", shared).unwrap();
    routing.emit("requested", &[]).unwrap();
    modules.emit("loaded", &[]).unwrap();

    assert_eq!(
        recorder.methods(),
        vec![
            "core_routing_hooked",
            "core_modules_hooked",
            "core_routing_requested",
            "core_modules_loaded"
        ]
    );
}
