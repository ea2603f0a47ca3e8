//! Dispatch behaviour through the public router API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use waypoint::routing::{extract_params, inject_params, Params, Query};
use waypoint::transition::{AbortReason, DispatchError, HookPhase, HookResult};
use waypoint::{DispatchOutcome, ErrorMode, Handler, Location, RouteDescriptor, RouteTree, Router};

mod common;

use common::{drain, recording_handler, user_routes, HookLog, RecordingLocation};

fn router(log: &HookLog, location: Arc<RecordingLocation>) -> Router {
    Router::builder(RouteTree::register(user_routes(log)).unwrap())
        .location(location)
        .error_mode(ErrorMode::Return)
        .build()
}

#[tokio::test]
async fn test_nested_match_chain() {
    let log = HookLog::default();
    let router = router(&log, Arc::new(RecordingLocation::new("/")));

    let chain = router.match_path("/user/123/tasks/foo").unwrap();
    let labels: Vec<_> = chain.iter().map(|m| m.route.label()).collect();
    assert_eq!(labels, vec!["user", "task"]);
    assert_eq!(chain[0].params.get("userId").map(String::as_str), Some("123"));
    assert_eq!(chain[0].params.len(), 1);
    assert_eq!(chain[1].params.get("taskId").map(String::as_str), Some("foo"));

    match router.dispatch("/user/123/tasks/foo").await.unwrap() {
        DispatchOutcome::Committed(state) => {
            assert_eq!(state.active_params.get("userId").map(String::as_str), Some("123"));
            assert_eq!(state.active_params.get("taskId").map(String::as_str), Some("foo"));
            assert_eq!(state.route_labels(), vec!["user", "task"]);
        }
        other => panic!("expected commit, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dispatch_to_committed_path_is_noop() {
    let log = HookLog::default();
    let router = router(&log, Arc::new(RecordingLocation::new("/")));
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    router.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    router.dispatch("/user/1/tasks/2").await.unwrap();
    drain(&log);
    let before = router.state().unwrap();

    let outcome = router.dispatch("/user/1/tasks/2").await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Unchanged));
    assert!(drain(&log).is_empty());
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&before, &router.state().unwrap()));
}

#[tokio::test]
async fn test_common_matches_run_no_hooks() {
    let log = HookLog::default();
    let router = router(&log, Arc::new(RecordingLocation::new("/")));

    router.dispatch("/user/1/tasks/2").await.unwrap();
    assert_eq!(drain(&log), vec!["enter:user", "enter:task"]);

    router.dispatch("/user/1/tasks/3").await.unwrap();
    assert_eq!(drain(&log), vec!["leave:task", "enter:task"]);

    router.dispatch("/user/1").await.unwrap();
    assert_eq!(drain(&log), vec!["leave:task"]);
}

#[tokio::test]
async fn test_leave_deepest_first_enter_root_first() {
    let log = HookLog::default();
    let router = router(&log, Arc::new(RecordingLocation::new("/")));

    router.dispatch("/user/1/tasks/2").await.unwrap();
    drain(&log);

    router.dispatch("/about").await.unwrap();
    assert_eq!(drain(&log), vec!["leave:task", "leave:user", "enter:about"]);
}

#[tokio::test]
async fn test_entry_redirect_replaces_once() {
    let log = HookLog::default();
    let location = Arc::new(RecordingLocation::new("/"));
    let router = router(&log, Arc::clone(&location));

    router.dispatch("/user/abc").await.unwrap();
    let before = router.state().unwrap();

    location.push("/user/abc/todos/bar?view=full");
    let outcome = router.handle_path_change().await.unwrap();

    match outcome {
        DispatchOutcome::Aborted(transition) => match transition.abort_reason().as_deref() {
            Some(AbortReason::Redirect(redirect)) => assert_eq!(redirect.to, "task"),
            other => panic!("expected redirect, got {other:?}"),
        },
        other => panic!("expected abort, got {other:?}"),
    }
    assert!(Arc::ptr_eq(&before, &router.state().unwrap()));
    assert_eq!(location.replaced(), vec!["/user/abc/tasks/bar?view=full"]);
    assert_eq!(location.back_count(), 0);

    router.handle_path_change().await.unwrap();
    let state = router.state().unwrap();
    assert_eq!(state.path, "/user/abc/tasks/bar?view=full");
    assert_eq!(state.active_query.get("view").map(String::as_str), Some("full"));
    assert_eq!(location.replaced().len(), 1);
}

#[tokio::test]
async fn test_leave_hook_abort_rolls_back() {
    let location = Arc::new(RecordingLocation::new("/"));
    let tree = RouteTree::register(vec![
        RouteDescriptor::named("editor").handler(Handler::new().on_leaving(
            |transition, _| async move {
                transition.abort("unsaved changes");
                HookResult::Ok(())
            },
        )),
        RouteDescriptor::named("home"),
    ])
    .unwrap();
    let router = Router::builder(tree).location(location.clone()).build();

    location.push("/editor");
    router.handle_path_change().await.unwrap();
    location.push("/home");
    let outcome = router.handle_path_change().await.unwrap();

    assert!(outcome.is_aborted());
    assert_eq!(location.back_count(), 1);
    assert_eq!(location.current_path(), "/editor");
    assert_eq!(router.state().unwrap().path, "/editor");
}

#[tokio::test]
async fn test_custom_abort_handler() {
    let location = Arc::new(RecordingLocation::new("/"));
    let aborted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&aborted);
    let tree = RouteTree::register(vec![RouteDescriptor::named("closed").handler(
        Handler::new().on_entering(|transition, _| async move {
            transition.abort(AbortReason::Unspecified);
            HookResult::Ok(())
        }),
    )])
    .unwrap();
    let router = Router::builder(tree)
        .location(location.clone())
        .on_aborted_transition(move |transition, _| {
            assert_eq!(transition.path(), "/closed");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build();

    router.dispatch("/closed").await.unwrap();
    assert_eq!(aborted.load(Ordering::SeqCst), 1);
    assert_eq!(location.back_count(), 0);
}

#[tokio::test]
async fn test_unmatched_path_commits_empty_state() {
    let log = HookLog::default();
    let router = router(&log, Arc::new(RecordingLocation::new("/")));
    let mut states = common::state_channel(&router);

    router.dispatch("/user/1").await.unwrap();
    router.dispatch("/nope").await.unwrap();

    let state = common::wait_for_path(&mut states, "/nope").await;
    assert!(state.matches.is_empty());
    assert!(state.active_routes.is_empty());
    assert!(state.active_params.is_empty());
    assert_eq!(drain(&log), vec!["enter:user", "leave:user"]);
}

#[tokio::test]
async fn test_hook_error_modes() {
    let tree = || {
        RouteTree::register(vec![RouteDescriptor::named("fails").handler(
            Handler::new()
                .on_entering(|_, _| async move { HookResult::Err("backend down".into()) }),
        )])
        .unwrap()
    };

    let returning = Router::builder(tree()).error_mode(ErrorMode::Return).build();
    match returning.dispatch("/fails").await {
        Err(DispatchError::Hook { route, phase, .. }) => {
            assert_eq!(route, "fails");
            assert_eq!(phase, HookPhase::Entering);
        }
        other => panic!("expected hook error, got {other:?}"),
    }

    let errors = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&errors);
    let raising = Router::builder(tree())
        .on_transition_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let outcome = raising.dispatch("/fails").await.unwrap();
    assert!(matches!(outcome, DispatchOutcome::Failed));
    assert_eq!(errors.load(Ordering::SeqCst), 1);

    // Per-call override.
    assert!(raising.dispatch_with("/fails", ErrorMode::Return).await.is_err());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_leave_hook_error_keeps_state_and_location() {
    let log = HookLog::default();
    let failing_log = Arc::clone(&log);
    let location = Arc::new(RecordingLocation::new("/"));
    let tree = RouteTree::register(vec![
        RouteDescriptor::named("user")
            .path("/user/:userId")
            .handler(recording_handler("user", &log))
            .children([RouteDescriptor::named("task")
                .path("/user/:userId/tasks/:taskId")
                .handler(Handler::new().on_leaving(move |_, _| {
                    let log = Arc::clone(&failing_log);
                    async move {
                        log.lock().unwrap().push("leave:task".into());
                        HookResult::Err("draft not saved".into())
                    }
                }))]),
        RouteDescriptor::named("about").handler(recording_handler("about", &log)),
    ])
    .unwrap();
    let router = Router::builder(tree)
        .location(location.clone())
        .error_mode(ErrorMode::Return)
        .build();

    location.push("/user/1/tasks/2");
    router.handle_path_change().await.unwrap();
    drain(&log);
    let before = router.state().unwrap();

    location.push("/about");
    match router.handle_path_change().await {
        Err(DispatchError::Hook { route, phase, .. }) => {
            assert_eq!(route, "task");
            assert_eq!(phase, HookPhase::Leaving);
        }
        other => panic!("expected hook error, got {other:?}"),
    }

    // `user` never left and `about` never entered.
    assert_eq!(drain(&log), vec!["leave:task"]);
    assert!(Arc::ptr_eq(&before, &router.state().unwrap()));
    assert!(location.replaced().is_empty());
    assert_eq!(location.back_count(), 0);
}

fn slow_and_fast_routes(log: &HookLog) -> RouteTree {
    let slow_log = Arc::clone(log);
    RouteTree::register(vec![
        RouteDescriptor::named("slow").handler(Handler::new().on_entering(move |_, _| {
            let log = Arc::clone(&slow_log);
            async move {
                log.lock().unwrap().push("slow:start".into());
                tokio::time::sleep(Duration::from_millis(50)).await;
                log.lock().unwrap().push("slow:end".into());
                HookResult::Ok(())
            }
        })),
        RouteDescriptor::named("fast").handler(recording_handler("fast", log)),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_dispatches_overlap_by_default() {
    let log = HookLog::default();
    let router = Arc::new(Router::builder(slow_and_fast_routes(&log)).build());

    let slow = tokio::spawn({
        let router = Arc::clone(&router);
        async move { router.dispatch("/slow").await.map(|_| ()) }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    router.dispatch("/fast").await.unwrap();
    assert_eq!(router.state().unwrap().path, "/fast");

    // The slower dispatch still commits once its hook settles.
    slow.await.unwrap().unwrap();
    assert_eq!(router.state().unwrap().path, "/slow");
    assert_eq!(drain(&log), vec!["slow:start", "enter:fast", "slow:end"]);
}

#[tokio::test]
async fn test_serialized_dispatches_do_not_interleave() {
    let log = HookLog::default();
    let router = Arc::new(
        Router::builder(slow_and_fast_routes(&log))
            .serialize_dispatches(true)
            .build(),
    );

    let first = tokio::spawn({
        let router = Arc::clone(&router);
        async move { router.dispatch("/slow").await.map(|_| ()) }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = tokio::spawn({
        let router = Arc::clone(&router);
        async move { router.dispatch("/fast").await.map(|_| ()) }
    });

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(drain(&log), vec!["slow:start", "slow:end", "enter:fast"]);
    assert_eq!(router.state().unwrap().path, "/fast");
}

#[test]
fn test_built_paths_route_back_to_their_params() {
    let tree = RouteTree::register(user_routes(&HookLog::default())).unwrap();
    let router = Router::builder(tree).build();

    for (user_id, task_id) in [("1", "2"), ("a b", "x/y"), ("caf\u{e9}", "50%")] {
        let params = Params::from([
            ("userId".to_string(), user_id.to_string()),
            ("taskId".to_string(), task_id.to_string()),
        ]);
        let href = router.make_path("task", &params, &Query::new()).unwrap();
        let chain = router.match_path(&href).unwrap();
        assert_eq!(chain.last().unwrap().params, params, "via {href}");
    }

    let empty = Params::from([("userId".to_string(), String::new())]);
    assert!(router.make_path("user", &empty, &Query::new()).is_err());
}

#[test]
fn test_inject_extract_round_trip() {
    let cases = [
        ("/user/:userId/tasks/:taskId", "/user/123/tasks/foo"),
        ("/files/*", "/files/a/b/c.txt"),
        ("/search/:term", "/search/caf%C3%A9%20au%20lait"),
        ("/archive/:year/:month?", "/archive/2014"),
    ];

    for (pattern, path) in cases {
        let params = extract_params(pattern, path).unwrap();
        assert_eq!(inject_params(pattern, &params).unwrap(), path, "pattern {pattern}");
    }

    let tree = RouteTree::register(user_routes(&HookLog::default())).unwrap();
    let router = Router::builder(tree).build();
    let mut params = Params::new();
    params.insert("userId".into(), "a b".into());
    params.insert("taskId".into(), "7".into());
    let mut query = Query::new();
    query.insert("tab".into(), "notes".into());
    let href = router.make_path("task", &params, &query).unwrap();
    assert_eq!(href, "/user/a%20b/tasks/7?tab=notes");
    assert_eq!(router.match_path(&href).unwrap().last().unwrap().params, params);
}
