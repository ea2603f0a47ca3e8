//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use waypoint::location::{ChangeListener, ListenerId, Location, MemoryLocation};
use waypoint::transition::HookResult;
use waypoint::{Handler, RouteDescriptor, Router, RouterState};

/// Ordered record of hook invocations, e.g. `enter:user`.
pub type HookLog = Arc<Mutex<Vec<String>>>;

pub fn drain(log: &HookLog) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

/// Handler whose hooks append `leave:<label>` / `enter:<label>` to `log`.
pub fn recording_handler(label: &'static str, log: &HookLog) -> Handler {
    let leave_log = Arc::clone(log);
    let enter_log = Arc::clone(log);
    Handler::new()
        .on_leaving(move |_, _| {
            let log = Arc::clone(&leave_log);
            async move {
                log.lock().unwrap().push(format!("leave:{label}"));
                HookResult::Ok(())
            }
        })
        .on_entering(move |_, _| {
            let log = Arc::clone(&enter_log);
            async move {
                log.lock().unwrap().push(format!("enter:{label}"));
                HookResult::Ok(())
            }
        })
}

/// `user` with a `task` child and a `todos` redirect to `task`, plus `about`.
pub fn user_routes(log: &HookLog) -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::named("user")
            .path("/user/:userId")
            .handler(recording_handler("user", log))
            .children([
                RouteDescriptor::named("task")
                    .path("/user/:userId/tasks/:taskId")
                    .handler(recording_handler("task", log)),
                RouteDescriptor::redirect("/user/:userId/todos/:taskId", "task"),
            ]),
        RouteDescriptor::named("about").handler(recording_handler("about", log)),
    ]
}

/// In-memory location that counts how often the router moved it.
#[derive(Debug)]
pub struct RecordingLocation {
    inner: MemoryLocation,
    replaced: Mutex<Vec<String>>,
    backs: AtomicUsize,
}

impl RecordingLocation {
    pub fn new(initial: &str) -> Self {
        Self {
            inner: MemoryLocation::new(initial),
            replaced: Mutex::new(Vec::new()),
            backs: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, path: &str) {
        self.inner.push(path);
    }

    pub fn replaced(&self) -> Vec<String> {
        self.replaced.lock().unwrap().clone()
    }

    pub fn back_count(&self) -> usize {
        self.backs.load(Ordering::SeqCst)
    }
}

impl Location for RecordingLocation {
    fn current_path(&self) -> String {
        self.inner.current_path()
    }

    fn add_change_listener(&self, listener: ChangeListener) -> ListenerId {
        self.inner.add_change_listener(listener)
    }

    fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.inner.remove_change_listener(id)
    }

    fn replace(&self, path: &str) {
        self.replaced.lock().unwrap().push(path.to_string());
        self.inner.replace(path);
    }

    fn go_back(&self) {
        self.backs.fetch_add(1, Ordering::SeqCst);
        self.inner.go_back();
    }
}

/// Forward every committed state into a channel.
pub fn state_channel(router: &Router) -> mpsc::UnboundedReceiver<Arc<RouterState>> {
    let (tx, rx) = mpsc::unbounded_channel();
    router.subscribe(move |state| {
        let _ = tx.send(Arc::clone(state));
    });
    rx
}

/// Wait for a committed state at `path`, skipping any others.
pub async fn wait_for_path(
    rx: &mut mpsc::UnboundedReceiver<Arc<RouterState>>,
    path: &str,
) -> Arc<RouterState> {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let state = rx.recv().await.expect("state channel closed");
            if state.path == path {
                return state;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for state at {path}"))
}
