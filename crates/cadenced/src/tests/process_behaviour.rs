//! Behavioural tests covering launch sequencing and shutdown.

use std::cell::RefCell;
use std::net::SocketAddr;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

use crate::bootstrap::ConfigLoader;
use crate::health::HealthReporter;
use crate::process::{LaunchError, LaunchPlan, ShutdownError, ShutdownSignal, run_daemon_with};
use crate::tests::support::{
    FailingConfigLoader, HealthEvent, RawClient, RecordingHealthReporter, TestConfigLoader,
};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct TestShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl TestShutdownSignal {
    fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().expect("shutdown mutex poisoned") = true;
        cvar.notify_all();
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let (lock, cvar) = &*self.inner;
        let triggered = lock.lock().expect("shutdown mutex poisoned");
        let _released = cvar
            .wait_while(triggered, |triggered| !*triggered)
            .expect("shutdown mutex poisoned during wait");
        Ok(())
    }
}

struct ProcessWorld {
    reporter: Arc<RecordingHealthReporter>,
    shutdown: TestShutdownSignal,
    handle: Option<thread::JoinHandle<Result<(), LaunchError>>>,
    result: Option<Result<(), LaunchError>>,
    addr: Option<SocketAddr>,
    track: Option<Value>,
}

impl ProcessWorld {
    fn new() -> Self {
        Self {
            reporter: Arc::new(RecordingHealthReporter::default()),
            shutdown: TestShutdownSignal::new(),
            handle: None,
            result: None,
            addr: None,
            track: None,
        }
    }

    fn launch<L>(&mut self, loader: L)
    where
        L: ConfigLoader + 'static,
    {
        let plan = LaunchPlan {
            loader,
            reporter: Arc::clone(&self.reporter) as Arc<dyn HealthReporter>,
            shutdown: self.shutdown.clone(),
        };
        self.handle = Some(thread::spawn(move || run_daemon_with(plan)));
    }

    fn join(&mut self) {
        let handle = self.handle.take().expect("daemon launched");
        self.result = Some(handle.join().expect("daemon thread panicked"));
    }
}

impl Drop for ProcessWorld {
    fn drop(&mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[fixture]
fn world() -> RefCell<ProcessWorld> {
    RefCell::new(ProcessWorld::new())
}

#[given("a daemon launched with the test configuration")]
fn given_launched(world: &RefCell<ProcessWorld>) {
    let mut world = world.borrow_mut();
    world.launch(TestConfigLoader::new());
    let addr = world
        .reporter
        .wait_for_listening(WAIT_TIMEOUT)
        .expect("daemon reported its listening address");
    world.addr = Some(addr);
}

#[given("a daemon launched with a failing configuration")]
fn given_failing_launch(world: &RefCell<ProcessWorld>) {
    world.borrow_mut().launch(FailingConfigLoader);
}

#[when("a client creates a MIDI track named {name}")]
fn when_create_track(world: &RefCell<ProcessWorld>, name: String) {
    let name = name.trim_matches('"');
    let mut world = world.borrow_mut();
    let mut client = RawClient::connect(world.addr.expect("daemon listening"));

    let created = client.call("create_midi_track", json!({ "index": -1 }));
    assert_eq!(created["status"], "success", "{created:?}");
    let index = created["result"]["index"].clone();
    let renamed = client.call("set_track_name", json!({ "track_index": index, "name": name }));
    assert_eq!(renamed["status"], "success", "{renamed:?}");

    world.track = Some(client.call("get_track_info", json!({ "track_index": index })));
}

#[when("shutdown is triggered")]
fn when_shutdown(world: &RefCell<ProcessWorld>) {
    let mut world = world.borrow_mut();
    world.shutdown.trigger();
    world.join();
}

#[then("the daemon run succeeds")]
fn then_run_succeeds(world: &RefCell<ProcessWorld>) {
    let world = world.borrow();
    let result = world.result.as_ref().expect("daemon finished");
    assert!(result.is_ok(), "daemon run failed: {result:?}");
}

#[then("the daemon run fails during bootstrap")]
fn then_run_fails(world: &RefCell<ProcessWorld>) {
    let world = world.borrow();
    let result = world.result.as_ref().expect("daemon finished");
    assert!(
        matches!(result, Err(LaunchError::Bootstrap { .. })),
        "unexpected result: {result:?}"
    );
}

#[then("the track info reports the name {name}")]
fn then_track_name(world: &RefCell<ProcessWorld>, name: String) {
    let world = world.borrow();
    let track = world.track.as_ref().expect("track info fetched");
    assert_eq!(track["result"]["name"], name.trim_matches('"'));
}

#[then("the reporter recorded the server stopping")]
fn then_server_stopped(world: &RefCell<ProcessWorld>) {
    let events = world.borrow().reporter.events();
    assert_eq!(events.last(), Some(&HealthEvent::ServerStopped), "{events:?}");
}

#[scenario(
    path = "tests/features/daemon_process.feature",
    name = "The daemon serves built-in commands until shutdown"
)]
fn daemon_serves_until_shutdown(#[from(world)] world: RefCell<ProcessWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon_process.feature",
    name = "Launch fails when configuration cannot be loaded"
)]
fn launch_fails_on_configuration(#[from(world)] world: RefCell<ProcessWorld>) {
    drop(world);
}
