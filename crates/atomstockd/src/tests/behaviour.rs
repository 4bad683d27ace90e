//! Behavioural tests for bootstrap, the shared inventory and shutdown.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::persistence::OpenOutcome;

use super::support::{self, HealthEvent, TestWorld};

type StepResult = Result<(), String>;

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("a configuration with a local endpoint pair")]
fn given_local_pair(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().socket_files_exist(), (false, false));
}

#[given("a configuration without endpoints")]
fn given_no_endpoints(world: &RefCell<TestWorld>) {
    world.borrow_mut().drop_transports();
}

#[given("a carbon seed of {count}")]
fn given_carbon_seed(world: &RefCell<TestWorld>, count: u64) {
    world.borrow_mut().config_mut().carbon = count;
}

#[given("an inactivity timeout of {seconds} second")]
fn given_inactivity_timeout(world: &RefCell<TestWorld>, seconds: u64) {
    world.borrow_mut().config_mut().timeout_secs = seconds;
}

#[given("another process serves the stream socket path")]
fn given_occupied_stream_path(world: &RefCell<TestWorld>) {
    world.borrow_mut().occupy_stream_path();
}

#[given("a save file shared by daemons")]
fn given_shared_save_file(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_save_file();
}

#[when("the daemon bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<TestWorld>) {
    world.borrow_mut().bootstrap();
}

#[when("daemon {label} starts with {carbon} carbon")]
fn when_named_daemon_starts(world: &RefCell<TestWorld>, label: String, carbon: u64) {
    world.borrow_mut().start_named(&label, carbon);
}

#[when("daemon {label} serves the stream request {request}")]
fn when_named_daemon_serves(world: &RefCell<TestWorld>, label: String, request: String) {
    world
        .borrow_mut()
        .serve_stream_request(&label, request.trim_matches('"'));
}

#[when("the daemon serves console input {input}")]
fn when_console_session(world: &RefCell<TestWorld>, input: String) {
    let session = format!("{}\n", input.trim_matches('"'));
    world.borrow_mut().serve_console(Some(&session));
}

#[when("the daemon serves without a console")]
fn when_served_without_console(world: &RefCell<TestWorld>) {
    world.borrow_mut().serve_console(None);
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(
        world.bootstrap_error().is_none(),
        "bootstrap error: {:?}",
        world.bootstrap_error()
    );
    assert!(
        world.daemon("main").is_some(),
        "daemon should have been initialised"
    );
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<TestWorld>) {
    assert!(
        world.borrow().bootstrap_error().is_some(),
        "bootstrap succeeded unexpectedly"
    );
}

#[then("the stream and datagram socket files exist")]
fn then_socket_files_exist(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().socket_files_exist(), (true, true));
}

#[then("no socket files were left behind")]
fn then_no_socket_files(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().socket_files_exist(), (false, false));
}

#[then("the occupied stream socket is untouched")]
fn then_occupied_socket_untouched(world: &RefCell<TestWorld>) {
    let (stream, datagram) = world.borrow().socket_files_exist();
    assert!(stream, "live stream socket was removed");
    assert!(!datagram, "datagram socket should not have been bound");
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapStarting),
        "bootstrap start event missing"
    );
}

#[then("the reporter recorded bootstrap success")]
fn then_reporter_success(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapSucceeded),
        "bootstrap success event missing"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<TestWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[then("the reporter recorded a loaded store")]
fn then_reporter_loaded(world: &RefCell<TestWorld>) {
    let events = world.borrow().reporter.events();
    assert!(
        events.contains(&HealthEvent::StoreOpened(Some(OpenOutcome::Initialised))),
        "first daemon should have seeded the file: {events:?}"
    );
    assert!(
        events.contains(&HealthEvent::StoreOpened(Some(OpenOutcome::Loaded))),
        "second daemon should have loaded the file: {events:?}"
    );
}

#[then("daemon {label} holds {carbon} carbon, {hydrogen} hydrogen and {oxygen} oxygen")]
fn then_named_daemon_holds(
    world: &RefCell<TestWorld>,
    label: String,
    carbon: u64,
    hydrogen: u64,
    oxygen: u64,
) {
    assert_eq!(world.borrow().counts(&label), [carbon, hydrogen, oxygen]);
}

#[then("the stream reply is {reply}")]
fn then_stream_reply(world: &RefCell<TestWorld>, reply: String) {
    assert_eq!(world.borrow().stream_reply(), Some(reply.trim_matches('"')));
}

#[then("the daemon stopped because of {reason}")]
fn then_stopped_because(world: &RefCell<TestWorld>, reason: String) -> StepResult {
    let world = world.borrow();
    match world.served() {
        Some(Ok(stopped)) if stopped.to_string() == reason.trim_matches('"') => Ok(()),
        other => Err(format!("unexpected serve outcome: {other:?}")),
    }
}

#[then("the console printed {line}")]
fn then_console_printed(world: &RefCell<TestWorld>, line: String) {
    let console = world.borrow().console_text();
    let expected = line.trim_matches('"');
    assert!(
        console.lines().any(|printed| printed == expected),
        "missing {expected:?} in {console:?}"
    );
}

#[then("the reporter recorded shutdown completion")]
fn then_reporter_shutdown(world: &RefCell<TestWorld>) {
    let events = world.borrow().reporter.events();
    assert_eq!(events.last(), Some(&HealthEvent::ShutdownCompleted));
}

#[scenario(
    path = "tests/features/daemon_bootstrap.feature",
    name = "Bootstrap binds a local endpoint pair"
)]
fn bootstrap_binds_local_pair(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon_bootstrap.feature",
    name = "Bootstrap fails without an endpoint pair"
)]
fn bootstrap_requires_endpoints(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon_bootstrap.feature",
    name = "Oversized seeds stop bootstrap before binding"
)]
fn bootstrap_rejects_oversized_seed(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon_bootstrap.feature",
    name = "A live socket at the stream path is left alone"
)]
fn bootstrap_refuses_live_socket(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/shared_inventory.feature",
    name = "A second daemon loads the existing record"
)]
fn second_daemon_loads_record(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/shared_inventory.feature",
    name = "Additions through one daemon are visible to another"
)]
fn additions_are_shared(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon_lifecycle.feature",
    name = "Console exit stops the daemon and removes its sockets"
)]
fn console_exit_stops_daemon(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/daemon_lifecycle.feature",
    name = "An idle daemon stops after its inactivity window"
)]
fn idle_daemon_stops(world: RefCell<TestWorld>) {
    drop(world);
}
