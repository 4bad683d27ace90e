//! Test harness utilities for the daemon behavioural suite.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use atomstock_config::Config;
use camino::Utf8PathBuf;
use tempfile::TempDir;

use crate::bootstrap::{BootstrapError, Daemon, StaticConfigLoader, bootstrap_with};
use crate::health::HealthReporter;
use crate::inventory::Inventory;
use crate::lifecycle::ShutdownReason;
use crate::persistence::OpenOutcome;
use crate::process::{LaunchError, serve};

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// The store opened; `None` for an in-memory inventory.
    StoreOpened(Option<OpenOutcome>),
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The daemon left the running state.
    ShutdownStarted(ShutdownReason),
    /// Every resource was released.
    ShutdownCompleted,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn store_opened(&self, _path: Option<&str>, outcome: Option<OpenOutcome>) {
        self.record(HealthEvent::StoreOpened(outcome));
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn shutdown_started(&self, reason: ShutdownReason) {
        self.record(HealthEvent::ShutdownStarted(reason));
    }

    fn shutdown_completed(&self) {
        self.record(HealthEvent::ShutdownCompleted);
    }
}

/// Builds a configuration serving one Unix endpoint pair under `dir`.
pub fn local_config(dir: &TempDir, label: &str) -> Config {
    let mut config = Config::default();
    config.stream_path = Some(socket_path(dir, &format!("{label}.stream")));
    config.datagram_path = Some(socket_path(dir, &format!("{label}.dgram")));
    config
}

/// Absolute UTF-8 path for `name` under `dir`.
pub fn socket_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("utf-8 temporary path")
}

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    dir: TempDir,
    config: Config,
    save_file: Option<Utf8PathBuf>,
    pub reporter: Arc<RecordingHealthReporter>,
    daemons: BTreeMap<String, Daemon>,
    bootstrap_error: Option<BootstrapError>,
    served: Option<Result<ShutdownReason, LaunchError>>,
    console_output: Vec<u8>,
    stream_reply: Option<String>,
    occupant: Option<UnixListener>,
}

impl TestWorld {
    /// Builds a world whose configuration serves a local endpoint pair.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temporary directory");
        let config = local_config(&dir, "main");
        Self {
            dir,
            config,
            save_file: None,
            reporter: Arc::new(RecordingHealthReporter::default()),
            daemons: BTreeMap::new(),
            bootstrap_error: None,
            served: None,
            console_output: Vec::new(),
            stream_reply: None,
            occupant: None,
        }
    }

    /// Removes every endpoint from the configuration.
    pub fn drop_transports(&mut self) {
        self.config.stream_path = None;
        self.config.datagram_path = None;
    }

    /// Mutable access to the configuration used by the next bootstrap.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Serves the stream path with a listener the daemon does not own.
    pub fn occupy_stream_path(&mut self) {
        let path = self.config.stream_path.clone().expect("stream path");
        self.occupant = Some(UnixListener::bind(path).expect("occupy stream path"));
    }

    /// Shares one backing file between every daemon started afterwards.
    pub fn use_save_file(&mut self) {
        self.save_file = Some(socket_path(&self.dir, "inventory.bin"));
    }

    /// Runs the bootstrap sequence for the main configuration.
    pub fn bootstrap(&mut self) {
        let config = self.config.clone();
        self.start("main", config);
    }

    /// Starts a named daemon with its own endpoints and the shared save file.
    pub fn start_named(&mut self, label: &str, carbon: u64) {
        let mut config = local_config(&self.dir, label);
        config.carbon = carbon;
        config.save_file.clone_from(&self.save_file);
        self.start(label, config);
    }

    fn start(&mut self, label: &str, config: Config) {
        let loader = StaticConfigLoader::new(config);
        match bootstrap_with(&loader, self.reporter.clone()) {
            Ok(daemon) => {
                self.daemons.insert(label.to_owned(), daemon);
            }
            Err(error) => {
                self.bootstrap_error = Some(error);
            }
        }
    }

    /// Returns the bootstrap error, if any.
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns the named daemon.
    pub fn daemon(&self, label: &str) -> Option<&Daemon> {
        self.daemons.get(label)
    }

    /// Serves the main daemon with `input` as the whole console session.
    pub fn serve_console(&mut self, input: Option<&str>) {
        let daemon = self.daemons.remove("main").expect("main daemon started");
        let console = input.map(|session| {
            let (mut writer, reader) = UnixStream::pair().expect("console pair");
            writer.write_all(session.as_bytes()).expect("console write");
            reader
        });
        self.served = Some(serve(daemon, console, &mut self.console_output));
    }

    /// Serves one stream request through the named daemon, then stops it.
    pub fn serve_stream_request(&mut self, label: &str, request: &str) {
        let daemon = self.daemons.remove(label).expect("daemon started");
        let stream_path = daemon.config().stream_path.clone().expect("stream path");
        let (mut console, reader) = UnixStream::pair().expect("console pair");
        let worker = thread::spawn(move || serve(daemon, Some(reader), Vec::new()));

        let client = UnixStream::connect(&stream_path).expect("connect stream socket");
        client
            .set_read_timeout(Some(REPLY_TIMEOUT))
            .expect("read timeout");
        let mut writer = client.try_clone().expect("clone client");
        writer
            .write_all(format!("{request}\n").as_bytes())
            .expect("stream write");
        let mut reply = String::new();
        BufReader::new(client)
            .read_line(&mut reply)
            .expect("stream reply");
        self.stream_reply = Some(reply.trim_end().to_owned());

        console.write_all(b"exit\n").expect("console write");
        self.served = Some(worker.join().expect("serving thread"));
    }

    /// Counts held by the named daemon's store.
    pub fn counts(&self, label: &str) -> [u64; 3] {
        self.daemon(label)
            .expect("daemon started")
            .store()
            .read(Inventory::counts)
            .expect("read store")
    }

    /// Outcome of the last serve call.
    pub fn served(&self) -> Option<&Result<ShutdownReason, LaunchError>> {
        self.served.as_ref()
    }

    /// Everything the daemon wrote to its console sink.
    pub fn console_text(&self) -> String {
        String::from_utf8(self.console_output.clone()).expect("utf-8 console output")
    }

    /// Reply to the last stream request.
    pub fn stream_reply(&self) -> Option<&str> {
        self.stream_reply.as_deref()
    }

    /// Whether the main configuration's socket files exist.
    pub fn socket_files_exist(&self) -> (bool, bool) {
        let exists = |path: Option<&Utf8PathBuf>| path.is_some_and(|socket| socket.exists());
        (
            exists(self.config.stream_path.as_ref()),
            exists(self.config.datagram_path.as_ref()),
        )
    }
}

/// Fixture-friendly constructor.
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
