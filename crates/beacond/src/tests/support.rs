//! Shared fixtures for the daemon test suites.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use ortho_config::{OrthoConfig, OrthoError};

use beacon_config::{Config, ListenAddress};

use crate::audit::{AuditSink, MemoryAuditSink};
use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::HealthReporter;
use crate::process::{ShutdownError, ShutdownSignal};
use crate::server::{RunningServer, Server};
use crate::services::{ServiceError, ServiceFactory, SharedServices};
use crate::store::{MemoryRecordStore, RecordStore};

/// Factory handing out pre-built collaborators.
#[derive(Clone)]
pub(crate) struct FixedServiceFactory {
    store: Arc<dyn RecordStore>,
    audit: Arc<dyn AuditSink>,
}

impl FixedServiceFactory {
    pub(crate) fn new(store: Arc<dyn RecordStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    pub(crate) fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryRecordStore::new()),
            Arc::new(MemoryAuditSink::new()),
        )
    }
}

impl ServiceFactory for FixedServiceFactory {
    fn record_store(&self) -> Result<Arc<dyn RecordStore>, ServiceError> {
        Ok(Arc::clone(&self.store))
    }

    fn audit_sink(&self) -> Result<Arc<dyn AuditSink>, ServiceError> {
        Ok(Arc::clone(&self.audit))
    }
}

/// Configuration bound to an ephemeral loopback port.
pub(crate) fn loopback_config() -> Config {
    Config {
        listen: ListenAddress::new("127.0.0.1", 0),
        idle_timeout_secs: 5,
        ..Config::default()
    }
}

/// Starts a server over fresh in-memory services.
pub(crate) fn start_server() -> (Arc<SharedServices>, RunningServer) {
    let services = Arc::new(SharedServices::new(FixedServiceFactory::in_memory()));
    let server = Server::bind(&loopback_config(), Arc::clone(&services))
        .expect("bind server")
        .start()
        .expect("start server");
    (services, server)
}

/// Sends one line and collects every line the server writes before closing.
pub(crate) fn exchange(addr: SocketAddr, line: &str) -> Vec<String> {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set read timeout");
    stream.write_all(line.as_bytes()).expect("write request");
    stream.write_all(b"\n").expect("write newline");
    stream.flush().expect("flush");

    BufReader::new(stream)
        .lines()
        .map(|line| line.expect("read response line"))
        .collect()
}

/// Polls `condition` until it holds or two seconds pass.
pub(crate) fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Lifecycle events captured by [`RecordingHealthReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerReady(SocketAddr),
    ListenerStopped(SocketAddr),
}

/// Records health events for assertions.
#[derive(Default)]
pub(crate) struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub(crate) fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Address from the first `ListenerReady` event, if any.
    pub(crate) fn ready_address(&self) -> Option<SocketAddr> {
        self.events().into_iter().find_map(|event| match event {
            HealthEvent::ListenerReady(address) => Some(address),
            _ => None,
        })
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

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, address: SocketAddr, _session_id: &str) {
        self.record(HealthEvent::ListenerReady(address));
    }

    fn listener_stopped(&self, address: SocketAddr) {
        self.record(HealthEvent::ListenerStopped(address));
    }
}

/// Loader that hands out a loopback configuration.
#[derive(Clone)]
pub(crate) struct TestConfigLoader {
    config: Config,
}

impl TestConfigLoader {
    pub(crate) fn new() -> Self {
        Self::with_config(loopback_config())
    }

    pub(crate) fn with_config(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that fails by passing an unsupported listen scheme.
pub(crate) struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("beacond"),
            OsString::from("--listen"),
            OsString::from("unix:///tmp/beacon.sock"),
        ])
    }
}

/// Shutdown signal released by the test instead of the operating system.
#[derive(Clone, Default)]
pub(crate) struct ManualShutdown {
    released: Arc<(Mutex<bool>, Condvar)>,
}

impl ManualShutdown {
    pub(crate) fn trigger(&self) {
        let (flag, condvar) = &*self.released;
        *flag.lock().expect("shutdown mutex poisoned") = true;
        condvar.notify_all();
    }
}

impl ShutdownSignal for ManualShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        let (flag, condvar) = &*self.released;
        let mut released = flag.lock().expect("shutdown mutex poisoned");
        while !*released {
            released = condvar.wait(released).expect("shutdown mutex poisoned");
        }
        Ok(())
    }
}
