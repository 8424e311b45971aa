//! Change-notification server for a shared record store.
//!
//! Clients connect over TCP and send one JSON request per line. One-shot
//! actions (`get`, `set`, `list`, `listlog`) receive a single response line
//! and the connection closes. A `subscribe` request turns the connection into
//! a live feed: every successful `set`, from any client, is pushed to each
//! subscriber as an `update` notification.
//!
//! The moving parts, bottom up:
//!
//! - [`store`] and [`audit`] are the external collaborators: record storage
//!   and the append-only request trail. Each comes in an in-memory and a
//!   file-backed flavour.
//! - [`notifier`] owns the live subscribers behind one mutex and fans
//!   notifications out to them, evicting any whose delivery fails.
//! - [`proxy`] intercepts writes so that exactly one notification follows
//!   each successful store write.
//! - [`services`] constructs the shared collaborators once and hands the
//!   same instances to every connection.
//! - [`dispatch`] parses, audits, validates and routes requests, and drives
//!   each connection through its one-shot or streaming lifecycle.
//! - [`Server`] binds the listener and wires it to the dispatcher;
//!   [`run_daemon`] adds configuration, telemetry and signal handling.

pub mod audit;
mod bootstrap;
mod clock;
pub mod dispatch;
mod health;
pub mod notifier;
mod process;
pub mod proxy;
mod server;
pub mod services;
pub mod store;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon};
pub use server::{RunningServer, Server};
pub use services::{ConfiguredServiceFactory, ServiceError, ServiceFactory, SharedServices};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
