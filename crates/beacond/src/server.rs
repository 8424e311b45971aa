//! Server assembly: a bound listener wired to the dispatch handler.

use std::net::SocketAddr;
use std::sync::Arc;

use uuid::Uuid;

use beacon_config::Config;

use crate::dispatch::{ConnectionSettings, DispatchConnectionHandler, Router};
use crate::services::SharedServices;
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

/// A notification server bound to its port but not yet accepting.
///
/// Each server owns a fresh session id that is stamped on every audit entry
/// it records.
#[derive(Debug)]
pub struct Server {
    listener: SocketListener,
    handler: Arc<DispatchConnectionHandler>,
    session_id: String,
}

impl Server {
    /// Binds the configured address.
    ///
    /// # Errors
    ///
    /// Returns an error when the address does not resolve or is already in
    /// use.
    pub fn bind(config: &Config, services: Arc<SharedServices>) -> Result<Self, ListenerError> {
        let listener = SocketListener::bind(config.listen())?;
        let session_id = Uuid::new_v4().to_string();
        let router = Router::new(
            Arc::clone(&services),
            session_id.as_str(),
            config.audit_query_limit(),
        );
        let handler = Arc::new(DispatchConnectionHandler::new(
            services,
            router,
            ConnectionSettings::from_config(config),
        ));
        Ok(Self {
            listener,
            handler,
            session_id,
        })
    }

    /// Address actually bound, with any ephemeral port resolved.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Session identifier for this server instance.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Starts accepting connections on a background thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be switched to non-blocking
    /// mode.
    pub fn start(self) -> Result<RunningServer, ListenerError> {
        let handle = self.listener.start(self.handler)?;
        Ok(RunningServer {
            handle,
            session_id: self.session_id,
        })
    }
}

/// A server whose accept loop is running.
#[derive(Debug)]
pub struct RunningServer {
    handle: ListenerHandle,
    session_id: String,
}

impl RunningServer {
    /// Address clients connect to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.handle.local_addr()
    }

    /// Session identifier for this server instance.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Stops accepting and waits for the accept loop to exit.
    ///
    /// Connections already accepted, subscribers included, keep their own
    /// threads until their peers disconnect.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept loop panicked.
    pub fn stop(self) -> Result<(), ListenerError> {
        self.handle.shutdown();
        self.handle.join()
    }
}
