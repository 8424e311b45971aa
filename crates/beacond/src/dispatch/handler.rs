//! Connection handler that drives one client connection.
//!
//! A connection moves through `AwaitingRequest`, `Dispatched`, then either
//! `RespondingOnce` (one response, then close) or `Streaming` (the socket
//! becomes a subscriber and stays open until the peer leaves or a delivery
//! fails).

use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use beacon_config::Config;

use crate::notifier::{Subscription, SubscriptionId};
use crate::services::SharedServices;
use crate::transport::codec::{self, CodecError};
use crate::transport::{ConnectionHandler, ConnectionStream};

use super::errors::DispatchError;
use super::request::RawRequest;
use super::response::{Response, ResponseWriter};
use super::router::{DISPATCH_TARGET, Routed, Router};

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// How long to wait for the request line; also the subscriber write
    /// timeout. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Longest accepted request line in bytes.
    pub max_request_bytes: usize,
}

impl ConnectionSettings {
    /// Settings taken from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
            max_request_bytes: config.max_request_bytes(),
        }
    }
}

#[derive(Debug)]
enum ConnectionState {
    AwaitingRequest,
    Dispatched(RawRequest),
    RespondingOnce(Response),
    Streaming(SubscriptionId),
    Closed,
}

/// Connection handler that parses, routes and answers requests.
#[derive(Debug)]
pub struct DispatchConnectionHandler {
    router: Router,
    services: Arc<SharedServices>,
    settings: ConnectionSettings,
}

impl DispatchConnectionHandler {
    /// Creates a handler for one server session.
    #[must_use]
    pub fn new(services: Arc<SharedServices>, router: Router, settings: ConnectionSettings) -> Self {
        Self {
            router,
            services,
            settings,
        }
    }

    fn dispatch(&self, mut stream: ConnectionStream) {
        let peer = stream.peer();
        let mut state = ConnectionState::AwaitingRequest;
        loop {
            state = match state {
                ConnectionState::AwaitingRequest => self.await_request(&mut stream),
                ConnectionState::Dispatched(raw) => self.route(&stream, &raw),
                ConnectionState::RespondingOnce(response) => {
                    respond(&mut stream, &response);
                    ConnectionState::Closed
                }
                ConnectionState::Streaming(id) => {
                    self.stream_until_disconnect(&mut stream, id);
                    ConnectionState::Closed
                }
                ConnectionState::Closed => break,
            };
        }
        debug!(target: DISPATCH_TARGET, ?peer, "connection closed");
    }

    fn await_request(&self, stream: &mut ConnectionStream) -> ConnectionState {
        if let Err(error) = stream.set_read_timeout(self.settings.idle_timeout) {
            warn!(target: DISPATCH_TARGET, %error, "failed to set read timeout");
        }

        match codec::read_line(stream, self.settings.max_request_bytes) {
            Ok(Some(line)) => match RawRequest::parse(&line) {
                Ok(raw) => ConnectionState::Dispatched(raw),
                Err(error) => {
                    warn!(target: DISPATCH_TARGET, %error, "malformed request");
                    ConnectionState::RespondingOnce(Response::error(&error))
                }
            },
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, "client disconnected without request");
                ConnectionState::Closed
            }
            Err(CodecError::TooLarge { size, max_size }) => {
                let error = DispatchError::RequestTooLarge { size, max_size };
                warn!(target: DISPATCH_TARGET, %error, "oversized request");
                ConnectionState::RespondingOnce(Response::error(&error))
            }
            Err(error) if error.is_timeout() => {
                debug!(target: DISPATCH_TARGET, "idle timeout before request");
                ConnectionState::Closed
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                ConnectionState::Closed
            }
        }
    }

    fn route(&self, stream: &ConnectionStream, raw: &RawRequest) -> ConnectionState {
        match self.router.route(raw) {
            Routed::Reply(response) => ConnectionState::RespondingOnce(response),
            Routed::Subscribe { client_id } => self.subscribe(stream, client_id),
        }
    }

    fn subscribe(&self, stream: &ConnectionStream, client_id: String) -> ConnectionState {
        let sink = match stream.subscriber_sink(self.settings.idle_timeout) {
            Ok(sink) => sink,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to prepare subscriber socket");
                return ConnectionState::RespondingOnce(Response::error(&DispatchError::Io(error)));
            }
        };
        let ack = match codec::encode_line(&Response::subscribed(client_id.as_str())) {
            Ok(ack) => ack,
            Err(error) => {
                let error = DispatchError::SerializeResponse(error);
                warn!(target: DISPATCH_TARGET, %error, "failed to encode acknowledgement");
                return ConnectionState::RespondingOnce(Response::error(&error));
            }
        };

        match self
            .services
            .notifier()
            .attach_with_ack(Subscription::new(client_id, sink), &ack)
        {
            Ok(id) => ConnectionState::Streaming(id),
            Err(error) => {
                debug!(target: DISPATCH_TARGET, %error, "subscriber left before acknowledgement");
                ConnectionState::Closed
            }
        }
    }

    /// Drains the socket until the peer stops sending.
    ///
    /// Anything the subscriber sends is discarded. End of stream only means
    /// the peer has finished writing, so the subscription stays attached and
    /// the registry evicts it on the first failed delivery. A read error
    /// means the connection is gone and detaches at once. A registry eviction
    /// shuts the socket down, which also ends the read here.
    fn stream_until_disconnect(&self, stream: &mut ConnectionStream, id: SubscriptionId) {
        if let Err(error) = stream.set_read_timeout(None) {
            debug!(target: DISPATCH_TARGET, %error, "failed to clear read timeout");
        }
        let mut discard = [0_u8; 512];
        loop {
            match stream.read(&mut discard) {
                Ok(0) => {
                    debug!(target: DISPATCH_TARGET, subscription = %id, "subscriber finished sending");
                    return;
                }
                Ok(count) => {
                    trace!(target: DISPATCH_TARGET, subscription = %id, count, "discarding subscriber input");
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => {
                    debug!(target: DISPATCH_TARGET, subscription = %id, %error, "subscriber read failed");
                    self.services.notifier().detach(id);
                    return;
                }
            }
        }
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        self.dispatch(stream);
    }
}

fn respond(stream: &mut ConnectionStream, response: &Response) {
    if let Err(error) = ResponseWriter::new(stream).write_response(response) {
        warn!(target: DISPATCH_TARGET, %error, "failed to write response");
    }
}
