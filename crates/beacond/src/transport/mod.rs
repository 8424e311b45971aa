//! TCP transport for the notification server.
//!
//! The listener accepts connections on a background thread and hands each
//! one to a [`ConnectionHandler`] on its own thread. Messages in both
//! directions are newline-delimited JSON; [`codec`] frames them.

pub(crate) mod codec;
mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub(crate) use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::PeerRecordingHandler;

pub(crate) const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
