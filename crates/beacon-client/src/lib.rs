//! Client for the beacon change-notification server.
//!
//! One-shot requests (`get`, `set`, `list`, `listlog`) each open their own
//! connection because the server closes the socket after replying.
//! [`Client::subscribe`] keeps its connection open and yields the update
//! notifications the server pushes after every successful write.

mod client;
mod errors;
mod messages;
mod request;
mod subscription;
mod transport;

pub use client::Client;
pub use errors::ClientError;
pub use messages::{AuditEntry, Notification, Record};
pub use subscription::Subscription;
