//! Change notification fan-out.
//!
//! Subscribers are long-lived connections that asked to hear about writes.
//! The [`SubscriptionRegistry`] owns them behind a single mutex: attaching,
//! detaching, broadcasting and counting all serialise on that lock, and a
//! subscriber whose delivery fails is evicted inside the same locked section
//! that observed the failure.

mod notification;
mod registry;
mod sink;

pub use self::notification::{Notification, UPDATE_ACTION};
pub use self::registry::{BroadcastReport, Subscription, SubscriptionId, SubscriptionRegistry};
pub use self::sink::NotificationSink;

pub(crate) const NOTIFIER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::notifier");

/// Publishes change notifications to whoever is listening.
pub trait ChangeNotifier: Send + Sync {
    /// Delivers `notification` to every active subscriber.
    fn broadcast(&self, notification: &Notification) -> BroadcastReport;
}
