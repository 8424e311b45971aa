use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::{ChangeNotifier, NOTIFIER_TARGET, Notification, NotificationSink};

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique subscription identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "sub-{}", self.0)
    }
}

/// A connected subscriber and the channel notifications reach it on.
pub struct Subscription {
    id: SubscriptionId,
    client_id: String,
    sink: Box<dyn NotificationSink>,
    active: bool,
}

impl Subscription {
    /// Wraps `sink` as an active subscription for `client_id`.
    pub fn new(client_id: impl Into<String>, sink: impl NotificationSink + 'static) -> Self {
        Self {
            id: SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed)),
            client_id: client_id.into(),
            sink: Box::new(sink),
            active: true,
        }
    }

    /// Identifier assigned at construction.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Client identifier that subscribed.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Whether the subscription may still receive notifications.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn deliver(&mut self, line: &[u8]) -> io::Result<()> {
        if !self.active {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "subscription is inactive",
            ));
        }
        self.sink.deliver(line)
    }

    fn deactivate(&mut self) {
        if self.active {
            self.active = false;
            self.sink.close();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("id", &self.id)
            .field("client_id", &self.client_id)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// Outcome of a single broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers that accepted the notification.
    pub delivered: usize,
    /// Subscribers removed because delivery failed.
    pub evicted: usize,
}

/// Set of active subscriptions guarded by one mutex.
///
/// A poisoned lock is recovered; push, remove and retain never leave the
/// vector half-updated.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: Mutex<Vec<Subscription>>,
}

impl SubscriptionRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a subscription so it receives subsequent broadcasts.
    pub fn attach(&self, subscription: Subscription) -> SubscriptionId {
        let mut subscriptions = self.lock();
        let id = subscription.id;
        info!(
            target: NOTIFIER_TARGET,
            subscription = %id,
            client = subscription.client_id(),
            "subscriber attached"
        );
        subscriptions.push(subscription);
        id
    }

    /// Writes `ack` to the subscriber and attaches it in one locked section.
    ///
    /// No broadcast can interleave between the acknowledgement and the
    /// attachment, so the acknowledgement is always the first line the
    /// subscriber reads.
    ///
    /// # Errors
    ///
    /// Returns the delivery error when the acknowledgement cannot be written;
    /// the subscription is closed and not attached.
    pub fn attach_with_ack(
        &self,
        mut subscription: Subscription,
        ack: &[u8],
    ) -> io::Result<SubscriptionId> {
        let mut subscriptions = self.lock();
        if let Err(error) = subscription.deliver(ack) {
            subscription.deactivate();
            return Err(error);
        }
        let id = subscription.id;
        info!(
            target: NOTIFIER_TARGET,
            subscription = %id,
            client = subscription.client_id(),
            "subscriber attached"
        );
        subscriptions.push(subscription);
        Ok(id)
    }

    /// Removes and closes a subscription. Returns `false` when it was already
    /// gone, which makes repeated calls harmless.
    pub fn detach(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.lock();
        let Some(position) = subscriptions.iter().position(|sub| sub.id == id) else {
            return false;
        };
        let mut subscription = subscriptions.remove(position);
        subscription.deactivate();
        info!(
            target: NOTIFIER_TARGET,
            subscription = %id,
            remaining = subscriptions.len(),
            "subscriber detached"
        );
        true
    }

    /// Number of active subscriptions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().iter().filter(|sub| sub.active).count()
    }

    /// Delivers a pre-encoded line to every active subscriber, evicting those
    /// whose delivery fails.
    pub fn broadcast_line(&self, line: &[u8]) -> BroadcastReport {
        let mut subscriptions = self.lock();
        let mut report = BroadcastReport::default();
        for subscription in subscriptions.iter_mut().filter(|sub| sub.active) {
            match subscription.deliver(line) {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    debug!(
                        target: NOTIFIER_TARGET,
                        subscription = %subscription.id,
                        %error,
                        "delivery failed; evicting subscriber"
                    );
                    subscription.deactivate();
                    report.evicted += 1;
                }
            }
        }
        subscriptions.retain(|sub| sub.active);
        if report.evicted > 0 {
            info!(
                target: NOTIFIER_TARGET,
                evicted = report.evicted,
                remaining = subscriptions.len(),
                "evicted unreachable subscribers"
            );
        }
        report
    }
}

impl ChangeNotifier for SubscriptionRegistry {
    fn broadcast(&self, notification: &Notification) -> BroadcastReport {
        match notification.to_line() {
            Ok(line) => self.broadcast_line(&line),
            Err(error) => {
                warn!(
                    target: NOTIFIER_TARGET,
                    item = %notification.item_id,
                    %error,
                    "failed to encode notification"
                );
                BroadcastReport::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use rstest::{fixture, rstest};

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingSink {
        lines: Arc<Mutex<Vec<Vec<u8>>>>,
        closes: Arc<AtomicUsize>,
    }

    impl RecordingSink {
        fn lines(&self) -> Vec<Vec<u8>> {
            self.lines.lock().expect("lines lock").clone()
        }

        fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    impl NotificationSink for RecordingSink {
        fn deliver(&mut self, line: &[u8]) -> io::Result<()> {
            self.lines.lock().expect("lines lock").push(line.to_vec());
            Ok(())
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Clone, Default)]
    struct FailingSink {
        attempts: Arc<AtomicUsize>,
    }

    impl NotificationSink for FailingSink {
        fn deliver(&mut self, _line: &[u8]) -> io::Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))
        }

        fn close(&mut self) {}
    }

    #[fixture]
    fn registry() -> SubscriptionRegistry {
        SubscriptionRegistry::new()
    }

    #[rstest]
    fn broadcast_reaches_every_subscriber(registry: SubscriptionRegistry) {
        let sinks: Vec<RecordingSink> = (0..3).map(|_| RecordingSink::default()).collect();
        for sink in &sinks {
            registry.attach(Subscription::new("client", sink.clone()));
        }

        let report = registry.broadcast_line(b"hello\n");

        assert_eq!(report.delivered, 3);
        for sink in &sinks {
            assert_eq!(sink.lines(), vec![b"hello\n".to_vec()]);
        }
    }

    #[rstest]
    fn failing_subscriber_is_evicted_and_never_retried(registry: SubscriptionRegistry) {
        let healthy = RecordingSink::default();
        let failing = FailingSink::default();
        registry.attach(Subscription::new("ok", healthy.clone()));
        registry.attach(Subscription::new("gone", failing.clone()));

        let first = registry.broadcast_line(b"one\n");
        let second = registry.broadcast_line(b"two\n");

        assert_eq!(first, BroadcastReport { delivered: 1, evicted: 1 });
        assert_eq!(second, BroadcastReport { delivered: 1, evicted: 0 });
        assert_eq!(failing.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(registry.count(), 1);
        assert_eq!(healthy.lines().len(), 2);
    }

    #[rstest]
    fn detach_is_idempotent_and_closes_once(registry: SubscriptionRegistry) {
        let sink = RecordingSink::default();
        let id = registry.attach(Subscription::new("client", sink.clone()));

        assert!(registry.detach(id));
        assert!(!registry.detach(id));
        assert_eq!(sink.closes(), 1);
        assert_eq!(registry.count(), 0);
    }

    #[rstest]
    fn ack_precedes_broadcasts(registry: SubscriptionRegistry) {
        let sink = RecordingSink::default();
        registry
            .attach_with_ack(Subscription::new("client", sink.clone()), b"ack\n")
            .expect("attach with ack");
        registry.broadcast_line(b"update\n");

        assert_eq!(sink.lines(), vec![b"ack\n".to_vec(), b"update\n".to_vec()]);
    }

    #[rstest]
    fn failed_ack_leaves_registry_untouched(registry: SubscriptionRegistry) {
        let result = registry.attach_with_ack(Subscription::new("x", FailingSink::default()), b"ack\n");
        assert!(result.is_err());
        assert_eq!(registry.count(), 0);
    }

    #[rstest]
    fn empty_registry_broadcast_is_a_no_op(registry: SubscriptionRegistry) {
        assert_eq!(registry.broadcast_line(b"x\n"), BroadcastReport::default());
    }

    #[test]
    fn stable_subscribers_see_every_broadcast_under_churn() {
        const BROADCASTERS: usize = 4;
        const ROUNDS: usize = 50;

        let registry = Arc::new(SubscriptionRegistry::new());
        let stable: Vec<RecordingSink> = (0..3).map(|_| RecordingSink::default()).collect();
        for sink in &stable {
            registry.attach(Subscription::new("stable", sink.clone()));
        }

        let churn = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let id = registry.attach(Subscription::new("churn", RecordingSink::default()));
                    registry.detach(id);
                }
            })
        };
        let broadcasters: Vec<_> = (0..BROADCASTERS)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..ROUNDS {
                        registry.broadcast_line(b"tick\n");
                    }
                })
            })
            .collect();

        churn.join().expect("join churn");
        for handle in broadcasters {
            handle.join().expect("join broadcaster");
        }

        for sink in &stable {
            assert_eq!(sink.lines().len(), BROADCASTERS * ROUNDS);
        }
        assert_eq!(registry.count(), stable.len());
    }
}
