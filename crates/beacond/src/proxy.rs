//! Data access seam with write interception.
//!
//! Handlers talk to a [`DataService`]. The [`NotifyingDataService`] wraps the
//! direct implementation, forwards every call unchanged and, after each write
//! the store accepted, publishes exactly one change notification. Reads never
//! notify and a rejected write never notifies.

use std::sync::Arc;

use tracing::debug;

use crate::notifier::{ChangeNotifier, NOTIFIER_TARGET, Notification};
use crate::store::{Attributes, Record, RecordStore, StoreError};

/// Record operations available to request handlers.
pub trait DataService: Send + Sync {
    /// Fetches a record by identifier.
    fn read(&self, id: &str) -> Result<Option<Record>, StoreError>;

    /// Replaces the record under `id` with `attributes`.
    fn write(&self, id: &str, attributes: Attributes) -> Result<Record, StoreError>;

    /// Returns every stored record.
    fn enumerate(&self) -> Result<Vec<Record>, StoreError>;
}

/// Data service that talks straight to the record store.
#[derive(Clone)]
pub struct DirectDataService {
    store: Arc<dyn RecordStore>,
}

impl DirectDataService {
    /// Wraps a record store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

impl DataService for DirectDataService {
    fn read(&self, id: &str) -> Result<Option<Record>, StoreError> {
        self.store.get(id)
    }

    fn write(&self, id: &str, attributes: Attributes) -> Result<Record, StoreError> {
        self.store.put(id, attributes)
    }

    fn enumerate(&self) -> Result<Vec<Record>, StoreError> {
        self.store.scan()
    }
}

/// Data service that announces successful writes.
pub struct NotifyingDataService<S = DirectDataService> {
    inner: S,
    notifier: Arc<dyn ChangeNotifier>,
}

impl<S: DataService> NotifyingDataService<S> {
    /// Wraps `inner`, publishing writes through `notifier`.
    pub fn new(inner: S, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { inner, notifier }
    }
}

impl<S: DataService> DataService for NotifyingDataService<S> {
    fn read(&self, id: &str) -> Result<Option<Record>, StoreError> {
        self.inner.read(id)
    }

    fn write(&self, id: &str, attributes: Attributes) -> Result<Record, StoreError> {
        let record = self.inner.write(id, attributes)?;
        let report = self.notifier.broadcast(&Notification::update(record.clone()));
        debug!(
            target: NOTIFIER_TARGET,
            item = id,
            delivered = report.delivered,
            evicted = report.evicted,
            "write broadcast"
        );
        Ok(record)
    }

    fn enumerate(&self) -> Result<Vec<Record>, StoreError> {
        self.inner.enumerate()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rstest::rstest;

    use super::*;
    use crate::notifier::BroadcastReport;
    use crate::store::{MemoryRecordStore, MockRecordStore};

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<Notification> {
            self.sent.lock().expect("notifier lock").clone()
        }
    }

    impl ChangeNotifier for RecordingNotifier {
        fn broadcast(&self, notification: &Notification) -> BroadcastReport {
            self.sent
                .lock()
                .expect("notifier lock")
                .push(notification.clone());
            BroadcastReport::default()
        }
    }

    fn proxy_over(
        store: Arc<dyn RecordStore>,
    ) -> (Arc<RecordingNotifier>, NotifyingDataService) {
        let notifier = Arc::new(RecordingNotifier::default());
        let proxy = NotifyingDataService::new(
            DirectDataService::new(store),
            Arc::clone(&notifier) as Arc<dyn ChangeNotifier>,
        );
        (notifier, proxy)
    }

    fn sede(value: &str) -> Attributes {
        Attributes::from([("sede".to_owned(), value.to_owned())])
    }

    #[test]
    fn successful_write_broadcasts_once() {
        let (notifier, proxy) = proxy_over(Arc::new(MemoryRecordStore::new()));

        let record = proxy.write("r1", sede("Norte")).expect("write");

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        let notification = sent.first().expect("one notification");
        assert_eq!(notification.item_id, "r1");
        assert_eq!(notification.data, record);
    }

    #[rstest]
    #[case::read(|proxy: &NotifyingDataService| { let _ = proxy.read("r1"); })]
    #[case::enumerate(|proxy: &NotifyingDataService| { let _ = proxy.enumerate(); })]
    fn reads_never_broadcast(#[case] call: fn(&NotifyingDataService)) {
        let store = Arc::new(MemoryRecordStore::new());
        store.put("r1", sede("Sur")).expect("seed record");
        let (notifier, proxy) = proxy_over(store);

        call(&proxy);

        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn rejected_write_does_not_broadcast() {
        let mut store = MockRecordStore::new();
        store
            .expect_put()
            .times(1)
            .returning(|_, _| Err(StoreError::Poisoned));
        let (notifier, proxy) = proxy_over(Arc::new(store));

        let result = proxy.write("r1", sede("Oeste"));

        assert!(matches!(result, Err(StoreError::Poisoned)));
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn proxy_returns_what_direct_service_returns() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        let direct = DirectDataService::new(Arc::clone(&store));
        let (_notifier, proxy) = proxy_over(Arc::clone(&store));

        proxy.write("r1", sede("Este")).expect("write");

        assert_eq!(
            proxy.read("r1").expect("proxy read"),
            direct.read("r1").expect("direct read")
        );
        assert_eq!(
            proxy.enumerate().expect("proxy list"),
            direct.enumerate().expect("direct list")
        );
    }
}
