//! Shared service singletons.
//!
//! Every connection works against the same record store, audit sink and
//! subscription registry. [`SharedServices`] builds each of them on first use
//! and hands out clones of the same `Arc` afterwards; concurrent first callers
//! block until the single construction finishes. One process-wide instance is
//! available through [`SharedServices::install_global`].

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::info;

use crate::audit::{AuditError, AuditSink, JsonlAuditSink, MemoryAuditSink};
use crate::notifier::SubscriptionRegistry;
use crate::store::{FileRecordStore, MemoryRecordStore, RecordStore, StoreError};

pub(crate) const SERVICES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::services");

static GLOBAL_SERVICES: OnceCell<Arc<SharedServices>> = OnceCell::new();

/// Errors raised while constructing a shared service.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The record store could not be opened.
    #[error("failed to open record store: {0}")]
    Store(Arc<StoreError>),
    /// The audit sink could not be opened.
    #[error("failed to open audit sink: {0}")]
    Audit(Arc<AuditError>),
}

/// Builds the external collaborators behind the shared services.
pub trait ServiceFactory: Send + Sync {
    /// Opens the record store.
    fn record_store(&self) -> Result<Arc<dyn RecordStore>, ServiceError>;

    /// Opens the audit sink.
    fn audit_sink(&self) -> Result<Arc<dyn AuditSink>, ServiceError>;
}

/// Factory selecting backends from the configured data directory.
///
/// Without a directory both collaborators live in memory; with one, records
/// go to `records.json` and the audit trail to `audit.jsonl` inside it.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredServiceFactory {
    data_dir: Option<Utf8PathBuf>,
}

impl ConfiguredServiceFactory {
    /// Builds a factory for the given data directory.
    #[must_use]
    pub fn new(data_dir: Option<&Utf8Path>) -> Self {
        Self {
            data_dir: data_dir.map(Utf8Path::to_owned),
        }
    }
}

impl ServiceFactory for ConfiguredServiceFactory {
    fn record_store(&self) -> Result<Arc<dyn RecordStore>, ServiceError> {
        match &self.data_dir {
            Some(dir) => FileRecordStore::open(dir)
                .map(|store| Arc::new(store) as Arc<dyn RecordStore>)
                .map_err(|error| ServiceError::Store(Arc::new(error))),
            None => Ok(Arc::new(MemoryRecordStore::new())),
        }
    }

    fn audit_sink(&self) -> Result<Arc<dyn AuditSink>, ServiceError> {
        match &self.data_dir {
            Some(dir) => JsonlAuditSink::open(dir)
                .map(|sink| Arc::new(sink) as Arc<dyn AuditSink>)
                .map_err(|error| ServiceError::Audit(Arc::new(error))),
            None => Ok(Arc::new(MemoryAuditSink::new())),
        }
    }
}

/// Lazily constructed services shared by every connection.
pub struct SharedServices {
    factory: Box<dyn ServiceFactory>,
    store: OnceCell<Arc<dyn RecordStore>>,
    audit: OnceCell<Arc<dyn AuditSink>>,
    notifier: OnceCell<Arc<SubscriptionRegistry>>,
}

impl SharedServices {
    /// Wraps a factory. Nothing is constructed until first requested.
    pub fn new(factory: impl ServiceFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            store: OnceCell::new(),
            audit: OnceCell::new(),
            notifier: OnceCell::new(),
        }
    }

    /// Installs the process-wide instance on first call and returns it.
    ///
    /// Later calls ignore `factory` and return the instance already
    /// installed.
    pub fn install_global(factory: impl ServiceFactory + 'static) -> Arc<Self> {
        Arc::clone(GLOBAL_SERVICES.get_or_init(|| Arc::new(Self::new(factory))))
    }

    /// The process-wide instance, if one was installed.
    #[must_use]
    pub fn global() -> Option<Arc<Self>> {
        GLOBAL_SERVICES.get().map(Arc::clone)
    }

    /// Shared record store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store could not be opened. A failed attempt is
    /// not cached, so a later call retries.
    pub fn record_store(&self) -> Result<Arc<dyn RecordStore>, ServiceError> {
        self.store
            .get_or_try_init(|| {
                info!(target: SERVICES_TARGET, "opening record store");
                self.factory.record_store()
            })
            .map(Arc::clone)
    }

    /// Shared audit sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink could not be opened.
    pub fn audit_sink(&self) -> Result<Arc<dyn AuditSink>, ServiceError> {
        self.audit
            .get_or_try_init(|| {
                info!(target: SERVICES_TARGET, "opening audit sink");
                self.factory.audit_sink()
            })
            .map(Arc::clone)
    }

    /// Shared subscription registry.
    #[must_use]
    pub fn notifier(&self) -> Arc<SubscriptionRegistry> {
        Arc::clone(self.notifier.get_or_init(|| {
            info!(target: SERVICES_TARGET, "creating subscription registry");
            Arc::new(SubscriptionRegistry::new())
        }))
    }
}

impl Default for SharedServices {
    fn default() -> Self {
        Self::new(ConfiguredServiceFactory::default())
    }
}

impl fmt::Debug for SharedServices {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SharedServices")
            .field("store_ready", &self.store.get().is_some())
            .field("audit_ready", &self.audit.get().is_some())
            .field("notifier_ready", &self.notifier.get().is_some())
            .finish_non_exhaustive()
    }
}
