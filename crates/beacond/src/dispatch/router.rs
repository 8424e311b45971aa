//! Action routing for validated requests.
//!
//! The router records every parsed request in the audit trail before it is
//! validated, then dispatches by action. Writes go through the
//! [`NotifyingDataService`] so subscribers hear about them; `subscribe` is
//! not answered here but handed back to the connection handler, which owns
//! the socket.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::audit::LogEntry;
use crate::notifier::ChangeNotifier;
use crate::proxy::{DataService, DirectDataService, NotifyingDataService};
use crate::services::SharedServices;

use super::errors::{DispatchError, StoreOperation};
use super::request::{Action, ID_FIELD, RawRequest, Request};
use super::response::{Response, ResponseData};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Client id recorded for requests that did not carry one.
const ANONYMOUS_CLIENT: &str = "anonymous";

/// What the connection should do with a routed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Send this response and close.
    Reply(Response),
    /// Acknowledge and attach the connection as a subscriber.
    Subscribe {
        /// Client that asked to subscribe.
        client_id: String,
    },
}

/// Routes requests to the shared services.
#[derive(Debug)]
pub struct Router {
    services: Arc<SharedServices>,
    session_id: String,
    audit_limit: Option<usize>,
}

impl Router {
    /// Builds a router for one server session.
    #[must_use]
    pub fn new(
        services: Arc<SharedServices>,
        session_id: impl Into<String>,
        audit_limit: Option<usize>,
    ) -> Self {
        Self {
            services,
            session_id: session_id.into(),
            audit_limit,
        }
    }

    /// Session identifier stamped on audit entries.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Audits, validates and dispatches a parsed request.
    ///
    /// Failures are folded into an error reply; routing itself never fails.
    pub fn route(&self, raw: &RawRequest) -> Routed {
        self.record_audit(raw);
        match self.dispatch(raw) {
            Ok(routed) => routed,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    client = raw.client_id(),
                    action = raw.action(),
                    %error,
                    "request rejected"
                );
                Routed::Reply(Response::error(&error))
            }
        }
    }

    fn record_audit(&self, raw: &RawRequest) {
        let audit = match self.services.audit_sink() {
            Ok(audit) => audit,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "audit sink unavailable");
                return;
            }
        };
        let mut entry = LogEntry::new(
            raw.client_id().unwrap_or(ANONYMOUS_CLIENT),
            self.session_id.as_str(),
            raw.action().unwrap_or_default(),
            raw.item_id(),
        );
        let fields = raw.attribute_names();
        if !fields.is_empty() {
            entry = entry.with_details(json!({ "fields": fields }));
        }
        if let Err(error) = audit.append(entry) {
            warn!(target: DISPATCH_TARGET, %error, "failed to record audit entry");
        }
    }

    fn dispatch(&self, raw: &RawRequest) -> Result<Routed, DispatchError> {
        let request = raw.validate()?;
        debug!(
            target: DISPATCH_TARGET,
            client = request.client_id(),
            action = %request.action(),
            id = request.id(),
            "dispatching request"
        );

        match request.action() {
            Action::Get => self.get(&request),
            Action::Set => self.set(&request),
            Action::List => self.list(),
            Action::ListLog => self.list_log(&request),
            Action::Subscribe => Ok(Routed::Subscribe {
                client_id: request.client_id().to_owned(),
            }),
        }
    }

    fn data_service(&self) -> Result<NotifyingDataService, DispatchError> {
        let store = self.services.record_store()?;
        let notifier: Arc<dyn ChangeNotifier> = self.services.notifier();
        Ok(NotifyingDataService::new(
            DirectDataService::new(store),
            notifier,
        ))
    }

    fn get(&self, request: &Request) -> Result<Routed, DispatchError> {
        let id = required_id(request)?;
        let record = self
            .data_service()?
            .read(id)
            .map_err(|source| DispatchError::store(StoreOperation::Get, source))?
            .ok_or_else(|| DispatchError::NotFound { id: id.to_owned() })?;
        Ok(reply(Action::Get, ResponseData::Record(record)))
    }

    fn set(&self, request: &Request) -> Result<Routed, DispatchError> {
        let id = required_id(request)?;
        if request.attributes().is_empty() {
            return Err(DispatchError::NoValidFields);
        }
        let record = self
            .data_service()?
            .write(id, request.attributes().clone())
            .map_err(|source| DispatchError::store(StoreOperation::Set, source))?;
        Ok(reply(Action::Set, ResponseData::Record(record)))
    }

    fn list(&self) -> Result<Routed, DispatchError> {
        let records = self
            .data_service()?
            .enumerate()
            .map_err(|source| DispatchError::store(StoreOperation::List, source))?;
        Ok(reply(Action::List, ResponseData::Records(records)))
    }

    fn list_log(&self, request: &Request) -> Result<Routed, DispatchError> {
        let entries = self
            .services
            .audit_sink()?
            .query_by_client(request.client_id(), self.audit_limit)
            .map_err(DispatchError::Audit)?;
        Ok(reply(Action::ListLog, ResponseData::Log(entries)))
    }
}

fn required_id(request: &Request) -> Result<&str, DispatchError> {
    request
        .id()
        .ok_or_else(|| DispatchError::missing_field(request.action().as_str(), ID_FIELD))
}

fn reply(action: Action, data: ResponseData) -> Routed {
    Routed::Reply(Response::success(action, data))
}
