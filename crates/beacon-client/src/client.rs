//! One-shot requests and subscription setup.

use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use serde::de::DeserializeOwned;

use beacon_config::ListenAddress;

use crate::messages::Reply;
use crate::request::Request;
use crate::transport::{self, read_line, write_jsonl};
use crate::{AuditEntry, ClientError, Record, Subscription};

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle for issuing requests on behalf of one client identity.
///
/// The handle is cheap to clone; it holds no open socket.
#[derive(Debug, Clone)]
pub struct Client {
    address: SocketAddr,
    client_id: String,
    read_timeout: Option<Duration>,
}

impl Client {
    /// Resolves `address` and returns a client acting as `client_id`.
    ///
    /// Each request opens its own connection, so nothing is dialled here.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not resolve.
    pub fn connect(
        address: &ListenAddress,
        client_id: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let resolved = transport::resolve(address)?;
        Ok(Self::new(resolved, client_id))
    }

    /// Client for an already resolved address.
    #[must_use]
    pub fn new(address: SocketAddr, client_id: impl Into<String>) -> Self {
        Self {
            address,
            client_id: client_id.into(),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
        }
    }

    /// Replaces the read timeout applied to one-shot replies and to the
    /// subscribe acknowledgement. `None` waits indefinitely.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Server address.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Identity sent as `UUID` with every request.
    #[must_use]
    pub fn client_id(&self) -> &str {
        self.client_id.as_str()
    }

    /// Fetches record `id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Server`] with `item not found` when the record
    /// does not exist, or a transport error.
    pub fn get(&self, id: &str) -> Result<Record, ClientError> {
        self.request(&Request::new(&self.client_id, "get").with_item(id), "get")
    }

    /// Stores `attributes` under `id` and returns the stored record.
    ///
    /// The server keeps only the attributes it recognises.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Server`] when the server rejects the write, or a
    /// transport error.
    pub fn set(&self, id: &str, attributes: &Record) -> Result<Record, ClientError> {
        let request = Request::new(&self.client_id, "set")
            .with_item(id)
            .with_attributes(attributes);
        self.request(&request, "set")
    }

    /// Lists every stored record in identifier order.
    ///
    /// # Errors
    ///
    /// Returns an error when the server fails the listing or the transport
    /// fails.
    pub fn list(&self) -> Result<Vec<Record>, ClientError> {
        self.request(&Request::new(&self.client_id, "list"), "list")
    }

    /// Lists this client's audit entries in the order they were recorded.
    ///
    /// The server caps the count and keeps the most recent entries.
    ///
    /// # Errors
    ///
    /// Returns an error when the server cannot query the audit log or the
    /// transport fails.
    pub fn listlog(&self) -> Result<Vec<AuditEntry>, ClientError> {
        self.request(&Request::new(&self.client_id, "listlog"), "listlog")
    }

    /// Sends `line` verbatim and returns every line the server writes before
    /// it closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a read fails.
    pub fn send_line(&self, line: &str) -> Result<Vec<String>, ClientError> {
        let mut reader = self.open()?;
        write_raw(reader.get_mut(), line)?;
        let mut lines = Vec::new();
        while let Some(reply) = read_line(&mut reader)? {
            lines.push(reply);
        }
        Ok(lines)
    }

    /// Subscribes to change notifications.
    ///
    /// Returns once the server has acknowledged the subscription, so every
    /// write that completes afterwards is delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the subscription or the
    /// transport fails.
    pub fn subscribe(&self) -> Result<Subscription, ClientError> {
        let mut reader = self.open()?;
        write_jsonl(reader.get_mut(), &Request::new(&self.client_id, "subscribe"))?;
        let line = read_line(&mut reader)?.ok_or(ClientError::MissingReply)?;
        let client_id = Reply::parse(&line)?.into_acknowledgement()?;
        Ok(Subscription::new(reader, client_id))
    }

    fn request<T: DeserializeOwned>(
        &self,
        request: &Request<'_>,
        action: &'static str,
    ) -> Result<T, ClientError> {
        let mut reader = self.open()?;
        write_jsonl(reader.get_mut(), request)?;
        let line = read_line(&mut reader)?.ok_or(ClientError::MissingReply)?;
        Reply::parse(&line)?.into_data(action)
    }

    fn open(&self) -> Result<BufReader<TcpStream>, ClientError> {
        transport::connect(self.address, self.read_timeout)
    }
}

fn write_raw(stream: &mut TcpStream, line: &str) -> Result<(), ClientError> {
    let mut bytes = line.as_bytes().to_vec();
    if !line.ends_with('\n') {
        bytes.push(b'\n');
    }
    stream.write_all(&bytes).map_err(ClientError::SendRequest)?;
    stream.flush().map_err(ClientError::SendRequest)
}
