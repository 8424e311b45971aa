//! Streaming side of a subscribed connection.

use std::io::{self, BufReader};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::transport::read_line;
use crate::{ClientError, Notification};

/// Open subscription yielding update notifications.
///
/// Dropping the subscription closes the socket. The server forgets it once a
/// push to it fails.
#[derive(Debug)]
pub struct Subscription {
    reader: BufReader<TcpStream>,
    client_id: String,
}

impl Subscription {
    pub(crate) fn new(reader: BufReader<TcpStream>, client_id: String) -> Self {
        Self { reader, client_id }
    }

    /// Client id the server acknowledged.
    #[must_use]
    pub fn client_id(&self) -> &str {
        self.client_id.as_str()
    }

    /// Bounds how long [`Self::next_notification`] waits. `None` waits
    /// indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket rejects the timeout.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<(), ClientError> {
        self.reader
            .get_ref()
            .set_read_timeout(timeout)
            .map_err(ClientError::ReadResponse)
    }

    /// Blocks until the next notification arrives.
    ///
    /// Returns `Ok(None)` once the server has closed the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or times out (see
    /// [`ClientError::is_timeout`]) or the line is not a notification.
    pub fn next_notification(&mut self) -> Result<Option<Notification>, ClientError> {
        let Some(line) = read_line(&mut self.reader)? else {
            return Ok(None);
        };
        serde_json::from_str(&line)
            .map(Some)
            .map_err(ClientError::ParseMessage)
    }

    /// Closes both directions of the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket was already torn down.
    pub fn close(self) -> io::Result<()> {
        self.reader.get_ref().shutdown(Shutdown::Both)
    }
}
