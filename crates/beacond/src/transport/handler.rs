//! Connection handling abstractions for the listener.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Accepted client connection.
#[derive(Debug)]
pub(crate) struct ConnectionStream {
    stream: TcpStream,
}

impl ConnectionStream {
    pub(crate) fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub(crate) fn peer(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }

    /// Bounds how long a read may block. `None` blocks indefinitely.
    pub(crate) fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    /// Clones the socket for use as a subscriber sink.
    ///
    /// The write timeout is applied to the shared socket so that a stalled
    /// peer cannot hold a broadcast forever.
    pub(crate) fn subscriber_sink(&self, write_timeout: Option<Duration>) -> io::Result<TcpStream> {
        let sink = self.stream.try_clone()?;
        sink.set_write_timeout(write_timeout)?;
        Ok(sink)
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: ConnectionStream);
}
