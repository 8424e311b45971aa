use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};

/// Channel a subscriber receives notification lines on.
pub trait NotificationSink: Send {
    /// Writes one complete line. An error marks the subscriber as gone.
    fn deliver(&mut self, line: &[u8]) -> io::Result<()>;

    /// Releases the underlying channel. Must tolerate repeated calls.
    fn close(&mut self);
}

impl NotificationSink for TcpStream {
    fn deliver(&mut self, line: &[u8]) -> io::Result<()> {
        self.write_all(line)?;
        self.flush()
    }

    fn close(&mut self) {
        // Shutting down both halves also wakes the connection thread parked
        // on a read of the same socket.
        if let Err(error) = self.shutdown(Shutdown::Both)
            && error.kind() != io::ErrorKind::NotConnected
        {
            tracing::debug!(
                target: super::NOTIFIER_TARGET,
                %error,
                "subscriber socket shutdown failed"
            );
        }
    }
}
