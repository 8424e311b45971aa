//! Newline-delimited JSON framing.

use std::io::{self, Read};

use serde::Serialize;
use thiserror::Error;

const READ_CHUNK: usize = 1024;

/// Errors raised while reading a framed line.
#[derive(Debug, Error)]
pub(crate) enum CodecError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    TooLarge { size: usize, max_size: usize },
}

impl CodecError {
    /// Whether the read gave up because the idle timeout elapsed.
    pub(crate) fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Io(error)
                if matches!(error.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
        )
    }
}

/// Reads one newline-terminated line, without the terminator.
///
/// Returns `Ok(None)` when the peer closes before sending a newline, even if
/// some bytes arrived. Bytes following the newline in the same read are
/// discarded.
pub(crate) fn read_line<R: Read>(
    reader: &mut R,
    max_bytes: usize,
) -> Result<Option<Vec<u8>>, CodecError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; READ_CHUNK];

    loop {
        let bytes_read = read_with_retry(reader, &mut chunk)?;
        if bytes_read == 0 {
            return Ok(None);
        }

        let received = chunk.get(..bytes_read).unwrap_or_default();
        if let Some(newline) = received.iter().position(|byte| *byte == b'\n') {
            buffer.extend_from_slice(received.get(..newline).unwrap_or_default());
            enforce_limit(buffer.len(), max_bytes)?;
            return Ok(Some(buffer));
        }

        buffer.extend_from_slice(received);
        enforce_limit(buffer.len(), max_bytes)?;
    }
}

/// Serialises `value` as one JSON line including the trailing newline.
pub(crate) fn encode_line<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    Ok(line)
}

fn read_with_retry<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

fn enforce_limit(size: usize, max_size: usize) -> Result<(), CodecError> {
    if size > max_size {
        return Err(CodecError::TooLarge { size, max_size });
    }
    Ok(())
}
