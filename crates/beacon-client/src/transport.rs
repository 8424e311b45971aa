//! Socket helpers shared by one-shot requests and subscriptions.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::Serialize;

use beacon_config::ListenAddress;

use crate::ClientError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn resolve(address: &ListenAddress) -> Result<SocketAddr, ClientError> {
    let resolve_error = |source: io::Error| ClientError::Resolve {
        address: address.to_string(),
        source,
    };
    (address.host(), address.port())
        .to_socket_addrs()
        .map_err(resolve_error)?
        .next()
        .ok_or_else(|| {
            resolve_error(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no resolved addresses",
            ))
        })
}

pub(crate) fn connect(
    address: SocketAddr,
    read_timeout: Option<Duration>,
) -> Result<BufReader<TcpStream>, ClientError> {
    let connect_error = |source: io::Error| ClientError::Connect { address, source };
    let stream = TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT).map_err(connect_error)?;
    stream.set_read_timeout(read_timeout).map_err(connect_error)?;
    Ok(BufReader::new(stream))
}

/// Writes `request` as one JSON line.
pub(crate) fn write_jsonl<T>(stream: &mut TcpStream, request: &T) -> Result<(), ClientError>
where
    T: Serialize + ?Sized,
{
    let mut line = serde_json::to_vec(request).map_err(ClientError::SerialiseRequest)?;
    line.push(b'\n');
    stream.write_all(&line).map_err(ClientError::SendRequest)?;
    stream.flush().map_err(ClientError::SendRequest)
}

/// Reads one line without its terminator. `None` means the peer closed.
pub(crate) fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, ClientError> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(ClientError::ReadResponse)?;
    if read == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(Some(line))
}
