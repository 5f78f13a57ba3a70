//! Locating the bus and framing messages off the stream.

use std::env;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::UnixStream;

use crate::error::{Error, ErrorKind, Result};
use crate::proto::{Endianness, MAX_ARRAY_LENGTH, MAX_BODY_LENGTH, MIN_MESSAGE_LEN};
use crate::Frame;

const ENV_SESSION_BUS: &str = "DBUS_SESSION_BUS_ADDRESS";
const ENV_SYSTEM_BUS: &str = "DBUS_SYSTEM_BUS_ADDRESS";
const ENV_RUNTIME_DIR: &str = "XDG_RUNTIME_DIR";
const DEFAULT_SYSTEM_BUS: &str = "unix:path=/var/run/dbus/system_bus_socket";

/// Open a stream to the session bus.
///
/// The address is taken from `DBUS_SESSION_BUS_ADDRESS`, falling back to
/// `unix:path=$XDG_RUNTIME_DIR/bus`.
pub(crate) async fn session_bus() -> Result<UnixStream> {
    let address = match env::var(ENV_SESSION_BUS) {
        Ok(address) => address,
        Err(..) => match env::var(ENV_RUNTIME_DIR) {
            Ok(dir) => format!("unix:path={dir}/bus"),
            Err(..) => return Err(Error::new(ErrorKind::MissingBus)),
        },
    };

    connect(&address).await
}

/// Open a stream to the system bus.
///
/// The address is taken from `DBUS_SYSTEM_BUS_ADDRESS`, falling back to the
/// well-known `unix:path=/var/run/dbus/system_bus_socket`.
pub(crate) async fn system_bus() -> Result<UnixStream> {
    let address = match env::var(ENV_SYSTEM_BUS) {
        Ok(address) => address,
        Err(..) => DEFAULT_SYSTEM_BUS.to_string(),
    };

    connect(&address).await
}

pub(crate) async fn connect(address: &str) -> Result<UnixStream> {
    let path = parse_address(address)?;
    Ok(UnixStream::connect(path).await?)
}

/// Parse a `unix:path=<path>` bus address.
///
/// Only the first semicolon-separated address is considered, and extra
/// key-value parameters such as `guid=..` are ignored. Every other transport
/// is rejected.
fn parse_address(address: &str) -> Result<&str> {
    let first = match address.split_once(';') {
        Some((first, _)) => first,
        None => address,
    };

    let Some(params) = first.strip_prefix("unix:") else {
        return Err(Error::new(ErrorKind::InvalidAddress(address.to_string())));
    };

    for param in params.split(',') {
        if let Some(path) = param.strip_prefix("path=") {
            return Ok(path);
        }
    }

    Err(Error::new(ErrorKind::InvalidAddress(address.to_string())))
}

/// Read exactly `buf.len()` bytes, reporting how far a truncated stream got.
pub(crate) async fn read_exact<R>(stream: &mut R, buf: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut at = 0;

    while at < buf.len() {
        let n = stream.read(&mut buf[at..]).await?;

        if n == 0 {
            return Err(Error::new(ErrorKind::UnexpectedEof {
                got: at,
                requested: buf.len(),
            }));
        }

        at += n;
    }

    Ok(())
}

/// Read the wire image of one complete message.
///
/// The fixed header and the header-field array length are read first; they
/// bound the rest of the message, which is read with a second exact read.
pub(crate) async fn read_message_bytes<R>(stream: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; MIN_MESSAGE_LEN];
    read_exact(stream, &mut head).await?;

    let endianness = match head[0] {
        b'l' => Endianness::LITTLE,
        b'B' => Endianness::BIG,
        b => return Err(Error::new(ErrorKind::InvalidEndianness(b))),
    };

    let body_len = u32::get(&head[4..], endianness) as usize;
    let fields_len = u32::get(&head[12..], endianness) as usize;

    if body_len > MAX_BODY_LENGTH as usize {
        return Err(Error::new(ErrorKind::BodyTooLong(body_len)));
    }

    if fields_len > MAX_ARRAY_LENGTH as usize {
        return Err(Error::new(ErrorKind::ArrayTooLong(fields_len)));
    }

    // The body starts at the next 8-byte boundary after the field array.
    let padding = (MIN_MESSAGE_LEN + fields_len).wrapping_neg() % 8;
    let total = MIN_MESSAGE_LEN + fields_len + padding + body_len;

    let mut bytes = vec![0u8; total];
    bytes[..MIN_MESSAGE_LEN].copy_from_slice(&head);
    read_exact(stream, &mut bytes[MIN_MESSAGE_LEN..]).await?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::parse_address;

    #[test]
    fn address_parsing() {
        assert_eq!(
            parse_address("unix:path=/run/user/1000/bus").expect("parses"),
            "/run/user/1000/bus"
        );
        assert_eq!(
            parse_address("unix:path=/run/user/1000/bus,guid=abcdef").expect("parses"),
            "/run/user/1000/bus"
        );
        assert_eq!(
            parse_address("unix:path=/a/bus;unix:path=/b/bus").expect("parses"),
            "/a/bus"
        );

        assert!(parse_address("tcp:host=localhost,port=1234").is_err());
        assert!(parse_address("unix:abstract=/tmp/x").is_err());
        assert!(parse_address("").is_err());
    }
}
