//! The line-oriented SASL exchange D-Bus performs before the binary
//! protocol starts.


use crate::error::{Error, ErrorKind, Result};

/// A SASL request sent by the client.
pub enum SaslRequest<'a> {
    /// The AUTH message.
    Auth(Auth<'a>),
}

/// A SASL response received from the server.
#[derive(Debug, PartialEq, Eq)]
pub enum SaslResponse<'a> {
    /// The OK message carrying the server GUID.
    Ok(&'a [u8]),
}

/// The SASL authentication method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth<'a> {
    /// EXTERNAL authentication with a literal payload: the hex encoding of
    /// the ASCII decimal uid.
    External(&'a [u8]),
}

impl<'a> Auth<'a> {
    /// Construct external authentication for the uid of the current
    /// process.
    #[cfg(all(unix, feature = "libc"))]
    pub fn external_from_uid(buf: &'a mut [u8; 32]) -> Auth<'a> {
        let id = unsafe { libc::getuid() };
        Self::external_from_u32_ascii_hex(buf, id)
    }

    /// Construct an external authentication payload from a u32: the decimal
    /// digits of `id`, each encoded as the hex of its ASCII code.
    pub fn external_from_u32_ascii_hex(buf: &'a mut [u8; 32], mut id: u32) -> Auth<'a> {
        const HEX: [u8; 16] = *b"0123456789abcdef";

        let mut n = 0;

        if id == 0 {
            buf[0] = b'3';
            buf[1] = b'0';
            n = 2;
        } else {
            while id > 0 {
                let byte = (id % 10) as u8 + b'0';
                buf[n] = HEX[(byte & 0xf) as usize];
                n += 1;
                buf[n] = HEX[(byte >> 4) as usize];
                n += 1;
                id /= 10;
            }
        }

        buf[..n].reverse();
        Auth::External(&buf[..n])
    }
}

/// Parse one response line of the SASL exchange, terminator included.
///
/// The minimal contract is that authentication succeeded iff the line is
/// `OK <guid>`; anything else is surfaced as an authentication error naming
/// the response.
pub fn sasl_recv(bytes: &[u8]) -> Result<SaslResponse<'_>> {
    let line = match bytes.strip_suffix(b"\n") {
        Some(line) => line.strip_suffix(b"\r").unwrap_or(line),
        None => bytes,
    };

    let (command, rest) = match line.iter().position(|&b| b == b' ') {
        Some(at) => (&line[..at], &line[at + 1..]),
        None => (line, &line[..0]),
    };

    match command {
        b"OK" => Ok(SaslResponse::Ok(rest)),
        _ => Err(Error::new(ErrorKind::Auth(
            String::from_utf8_lossy(line).into_owned(),
        ))),
    }
}
