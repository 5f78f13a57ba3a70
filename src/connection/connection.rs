use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use log::trace;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, ErrorKind, Result};
use crate::proto::Endianness;
use crate::sasl::{sasl_recv, Auth, SaslResponse};
use crate::value::Value;
use crate::{Message, MessageKind, ObjectPath};

use super::transport;

/// An asynchronous connection to a D-Bus message bus.
///
/// The connection owns the stream, the serial counter, and the map of
/// in-flight method calls. A background task decodes incoming messages and
/// routes them: method returns and error replies resolve the pending call
/// with the matching serial, everything else is published on the side
/// channel returned by [`signals()`].
///
/// A connection returned by [`session_bus()`], [`system_bus()`] or
/// [`connect()`] is ready: it has authenticated, said `Hello`, and knows its
/// [`unique_name()`].
///
/// [`signals()`]: Self::signals
/// [`session_bus()`]: Self::session_bus
/// [`system_bus()`]: Self::system_bus
/// [`connect()`]: Self::connect
/// [`unique_name()`]: Self::unique_name
pub struct Connection {
    shared: Arc<Shared>,
    signals: Mutex<Option<mpsc::UnboundedReceiver<Message>>>,
}

struct Shared {
    /// Wire order: serial allocation and byte emission happen under this
    /// lock, so the bytes of two messages never interleave.
    send: tokio::sync::Mutex<SendHalf>,
    /// Touched only by the send path (insert) and the read loop
    /// (remove and resolve); never held across an await.
    pending: Mutex<Pending>,
    unique_name: OnceLock<String>,
    endianness: Endianness,
}

struct SendHalf {
    stream: OwnedWriteHalf,
    serial: u32,
}

impl SendHalf {
    /// The next serial: non-zero, monotonically increasing, wrapping past
    /// `u32::MAX` and skipping zero.
    fn next_serial(&mut self) -> NonZeroU32 {
        loop {
            self.serial = self.serial.wrapping_add(1);

            if let Some(serial) = NonZeroU32::new(self.serial) {
                break serial;
            }
        }
    }
}

struct Pending {
    replies: HashMap<NonZeroU32, oneshot::Sender<Result<Message>>>,
    closed: bool,
}

impl Connection {
    /// Connect to the session bus.
    pub async fn session_bus() -> Result<Self> {
        Self::connect(transport::session_bus().await?).await
    }

    /// Connect to the system bus.
    pub async fn system_bus() -> Result<Self> {
        Self::connect(transport::system_bus().await?).await
    }

    /// Take ownership of an already-open stream to a bus: authenticate,
    /// start the read loop, and say `Hello`.
    pub async fn connect(mut stream: UnixStream) -> Result<Self> {
        authenticate(&mut stream).await?;

        let (read, write) = stream.into_split();
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            send: tokio::sync::Mutex::new(SendHalf {
                stream: write,
                serial: 0,
            }),
            pending: Mutex::new(Pending {
                replies: HashMap::new(),
                closed: false,
            }),
            unique_name: OnceLock::new(),
            endianness: Endianness::NATIVE,
        });

        tokio::spawn(read_loop(shared.clone(), read, signals_tx));

        let connection = Self {
            shared,
            signals: Mutex::new(Some(signals_rx)),
        };

        let hello = Message::method_call(ObjectPath::new("/org/freedesktop/DBus")?, "Hello")
            .with_destination("org.freedesktop.DBus")
            .with_interface("org.freedesktop.DBus");

        let reply = connection.method_call(hello).await?;

        let name = match reply.body().first() {
            Some(Value::String(name)) => name.clone(),
            _ => {
                return Err(Error::new(ErrorKind::TypeMismatch {
                    expected: "s".to_string(),
                    found: "empty body",
                }))
            }
        };

        trace!("connected with unique name {name}");
        let _ = connection.shared.unique_name.set(name);
        Ok(connection)
    }

    /// The unique name the bus assigned to this connection in its `Hello`
    /// reply.
    pub fn unique_name(&self) -> Option<&str> {
        self.shared.unique_name.get().map(String::as_str)
    }

    /// Send a method call and await its reply.
    ///
    /// The connection assigns the serial. A method return resolves to the
    /// reply message; an error reply fails with the error name and any
    /// message the peer supplied. Dropping the future does not unsend the
    /// call; a late reply is discarded by the read loop.
    pub async fn method_call(&self, message: Message) -> Result<Message> {
        let (tx, rx) = oneshot::channel();

        {
            let mut send = self.shared.send.lock().await;
            let serial = send.next_serial();

            {
                let mut pending = lock(&self.shared.pending);

                if pending.closed {
                    return Err(Error::new(ErrorKind::ConnectionClosed));
                }

                pending.replies.insert(serial, tx);
            }

            let bytes = match message.encode(serial, self.shared.endianness) {
                Ok(bytes) => bytes,
                Err(error) => {
                    lock(&self.shared.pending).replies.remove(&serial);
                    return Err(error);
                }
            };

            trace!(
                "sending {:?} call with serial {serial} ({} bytes)",
                message.member(),
                bytes.len()
            );

            if let Err(error) = send.stream.write_all(&bytes).await {
                lock(&self.shared.pending).replies.remove(&serial);
                return Err(error.into());
            }
        }

        match rx.await {
            Ok(result) => result,
            Err(..) => Err(Error::new(ErrorKind::ConnectionClosed)),
        }
    }

    /// Send a message without awaiting a reply, returning the serial it was
    /// assigned.
    ///
    /// This is the path for signals and for calls flagged
    /// NO_REPLY_EXPECTED.
    pub async fn send(&self, message: Message) -> Result<NonZeroU32> {
        let mut send = self.shared.send.lock().await;

        if lock(&self.shared.pending).closed {
            return Err(Error::new(ErrorKind::ConnectionClosed));
        }

        let serial = send.next_serial();
        let bytes = message.encode(serial, self.shared.endianness)?;
        send.stream.write_all(&bytes).await?;
        trace!("sent serial {serial} ({} bytes)", bytes.len());
        Ok(serial)
    }

    /// Take the side channel of incoming messages that are not replies to
    /// our method calls: signals, calls addressed to us, and unmatched
    /// replies.
    ///
    /// Returns `None` if it has already been taken.
    pub fn signals(&self) -> Option<mpsc::UnboundedReceiver<Message>> {
        lock(&self.signals).take()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Perform the minimal SASL exchange: EXTERNAL with the hex-encoded uid,
/// expect `OK`, then `BEGIN`.
async fn authenticate(stream: &mut UnixStream) -> Result<()> {
    let mut auth_buf = [0; 32];
    let Auth::External(uid) = external_auth(&mut auth_buf);

    let mut line = Vec::with_capacity(64);
    line.push(0);
    line.extend_from_slice(b"AUTH EXTERNAL ");
    line.extend_from_slice(uid);
    line.extend_from_slice(b"\r\n");
    stream.write_all(&line).await?;

    let mut response = Vec::new();

    // The server speaks exactly one line before we BEGIN.
    loop {
        let mut chunk = [0; 256];
        let n = stream.read(&mut chunk).await?;

        if n == 0 {
            return Err(Error::new(ErrorKind::UnexpectedEof {
                got: response.len(),
                requested: response.len() + 1,
            }));
        }

        response.extend_from_slice(&chunk[..n]);

        if response.contains(&b'\n') {
            break;
        }
    }

    match sasl_recv(&response)? {
        SaslResponse::Ok(guid) => {
            trace!("authenticated, server guid {}", String::from_utf8_lossy(guid));
        }
    }

    stream.write_all(b"BEGIN\r\n").await?;
    Ok(())
}

#[cfg(all(unix, feature = "libc"))]
fn external_auth(buf: &mut [u8; 32]) -> Auth<'_> {
    Auth::external_from_uid(buf)
}

/// Without `libc` there is no uid to present; an empty payload leaves it to
/// the server to take the identity from the socket credentials.
#[cfg(not(all(unix, feature = "libc")))]
fn external_auth(buf: &mut [u8; 32]) -> Auth<'_> {
    Auth::External(&buf[..0])
}

/// The background read task: decodes one message at a time and routes it.
///
/// Any transport or protocol error is fatal to the connection: pending
/// calls fail and subsequent sends are refused.
async fn read_loop(
    shared: Arc<Shared>,
    mut read: OwnedReadHalf,
    signals: mpsc::UnboundedSender<Message>,
) {
    let error = loop {
        let bytes = match transport::read_message_bytes(&mut read).await {
            Ok(bytes) => bytes,
            Err(error) => break error,
        };

        let message = match Message::decode(&bytes) {
            Ok(message) => message,
            Err(error) => break error,
        };

        dispatch(&shared, message, &signals);
    };

    trace!("read loop terminated: {error}");

    let mut pending = lock(&shared.pending);
    pending.closed = true;

    for (_, tx) in pending.replies.drain() {
        let _ = tx.send(Err(Error::new(ErrorKind::ConnectionClosed)));
    }
}

fn dispatch(shared: &Arc<Shared>, message: Message, signals: &mpsc::UnboundedSender<Message>) {
    let reply_serial = match message.kind() {
        MessageKind::MethodReturn { reply_serial } => Some(reply_serial),
        MessageKind::Error { reply_serial, .. } => Some(reply_serial),
        _ => None,
    };

    if let Some(serial) = reply_serial {
        let tx = lock(&shared.pending).replies.remove(&serial);

        if let Some(tx) = tx {
            let error = match message.kind() {
                MessageKind::Error { error_name, .. } => {
                    let text = match message.body().first() {
                        Some(Value::String(text)) => Some(text.clone()),
                        _ => None,
                    };

                    Some(Error::new(ErrorKind::MethodError {
                        name: error_name.to_string(),
                        message: text,
                    }))
                }
                _ => None,
            };

            let _ = tx.send(match error {
                Some(error) => Err(error),
                None => Ok(message),
            });

            return;
        }

        trace!("no pending call for reply serial {serial}");
    }

    if signals.send(message).is_err() {
        trace!("side channel closed, dropping message");
    }
}
