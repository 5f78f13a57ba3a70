//! The asynchronous bus connection.

pub use self::connection::Connection;
mod connection;

pub(crate) mod transport;
