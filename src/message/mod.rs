//! Whole messages and their wire framing.

#[doc(inline)]
pub use self::message::{Message, MessageKind};
mod message;

mod wire;

#[cfg(test)]
mod tests;
