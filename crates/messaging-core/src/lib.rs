//! # Messaging-Core - Structured Control Messages for Peerkit
//!
//! A lightweight JSON message envelope plus the `Command` subtype used
//! for control traffic: a routing `node` path carrying positional
//! parameters and an `action` verb.

pub mod command;
pub mod error;
pub mod message;

pub use command::Command;
pub use error::{MessageError, Result};
pub use message::Message;
