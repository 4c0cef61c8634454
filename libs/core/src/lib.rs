//! Tether Core - message model and error taxonomy shared by every tether crate.

pub mod error;
pub mod message;

pub use error::{Error, Result};
pub use message::{remaining, Message};
