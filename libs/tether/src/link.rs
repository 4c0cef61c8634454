//! Interfaces between the engine and whatever carries bytes between peers.

use async_trait::async_trait;
use tether_core::{Message, Result};

/// Sends a request to the remote peer.
///
/// The message deadline, if any, travels with it so the remote handler can
/// bound its own execution.
#[async_trait]
pub trait Caller: Send + Sync {
    async fn call(&self, message: &Message) -> Result<()>;
}

/// Sends a response back to the peer that originated `message.id`.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_reply(&self, message: &Message) -> Result<()>;
}

/// Entry point for decoded inbound requests.
///
/// Missing `id`/`type` and unknown types come back as client errors
/// (see [`tether_core::Error::is_client_error`]).
pub trait InboundRequests: Send + Sync {
    fn accept_request(&self, message: Message) -> Result<()>;
}

/// Entry point for decoded inbound responses.
pub trait InboundResponses: Send + Sync {
    fn accept_response(&self, message: Message) -> Result<()>;
}
