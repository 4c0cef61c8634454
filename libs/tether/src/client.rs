use std::sync::Arc;

use chrono::{DateTime, Utc};
use tether_core::{Message, Result};

use crate::runner::{ResponseStream, Runner, StopHandle};

/// Outbound call capability.
///
/// Cheap to clone; handed to plain handlers and reachable from every
/// [`Responder`](crate::handler::Responder).
#[derive(Clone)]
pub struct Client {
    runner: Arc<Runner>,
}

impl Client {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self { runner }
    }

    /// Fire-and-forget: responses to this call, if any, are dropped.
    ///
    /// A deadline already set on `message` is forwarded to the peer.
    pub async fn call(&self, message: Message) -> Result<()> {
        message.validate()?;
        message.remaining()?;
        self.runner.caller().call(&message).await
    }

    /// Call and collect responses until the call is stopped.
    pub async fn call_with_response(
        &self,
        mut message: Message,
    ) -> Result<(ResponseStream, StopHandle)> {
        message.deadline = None;
        self.runner.run(message).await
    }

    /// Call and collect responses until `deadline`.
    ///
    /// The peer's handler runs under the same deadline, measured on its own
    /// clock.
    pub async fn call_with_deadline(
        &self,
        message: Message,
        deadline: DateTime<Utc>,
    ) -> Result<(ResponseStream, StopHandle)> {
        self.runner.run(message.with_deadline(deadline)).await
    }
}
