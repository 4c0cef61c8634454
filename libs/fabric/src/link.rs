//! Outbound side of a node: sends requests and replies to the remote peer.

use std::time::Duration;

use async_trait::async_trait;
use tether::{Caller, ReplySender};
use tether_core::Message;
use tracing::debug;

use crate::codec::Codec;
use crate::config::Endpoints;
use crate::envelope::{Ack, Envelope};
use crate::error::Result;
use crate::request::request;
use crate::transport::{Address, FrameOptions};

/// Sends each message on its own connection and waits for the remote
/// acknowledgement.
pub struct FabricLink<C> {
    remote: Endpoints,
    codec: C,
    connect_timeout: Option<Duration>,
    options: FrameOptions,
}

impl<C: Codec> FabricLink<C> {
    pub fn new(remote: Endpoints, codec: C) -> Self {
        Self {
            remote,
            codec,
            connect_timeout: None,
            options: FrameOptions::default(),
        }
    }

    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn options(mut self, options: FrameOptions) -> Self {
        self.options = options;
        self
    }

    pub fn remote(&self) -> &Endpoints {
        &self.remote
    }

    async fn deliver(&self, address: &Address, message: &Message) -> Result<()> {
        let envelope = Envelope::from(message);
        let ack: Ack = request(
            address,
            &envelope,
            self.codec.clone(),
            self.connect_timeout,
            self.options,
        )
        .await?;

        debug!(id = %message.id, kind = %message.kind, to = %address, ?ack, "Delivered");
        ack.into_result()
    }
}

#[async_trait]
impl<C: Codec> Caller for FabricLink<C> {
    async fn call(&self, message: &Message) -> tether_core::Result<()> {
        self.deliver(&self.remote.requests, message)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl<C: Codec> ReplySender for FabricLink<C> {
    async fn send_reply(&self, message: &Message) -> tether_core::Result<()> {
        self.deliver(&self.remote.responses, message)
            .await
            .map_err(Into::into)
    }
}
