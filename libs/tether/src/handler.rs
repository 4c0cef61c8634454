//! Handler and responder contracts.
//!
//! A type is served either by a plain [`Handler`], which may only make
//! further outbound calls, or by a [`RespondingHandler`], which is also given
//! a [`Responder`] bound to the inbound call's id.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tether_core::{Message, Result};
use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::link::ReplySender;

/// Execution scope of one dispatched handler.
///
/// Cancelled when the request deadline passes, when the peer shuts down, or
/// once the handler has returned.
#[derive(Debug, Clone)]
pub struct Scope {
    token: CancellationToken,
    deadline: Option<DateTime<Utc>>,
}

impl Scope {
    pub(crate) fn new(token: CancellationToken, deadline: Option<DateTime<Utc>>) -> Self {
        Self { token, deadline }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Handles a request without replying to it.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, scope: Scope, message: Message, client: Client) -> Result<()>;
}

/// Handles a request and may reply to it any number of times.
#[async_trait]
pub trait RespondingHandler: Send + Sync {
    async fn handle(&self, scope: Scope, message: Message, responder: Responder) -> Result<()>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Scope, Message, Client) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn handle(&self, scope: Scope, message: Message, client: Client) -> Result<()> {
        (self)(scope, message, client).await
    }
}

#[async_trait]
impl<F, Fut> RespondingHandler for F
where
    F: Fn(Scope, Message, Responder) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn handle(&self, scope: Scope, message: Message, responder: Responder) -> Result<()> {
        (self)(scope, message, responder).await
    }
}

/// A registered handler, tagged by capability.
#[derive(Clone)]
pub enum Registration {
    Plain(Arc<dyn Handler>),
    Responding(Arc<dyn RespondingHandler>),
}

/// Reply capability scoped to a single inbound call.
///
/// There is no end-of-stream signal: callers learn a call is over from their
/// deadline or from a reply type they agreed on.
#[derive(Clone)]
pub struct Responder {
    id: String,
    kind: String,
    replies: Arc<dyn ReplySender>,
    client: Client,
}

impl Responder {
    pub(crate) fn new(
        id: String,
        kind: String,
        replies: Arc<dyn ReplySender>,
        client: Client,
    ) -> Self {
        Self {
            id,
            kind,
            replies,
            client,
        }
    }

    /// Id of the call being answered.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reply tagged with the request's own type.
    pub async fn respond(&self, data: impl Into<Vec<u8>>) -> Result<()> {
        self.respond_with_type(self.kind.clone(), data).await
    }

    pub async fn respond_with_type(
        &self,
        kind: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Result<()> {
        let reply = Message::new(self.id.clone(), kind, data);
        self.replies.send_reply(&reply).await
    }

    /// Outbound calls made from inside a responding handler.
    pub fn client(&self) -> &Client {
        &self.client
    }
}
