use std::sync::Arc;

use chrono::{DateTime, Utc};
use tether_core::{Message, Result};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::client::Client;
use crate::config::PeerConfig;
use crate::correlator::Correlator;
use crate::dispatcher::Dispatcher;
use crate::handler::{Handler, Registration, RespondingHandler};
use crate::link::{Caller, InboundRequests, InboundResponses, ReplySender};
use crate::runner::{ResponseStream, Runner, StopHandle};

/// One side of a conversation: serves registered types and calls the remote
/// peer.
///
/// Bound to a transport through the [`Caller`] and [`ReplySender`] it is
/// built with, and through the two inbound entry points it exposes.
#[derive(Clone)]
pub struct Peer {
    correlator: Arc<Correlator>,
    dispatcher: Arc<Dispatcher>,
    client: Client,
    root: CancellationToken,
    tracker: TaskTracker,
}

impl Peer {
    pub fn new(caller: Arc<dyn Caller>, replies: Arc<dyn ReplySender>, config: PeerConfig) -> Self {
        let config = config.clamped();
        let root = CancellationToken::new();
        let tracker = TaskTracker::new();

        let correlator = Arc::new(Correlator::new(config.subscription_capacity));
        let runner = Arc::new(Runner::new(
            caller,
            correlator.clone(),
            root.clone(),
            tracker.clone(),
            config.response_buffer,
        ));
        let client = Client::new(runner);
        let dispatcher = Arc::new(Dispatcher::new(
            client.clone(),
            replies,
            root.clone(),
            tracker.clone(),
        ));

        Self {
            correlator,
            dispatcher,
            client,
            root,
            tracker,
        }
    }

    pub fn register(&self, kind: impl Into<String>, handler: impl Handler + 'static) {
        self.dispatcher
            .register(kind, Registration::Plain(Arc::new(handler)));
    }

    pub fn register_with_responder(
        &self,
        kind: impl Into<String>,
        handler: impl RespondingHandler + 'static,
    ) {
        self.dispatcher
            .register(kind, Registration::Responding(Arc::new(handler)));
    }

    pub fn register_catch_all(&self, handler: impl RespondingHandler + 'static) {
        self.dispatcher.register_catch_all(Arc::new(handler));
    }

    pub async fn call(&self, message: Message) -> Result<()> {
        self.client.call(message).await
    }

    pub async fn call_with_response(
        &self,
        message: Message,
    ) -> Result<(ResponseStream, StopHandle)> {
        self.client.call_with_response(message).await
    }

    pub async fn call_with_deadline(
        &self,
        message: Message,
        deadline: DateTime<Utc>,
    ) -> Result<(ResponseStream, StopHandle)> {
        self.client.call_with_deadline(message, deadline).await
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Where the transport hands decoded requests.
    pub fn requests(&self) -> Arc<dyn InboundRequests> {
        self.dispatcher.clone()
    }

    /// Where the transport hands decoded responses.
    pub fn responses(&self) -> Arc<dyn InboundResponses> {
        self.correlator.clone()
    }

    pub fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Cancel every handler scope and call, then wait for their tasks.
    ///
    /// Handlers that never observe their scope keep this waiting.
    pub async fn shutdown(&self) {
        debug!(tasks = self.tracker.len(), "Shutting down peer");
        self.root.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
