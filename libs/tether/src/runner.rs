//! # Call Orchestrator
//!
//! Sends a request and bridges its correlated responses to a stream the
//! application consumes.
//!
//! Each call gets one coordinating task that owns the call's subscription.
//! The task waits on three events (expiry, stop, delivery) and ends in a
//! single terminal state; the subscription, the response stream and the
//! cancellation scope are released exactly once when it ends, whatever the
//! cause.

use std::future::Future;
use std::pin::{pin, Pin};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tether_core::{Message, Result};
use tokio::sync::mpsc::{self, WeakSender};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;
use tracing::{debug, debug_span, Instrument};

use crate::correlator::Correlator;
use crate::link::Caller;

/// Responses of one call, in the order they were published.
///
/// Ends when the call's deadline passes, when it is stopped, or when the peer
/// shuts down. Dropping the stream ends the call as well.
#[derive(Debug)]
pub struct ResponseStream {
    receiver: mpsc::Receiver<Message>,
}

impl ResponseStream {
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }
}

impl Stream for ResponseStream {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Tells a call that no further responses are wanted.
///
/// Dropping the handle does not stop the call.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub struct Runner {
    caller: Arc<dyn Caller>,
    correlator: Arc<Correlator>,
    root: CancellationToken,
    tracker: TaskTracker,
    response_buffer: usize,
}

impl Runner {
    pub fn new(
        caller: Arc<dyn Caller>,
        correlator: Arc<Correlator>,
        root: CancellationToken,
        tracker: TaskTracker,
        response_buffer: usize,
    ) -> Self {
        Self {
            caller,
            correlator,
            root,
            tracker,
            response_buffer: response_buffer.max(1),
        }
    }

    pub(crate) fn caller(&self) -> &Arc<dyn Caller> {
        &self.caller
    }

    /// Send `message` and collect its responses until its deadline.
    ///
    /// Nothing is sent when the message is invalid or its deadline has
    /// already passed. The subscription is taken before the request goes out
    /// so that an immediate response is not lost; if sending fails the
    /// subscription is released before the error is returned.
    pub async fn run(&self, message: Message) -> Result<(ResponseStream, StopHandle)> {
        message.validate()?;
        let expires_at = message.remaining()?.map(|left| Instant::now() + left);

        let (inbox, owner) = self.correlator.subscribe_owned(&message.id)?;
        let subscription = Subscription {
            correlator: self.correlator.clone(),
            id: message.id.clone(),
            owner,
        };

        self.caller.call(&message).await?;

        let scope = self.root.child_token();
        let stop = CancellationToken::new();
        let (outbox, receiver) = mpsc::channel(self.response_buffer);

        let session = Session {
            subscription,
            outbox,
            inbox,
            expires_at,
            stop: stop.clone(),
            scope: scope.clone(),
            _release: scope.drop_guard(),
        };

        let span = debug_span!("call", id = %message.id, kind = %message.kind);
        self.tracker.spawn(session.run().instrument(span));

        Ok((ResponseStream { receiver }, StopHandle { token: stop }))
    }
}

// Unsubscribes when dropped, so every exit path releases the id. Only the
// registration this call made is removed, never a later one for the same id.
struct Subscription {
    correlator: Arc<Correlator>,
    id: String,
    owner: WeakSender<Message>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.correlator.release(&self.id, &self.owner) {
            debug!(id = %self.id, "Subscription already released");
        }
    }
}

#[derive(Debug)]
enum Event {
    Expired,
    Stopped,
    Delivered(Message),
    Closed,
}

impl Event {
    fn label(&self) -> &'static str {
        match self {
            Event::Expired => "expired",
            Event::Stopped => "stopped",
            Event::Delivered(_) => "delivered",
            Event::Closed => "closed",
        }
    }
}

// Field order is drop order: unsubscribe, close the stream, release the scope.
struct Session {
    subscription: Subscription,
    outbox: mpsc::Sender<Message>,
    inbox: mpsc::Receiver<Message>,
    expires_at: Option<Instant>,
    stop: CancellationToken,
    scope: CancellationToken,
    _release: DropGuard,
}

impl Session {
    async fn run(mut self) {
        let mut expiry = pin!(expire(self.expires_at));

        let terminal = loop {
            match self.next_event(expiry.as_mut()).await {
                Event::Delivered(message) => {
                    if let Some(event) = self.forward(message, expiry.as_mut()).await {
                        break event;
                    }
                }
                event => break event,
            }
        };

        debug!(id = %self.subscription.id, reason = terminal.label(), "Call finished");
    }

    async fn next_event<F: Future<Output = ()>>(&mut self, expiry: Pin<&mut F>) -> Event {
        tokio::select! {
            biased;
            _ = expiry => Event::Expired,
            _ = self.scope.cancelled() => Event::Expired,
            _ = self.stop.cancelled() => Event::Stopped,
            _ = self.outbox.closed() => Event::Closed,
            next = self.inbox.recv() => match next {
                Some(message) => Event::Delivered(message),
                None => Event::Closed,
            },
        }
    }

    // Hands one response to the application; returns the terminal event if
    // the call ended while waiting for room on the stream.
    async fn forward<F: Future<Output = ()>>(
        &self,
        message: Message,
        expiry: Pin<&mut F>,
    ) -> Option<Event> {
        tokio::select! {
            biased;
            _ = expiry => Some(Event::Expired),
            _ = self.scope.cancelled() => Some(Event::Expired),
            _ = self.stop.cancelled() => Some(Event::Stopped),
            sent = self.outbox.send(message) => sent.err().map(|_| Event::Closed),
        }
    }
}

async fn expire(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
