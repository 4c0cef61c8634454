//! # Request Dispatcher
//!
//! Routes inbound requests to registered handlers and runs each one as its
//! own task, bounded by the request deadline.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use tether_core::{Error, Message, Result};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::client::Client;
use crate::handler::{Registration, Responder, RespondingHandler, Scope};
use crate::link::{InboundRequests, ReplySender};

pub struct Dispatcher {
    table: RwLock<HashMap<String, Registration>>,
    catch_all: RwLock<Option<Arc<dyn RespondingHandler>>>,
    client: Client,
    replies: Arc<dyn ReplySender>,
    root: CancellationToken,
    tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(
        client: Client,
        replies: Arc<dyn ReplySender>,
        root: CancellationToken,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
            catch_all: RwLock::new(None),
            client,
            replies,
            root,
            tracker,
        }
    }

    /// Serve `kind` with `registration`, replacing any earlier handler.
    pub fn register(&self, kind: impl Into<String>, registration: Registration) {
        let kind = kind.into();
        if self.table.write().insert(kind.clone(), registration).is_some() {
            debug!(kind = %kind, "Handler replaced");
        }
    }

    /// Serve every type without its own registration.
    pub fn register_catch_all(&self, handler: Arc<dyn RespondingHandler>) {
        *self.catch_all.write() = Some(handler);
    }

    /// Start the handler for `message` and return without waiting for it.
    pub fn dispatch(&self, message: Message) -> Result<()> {
        message.validate()?;

        let registration = self.lookup(&message.kind)?;
        let remaining = message.remaining()?;

        let token = self.root.child_token();
        let scope = Scope::new(token.clone(), message.effective_deadline());
        let span = info_span!("dispatch", id = %message.id, kind = %message.kind);

        let unit: BoxFuture<'static, Result<()>> = match registration {
            Registration::Plain(handler) => {
                let client = self.client.clone();
                async move { handler.handle(scope, message, client).await }.boxed()
            }
            Registration::Responding(handler) => {
                let responder = Responder::new(
                    message.id.clone(),
                    message.kind.clone(),
                    self.replies.clone(),
                    self.client.clone(),
                );
                async move { handler.handle(scope, message, responder).await }.boxed()
            }
        };

        self.tracker.spawn(run_unit(unit, token, remaining).instrument(span));

        Ok(())
    }

    fn lookup(&self, kind: &str) -> Result<Registration> {
        if let Some(registration) = self.table.read().get(kind) {
            return Ok(registration.clone());
        }

        self.catch_all
            .read()
            .clone()
            .map(Registration::Responding)
            .ok_or_else(|| Error::UnknownType(kind.to_string()))
    }
}

impl InboundRequests for Dispatcher {
    fn accept_request(&self, message: Message) -> Result<()> {
        self.dispatch(message)
    }
}

// Runs one handler to completion. Neither a handler error nor a panic leaves
// this function.
async fn run_unit(
    unit: BoxFuture<'static, Result<()>>,
    token: CancellationToken,
    remaining: Option<Duration>,
) {
    let _release = token.clone().drop_guard();
    let mut outcome = AssertUnwindSafe(unit).catch_unwind();

    let outcome = match remaining {
        Some(left) => {
            tokio::select! {
                biased;
                outcome = &mut outcome => outcome,
                _ = tokio::time::sleep(left) => {
                    debug!("Deadline reached, cancelling handler scope");
                    token.cancel();
                    outcome.await
                }
            }
        }
        None => outcome.await,
    };

    match outcome {
        Ok(Ok(())) => debug!("Handler finished"),
        Ok(Err(err)) => warn!(error = %err, "Handler failed"),
        Err(panic) => error!(reason = %panic_message(&*panic), "Handler panicked"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    }
}
