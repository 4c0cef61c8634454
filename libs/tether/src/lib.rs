//! Tether - request/response correlation for peers that call each other.
//!
//! A caller sends a [`Message`] and receives zero, one or many responses
//! sharing its id, optionally until a deadline. The remote side routes the
//! request to a handler registered for its type.
//!
//! The engine is transport agnostic: a transport implements [`Caller`] and
//! [`ReplySender`] and feeds decoded messages into [`Peer::requests`] and
//! [`Peer::responses`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tether::{Caller, Message, Peer, PeerConfig, ReplySender, Responder, Result, Scope};
//!
//! # async fn example(caller: Arc<dyn Caller>, replies: Arc<dyn ReplySender>) -> Result<()> {
//! let peer = Peer::new(caller, replies, PeerConfig::default());
//!
//! peer.register_with_responder(
//!     "greet",
//!     |_scope: Scope, message: Message, responder: Responder| async move {
//!         responder.respond(message.data).await
//!     },
//! );
//!
//! let (mut responses, stop) = peer
//!     .call_with_response(Message::new("t1", "greet", br#""hello""#.to_vec()))
//!     .await?;
//! if let Some(reply) = responses.recv().await {
//!     println!("{}", String::from_utf8_lossy(&reply.data));
//! }
//! stop.stop();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod correlator;
pub mod dispatcher;
pub mod handler;
pub mod link;
pub mod peer;
pub mod runner;

// Re-exports for convenience
pub use client::Client;
pub use config::PeerConfig;
pub use correlator::{Correlator, Delivery};
pub use dispatcher::Dispatcher;
pub use handler::{Handler, Registration, Responder, RespondingHandler, Scope};
pub use link::{Caller, InboundRequests, InboundResponses, ReplySender};
pub use peer::Peer;
pub use runner::{ResponseStream, Runner, StopHandle};
pub use tether_core::{Error, Message, Result};
