//! Tether Fabric - framed stream transport for tether peers
//!
//! Carries messages between two peers over TCP or Unix sockets, with a
//! pluggable codec (JSON or bincode). Every frame sent to a peer is
//! answered by an [`Ack`].
//!
//! # Example
//!
//! ```no_run
//! use tether::{Message, PeerConfig, Responder, Scope};
//! use tether_fabric::{codec::JsonCodec, Endpoints, Node};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let a = Node::bind(&Endpoints::default(), JsonCodec).await?;
//! let b = Node::bind(&Endpoints::default(), JsonCodec).await?;
//! let (a_local, b_local) = (a.local_endpoints().clone(), b.local_endpoints().clone());
//!
//! let a = a.start(b_local, PeerConfig::default());
//! let b = b.start(a_local, PeerConfig::default());
//!
//! b.peer().register_with_responder(
//!     "greet",
//!     |_scope: Scope, message: Message, responder: Responder| async move {
//!         responder.respond(message.data).await
//!     },
//! );
//!
//! let (mut responses, _stop) = a
//!     .peer()
//!     .call_with_response(Message::new("t1", "greet", br#""hello""#.to_vec()))
//!     .await?;
//! let reply = responses.recv().await;
//! # drop(reply);
//! # a.shutdown().await;
//! # b.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod link;
pub mod node;
pub mod request;
pub mod server;
pub mod transport;

// Re-exports for convenience
pub use channel::Channel;
pub use config::{Endpoints, NodeConfig};
pub use envelope::{Ack, Envelope};
pub use error::{Error, Result};
pub use link::FabricLink;
pub use node::{BoundNode, Node};
pub use server::{serve, Endpoint};
pub use transport::Address;
