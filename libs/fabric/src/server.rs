//! Inbound side of a node: accepts connections and acknowledges every frame.

use std::sync::Arc;

use tether::{InboundRequests, InboundResponses};
use tether_core::Message;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, debug_span, warn, Instrument};

use crate::codec::Codec;
use crate::envelope::{Ack, Envelope};
use crate::error::{Error, Result};
use crate::transport::{Transport, TransportListener};

/// Where decoded envelopes go
#[derive(Clone)]
pub enum Endpoint {
    Requests(Arc<dyn InboundRequests>),
    Responses(Arc<dyn InboundResponses>),
}

impl Endpoint {
    fn name(&self) -> &'static str {
        match self {
            Endpoint::Requests(_) => "requests",
            Endpoint::Responses(_) => "responses",
        }
    }

    fn accept(&self, message: Message) -> tether_core::Result<()> {
        match self {
            Endpoint::Requests(requests) => requests.accept_request(message),
            Endpoint::Responses(responses) => responses.accept_response(message),
        }
    }
}

/// Accept connections until `token` is cancelled.
///
/// Each connection is served by its own task; its frames are handled in
/// the order they arrive.
pub async fn serve<L, C>(mut listener: L, codec: C, endpoint: Endpoint, token: CancellationToken)
where
    L: TransportListener,
    C: Codec,
{
    let connections = TaskTracker::new();
    let span = debug_span!("serve", endpoint = endpoint.name());

    async {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(transport) => {
                        connections.spawn(
                            connection(transport, codec.clone(), endpoint.clone(), token.clone())
                                .in_current_span(),
                        );
                    }
                    Err(err) => warn!(error = %err, "Accept failed"),
                },
            }
        }

        connections.close();
        connections.wait().await;

        if let Err(err) = listener.close().await {
            warn!(error = %err, "Listener close failed");
        }
        debug!("Stopped serving");
    }
    .instrument(span)
    .await
}

async fn connection<T, C>(mut transport: T, codec: C, endpoint: Endpoint, token: CancellationToken)
where
    T: Transport,
    C: Codec,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            frame = transport.receive() => frame,
        };

        let bytes = match frame {
            Ok(bytes) => bytes,
            Err(Error::ConnectionClosed) => break,
            Err(err) => {
                warn!(error = %err, "Receive failed, dropping connection");
                break;
            }
        };

        let ack = acknowledge(&codec, &endpoint, &bytes);
        if let Err(err) = send_ack(&mut transport, &codec, &ack).await {
            warn!(error = %err, "Acknowledgement failed, dropping connection");
            break;
        }
    }

    if let Err(err) = transport.close().await {
        debug!(error = %err, "Connection close failed");
    }
}

fn acknowledge<C: Codec>(codec: &C, endpoint: &Endpoint, bytes: &[u8]) -> Ack {
    let envelope: Envelope = match codec.decode(bytes) {
        Ok(envelope) => envelope,
        Err(err) => {
            debug!(error = %err, "Undecodable envelope");
            return Ack::Rejected(err.to_string());
        }
    };

    let ack = Ack::from_result(endpoint.accept(envelope.into()));
    if let Ack::Rejected(reason) | Ack::Failed(reason) = &ack {
        debug!(reason = %reason, "Envelope refused");
    }
    ack
}

async fn send_ack<T: Transport, C: Codec>(transport: &mut T, codec: &C, ack: &Ack) -> Result<()> {
    let bytes = codec.encode(ack)?;
    transport.send(&bytes).await
}
