//! A [`Peer`] bound to a pair of listeners and a remote peer.

use std::sync::Arc;
use std::time::Duration;

use tether::{Peer, PeerConfig};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

use crate::codec::Codec;
use crate::config::{Endpoints, NodeConfig};
use crate::error::Result;
use crate::link::FabricLink;
use crate::server::{serve, Endpoint};
use crate::transport::{FrameOptions, Listener};

/// Listeners bound, peer not yet started
///
/// Binding first lets two nodes learn each other's ephemeral addresses
/// before either starts.
pub struct BoundNode<C> {
    requests: Listener,
    responses: Listener,
    local: Endpoints,
    codec: C,
    options: FrameOptions,
    connect_timeout: Option<Duration>,
}

impl<C: Codec> BoundNode<C> {
    pub fn local_endpoints(&self) -> &Endpoints {
        &self.local
    }

    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Start serving and calling `remote`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self, remote: Endpoints, config: PeerConfig) -> Node<C> {
        let link = Arc::new(
            FabricLink::new(remote, self.codec.clone())
                .connect_timeout(self.connect_timeout)
                .options(self.options),
        );
        let peer = Peer::new(link.clone(), link.clone(), config);

        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        tracker.spawn(serve(
            self.requests,
            self.codec.clone(),
            Endpoint::Requests(peer.requests()),
            token.clone(),
        ));
        tracker.spawn(serve(
            self.responses,
            self.codec,
            Endpoint::Responses(peer.responses()),
            token.clone(),
        ));
        tracker.close();

        info!(
            requests = %self.local.requests,
            responses = %self.local.responses,
            remote_requests = %link.remote().requests,
            "Node started"
        );

        Node {
            peer,
            link,
            local: self.local,
            token,
            tracker,
        }
    }
}

/// A running peer reachable over the fabric
pub struct Node<C> {
    peer: Peer,
    link: Arc<FabricLink<C>>,
    local: Endpoints,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl<C: Codec> Node<C> {
    /// Bind both listeners with default framing options
    pub async fn bind(listen: &Endpoints, codec: C) -> Result<BoundNode<C>> {
        Self::bind_with(listen, codec, FrameOptions::default()).await
    }

    pub async fn bind_with(
        listen: &Endpoints,
        codec: C,
        options: FrameOptions,
    ) -> Result<BoundNode<C>> {
        let requests = listen.requests.bind(options).await?;
        let responses = listen.responses.bind(options).await?;
        let local = Endpoints {
            requests: requests.local_address()?,
            responses: responses.local_address()?,
        };

        Ok(BoundNode {
            requests,
            responses,
            local,
            codec,
            options,
            connect_timeout: None,
        })
    }

    /// Bind and start in one step
    pub async fn start(config: NodeConfig, codec: C) -> Result<Self> {
        let bound = Self::bind_with(&config.listen, codec, config.frame_options())
            .await?
            .connect_timeout(config.connect_timeout);
        Ok(bound.start(config.remote, config.peer))
    }

    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    pub fn link(&self) -> &Arc<FabricLink<C>> {
        &self.link
    }

    pub fn local_endpoints(&self) -> &Endpoints {
        &self.local
    }

    /// Stop accepting, then shut the peer down.
    pub async fn shutdown(&self) {
        self.token.cancel();
        self.tracker.wait().await;
        self.peer.shutdown().await;
        info!(requests = %self.local.requests, "Node stopped");
    }
}
