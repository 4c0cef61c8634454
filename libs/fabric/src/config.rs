use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether::PeerConfig;

use crate::transport::{Address, FrameOptions, DEFAULT_MAX_FRAME_LEN};

/// The request and response endpoints of one peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub requests: Address,
    pub responses: Address,
}

impl Endpoints {
    pub fn new(requests: impl Into<Address>, responses: impl Into<Address>) -> Self {
        Self {
            requests: requests.into(),
            responses: responses.into(),
        }
    }
}

// Ephemeral loopback ports; only meaningful for `listen`.
impl Default for Endpoints {
    fn default() -> Self {
        let any = Address::Tcp(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)));
        Self {
            requests: any.clone(),
            responses: any,
        }
    }
}

/// Everything needed to start a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub listen: Endpoints,
    pub remote: Endpoints,
    pub connect_timeout: Option<Duration>,
    /// Applied to every send and receive on a connection.
    pub io_timeout: Option<Duration>,
    pub max_frame_len: usize,
    pub peer: PeerConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: Endpoints::default(),
            remote: Endpoints::default(),
            connect_timeout: None,
            io_timeout: None,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            peer: PeerConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn new(listen: Endpoints, remote: Endpoints) -> Self {
        Self {
            listen,
            remote,
            ..Self::default()
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    pub fn max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    pub fn peer(mut self, peer: PeerConfig) -> Self {
        self.peer = peer;
        self
    }

    pub fn frame_options(&self) -> FrameOptions {
        FrameOptions {
            send_timeout: self.io_timeout,
            receive_timeout: self.io_timeout,
            max_frame_len: self.max_frame_len,
        }
    }
}
