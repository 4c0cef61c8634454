use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

mod framed;
pub mod tcp;
pub mod unix;

pub use self::framed::{FrameOptions, Framed, DEFAULT_MAX_FRAME_LEN};
pub use self::tcp::{TcpTransport, TcpTransportBuilder, TcpTransportListener};
pub use self::unix::{UnixTransport, UnixTransportBuilder, UnixTransportListener};

/// Transport trait for sending and receiving raw bytes
///
/// Each transport instance represents a single connection.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send bytes over the transport
    async fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Receive bytes from the transport
    async fn receive(&mut self) -> Result<Vec<u8>>;

    /// Close the transport connection
    async fn close(&mut self) -> Result<()>;
}

#[async_trait::async_trait]
impl Transport for Box<dyn Transport> {
    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).send(bytes).await
    }

    async fn receive(&mut self) -> Result<Vec<u8>> {
        (**self).receive().await
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

/// Accepts inbound connections for one local address
#[async_trait::async_trait]
pub trait TransportListener: Send + Sync {
    type Transport: Transport + 'static;

    /// Wait for the next connection
    async fn accept(&self) -> Result<Self::Transport>;

    /// Stop listening and release the local address
    async fn close(&mut self) -> Result<()>;
}

/// Where a peer listens: `tcp://host:port` or `unix:///path/to.sock`
///
/// A bare `host:port` parses as TCP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Address {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl Address {
    /// Open a framed connection to this address
    pub async fn connect(
        &self,
        connect_timeout: Option<Duration>,
        options: FrameOptions,
    ) -> Result<Box<dyn Transport>> {
        let transport: Box<dyn Transport> = match self {
            Address::Tcp(addr) => {
                let mut builder = TcpTransport::builder().address(*addr).options(options);
                if let Some(timeout) = connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                Box::new(builder.connect().await?)
            }
            Address::Unix(path) => {
                let mut builder = UnixTransport::builder().path(path).options(options);
                if let Some(timeout) = connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                Box::new(builder.connect().await?)
            }
        };
        Ok(transport)
    }

    /// Bind a listener on this address
    pub async fn bind(&self, options: FrameOptions) -> Result<Listener> {
        Ok(match self {
            Address::Tcp(addr) => {
                Listener::Tcp(TcpTransportListener::bind_with(*addr, options).await?)
            }
            Address::Unix(path) => {
                Listener::Unix(UnixTransportListener::bind_with(path, options).await?)
            }
        })
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(Error::InvalidAddress(s.to_string()));
            }
            return Ok(Address::Unix(PathBuf::from(path)));
        }

        let host = s.strip_prefix("tcp://").unwrap_or(s);
        host.parse()
            .map(Address::Tcp)
            .map_err(|_| Error::InvalidAddress(s.to_string()))
    }
}

impl TryFrom<String> for Address {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Address::Tcp(addr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tcp(addr) => write!(f, "tcp://{addr}"),
            Address::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// A bound listener of either kind
pub enum Listener {
    Tcp(TcpTransportListener),
    Unix(UnixTransportListener),
}

impl Listener {
    /// The address peers should connect to, with any ephemeral port resolved
    pub fn local_address(&self) -> Result<Address> {
        match self {
            Listener::Tcp(listener) => listener.local_addr().map(Address::Tcp),
            Listener::Unix(listener) => Ok(Address::Unix(listener.path().to_path_buf())),
        }
    }
}

#[async_trait::async_trait]
impl TransportListener for Listener {
    type Transport = Box<dyn Transport>;

    async fn accept(&self) -> Result<Self::Transport> {
        let transport: Box<dyn Transport> = match self {
            Listener::Tcp(listener) => Box::new(listener.accept().await?),
            Listener::Unix(listener) => Box::new(listener.accept().await?),
        };
        Ok(transport)
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Listener::Tcp(listener) => listener.close().await,
            Listener::Unix(listener) => listener.close().await,
        }
    }
}
