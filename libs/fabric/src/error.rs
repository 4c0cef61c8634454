use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("{0} timeout exceeded")]
    Timeout(&'static str),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The peer refused the envelope because of its content.
    #[error("Rejected by peer: {0}")]
    Rejected(String),

    /// The peer accepted the envelope but could not act on it.
    #[error("Failed at peer: {0}")]
    Failed(String),

    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for tether_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Rejected(reason) | Error::Failed(reason) => Self::CallFailed(reason),
            other => Self::transport(other),
        }
    }
}
