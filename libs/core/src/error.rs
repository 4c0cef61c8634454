use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unrecognized message type: {0}")]
    UnknownType(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("subscription already exists for id {0}")]
    AlreadySubscribed(String),

    #[error("no subscription for id {0}")]
    NotSubscribed(String),

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("call failed: {0}")]
    CallFailed(String),

    #[error(transparent)]
    Transport(BoxError),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("{0}")]
    Custom(String),
}

impl Error {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Wrap a collaborator failure without interpreting it.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }

    /// Errors caused by what the remote side sent rather than by this process.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownType(_) | Self::MissingField(_) | Self::Codec(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
