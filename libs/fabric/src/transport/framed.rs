use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Largest frame accepted by default (100MB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 100 * 1024 * 1024;

/// Per-connection framing settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOptions {
    pub send_timeout: Option<Duration>,
    pub receive_timeout: Option<Duration>,
    pub max_frame_len: usize,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            send_timeout: None,
            receive_timeout: None,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Length-prefix framing over any byte stream
///
/// Each frame is a 4-byte big-endian length followed by that many bytes.
pub struct Framed<S> {
    stream: S,
    options: FrameOptions,
}

impl<S> Framed<S> {
    pub fn new(stream: S, options: FrameOptions) -> Self {
        Self { stream, options }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn options(&self) -> FrameOptions {
        self.options
    }
}

#[async_trait::async_trait]
impl<S> Transport for Framed<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync,
{
    async fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len())
            .ok()
            .filter(|len| *len as usize <= self.options.max_frame_len)
            .ok_or_else(|| {
                Error::InvalidFrame(format!("Message too large: {} bytes", bytes.len()))
            })?;

        let stream = &mut self.stream;
        let send_op = async {
            stream.write_u32(len).await?;
            stream.write_all(bytes).await?;
            stream.flush().await?;
            Ok::<(), Error>(())
        };

        bounded(self.options.send_timeout, "Send", send_op).await
    }

    async fn receive(&mut self) -> Result<Vec<u8>> {
        let max_frame_len = self.options.max_frame_len;
        let stream = &mut self.stream;
        let receive_op = async {
            let len = stream.read_u32().await.map_err(closed_on_eof)? as usize;

            if len > max_frame_len {
                return Err(Error::InvalidFrame(format!(
                    "Message too large: {} bytes",
                    len
                )));
            }

            let mut buf = vec![0u8; len];
            stream.read_exact(&mut buf).await.map_err(closed_on_eof)?;

            Ok::<Vec<u8>, Error>(buf)
        };

        bounded(self.options.receive_timeout, "Receive", receive_op).await
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

async fn bounded<T>(
    timeout: Option<Duration>,
    what: &'static str,
    op: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, op)
            .await
            .map_err(|_| Error::Timeout(what))?,
        None => op.await,
    }
}

fn closed_on_eof(e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::ConnectionClosed
    } else {
        e.into()
    }
}
