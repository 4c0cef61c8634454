use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::codec::Codec;
use crate::error::Result;
use crate::transport::{Address, FrameOptions};

/// Perform a one-off request/response
///
/// Opens a connection, sends the request, receives the response, and closes the connection.
pub async fn request<Req, Res, C>(
    address: &Address,
    request: &Req,
    codec: C,
    connect_timeout: Option<Duration>,
    options: FrameOptions,
) -> Result<Res>
where
    Req: Serialize,
    Res: for<'de> Deserialize<'de>,
    C: Codec,
{
    let mut channel = Channel::connect(address, codec, connect_timeout, options).await?;
    channel.send(request).await?;
    let response = channel.receive().await?;
    channel.close().await?;
    Ok(response)
}
