//! Wire form of a message and of the acknowledgement answering it.
//!
//! In JSON an envelope reads `{"id":..,"type":..,"data":..,"deadline":..}`
//! with `data` embedded as raw JSON and an RFC 3339 `deadline` (or `null`).
//! Binary codecs carry `data` as plain bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tether_core::Message;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, with = "payload")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        // Zero deadlines never leave the process.
        let deadline = message.effective_deadline();
        Self {
            id: message.id,
            kind: message.kind,
            data: message.data,
            deadline,
        }
    }
}

impl From<&Message> for Envelope {
    fn from(message: &Message) -> Self {
        Self::from(message.clone())
    }
}

impl From<Envelope> for Message {
    fn from(envelope: Envelope) -> Self {
        Self {
            id: envelope.id,
            kind: envelope.kind,
            data: envelope.data,
            deadline: envelope.deadline,
        }
    }
}

/// Answer to every envelope a peer receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ack {
    Accepted,
    /// The envelope was malformed, incomplete, or of a type nobody serves.
    Rejected(String),
    /// The envelope was understood but could not be acted on.
    Failed(String),
}

impl Ack {
    pub fn from_result(result: tether_core::Result<()>) -> Self {
        match result {
            Ok(()) => Ack::Accepted,
            Err(err) if err.is_client_error() => Ack::Rejected(err.to_string()),
            Err(err) => Ack::Failed(err.to_string()),
        }
    }

    pub fn into_result(self) -> crate::Result<()> {
        match self {
            Ack::Accepted => Ok(()),
            Ack::Rejected(reason) => Err(crate::Error::Rejected(reason)),
            Ack::Failed(reason) => Err(crate::Error::Failed(reason)),
        }
    }
}

// Human-readable formats embed the payload as raw JSON; an empty payload is
// written and read as `null`. Binary formats carry the bytes as-is.
mod payload {
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::value::RawValue;

    const NULL: &str = "null";

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if !serializer.is_human_readable() {
            return data.serialize(serializer);
        }

        let text = match data {
            [] => NULL,
            _ => std::str::from_utf8(data).map_err(S::Error::custom)?,
        };
        let raw: &RawValue = serde_json::from_str(text)
            .map_err(|e| S::Error::custom(format!("payload is not JSON: {e}")))?;
        raw.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if !deserializer.is_human_readable() {
            return Vec::<u8>::deserialize(deserializer);
        }

        let raw = Box::<RawValue>::deserialize(deserializer)?;
        match raw.get() {
            NULL => Ok(Vec::new()),
            text => Ok(text.as_bytes().to_vec()),
        }
    }
}
