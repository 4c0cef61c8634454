use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The single payload unit exchanged between peers.
///
/// A request and every response to it share the same `id`. On a request,
/// `kind` selects the handler; on a response it tags what the payload means.
/// `data` is never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Vec<u8>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            data: data.into(),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Build a response correlated with this message.
    pub fn reply(&self, kind: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::new(self.id.clone(), kind, data)
    }

    /// Check that `id` and `type` are present.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::MissingField("id"));
        }
        if self.kind.is_empty() {
            return Err(Error::MissingField("type"));
        }
        Ok(())
    }

    /// The deadline with zero values folded into "unset".
    pub fn effective_deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline.filter(|deadline| !is_zero(deadline))
    }

    /// Time left until the deadline.
    ///
    /// `Ok(None)` when there is no deadline, `Err(DeadlineExceeded)` when it
    /// has already passed.
    pub fn remaining(&self) -> Result<Option<Duration>> {
        remaining(self.effective_deadline())
    }
}

/// Time left until `deadline`, measured against the local clock.
pub fn remaining(deadline: Option<DateTime<Utc>>) -> Result<Option<Duration>> {
    let Some(deadline) = deadline.filter(|deadline| !is_zero(deadline)) else {
        return Ok(None);
    };

    match (deadline - Utc::now()).to_std() {
        Ok(left) if !left.is_zero() => Ok(Some(left)),
        _ => Err(Error::DeadlineExceeded),
    }
}

// Peers written against other runtimes send either the Unix epoch or
// 0001-01-01T00:00:00Z for "no deadline".
const ZERO_INSTANT_SECS: i64 = -62_135_596_800;

fn is_zero(deadline: &DateTime<Utc>) -> bool {
    deadline.timestamp_subsec_nanos() == 0
        && matches!(deadline.timestamp(), 0 | ZERO_INSTANT_SECS)
}
