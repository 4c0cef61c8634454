use serde::{Deserialize, Serialize};

/// Queue depth of a subscription inside the correlator.
pub const DEFAULT_SUBSCRIPTION_CAPACITY: usize = 10;

/// Queue depth of the stream handed to the application.
pub const DEFAULT_RESPONSE_BUFFER: usize = 1;

/// Engine tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Responses a subscription absorbs before further publishes are dropped.
    pub subscription_capacity: usize,
    /// Responses buffered between a call's coordinating task and the application.
    pub response_buffer: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            subscription_capacity: DEFAULT_SUBSCRIPTION_CAPACITY,
            response_buffer: DEFAULT_RESPONSE_BUFFER,
        }
    }
}

impl PeerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscription_capacity(mut self, capacity: usize) -> Self {
        self.subscription_capacity = capacity;
        self
    }

    pub fn response_buffer(mut self, buffer: usize) -> Self {
        self.response_buffer = buffer;
        self
    }

    // tokio channels reject a zero capacity.
    pub(crate) fn clamped(self) -> Self {
        Self {
            subscription_capacity: self.subscription_capacity.max(1),
            response_buffer: self.response_buffer.max(1),
        }
    }
}
