#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use tether::{
    Caller, Error, InboundRequests, InboundResponses, Message, Peer, PeerConfig, ReplySender,
    Result,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records what the engine sends instead of delivering it.
#[derive(Default)]
pub struct Recorder {
    sent: Mutex<Vec<Message>>,
    fail_with: Mutex<Option<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        let recorder = Self::default();
        *recorder.fail_with.lock().unwrap() = Some(reason.to_string());
        Arc::new(recorder)
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, message: &Message) -> Result<()> {
        if let Some(reason) = self.fail_with.lock().unwrap().clone() {
            return Err(Error::CallFailed(reason));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[async_trait]
impl Caller for Recorder {
    async fn call(&self, message: &Message) -> Result<()> {
        self.record(message)
    }
}

#[async_trait]
impl ReplySender for Recorder {
    async fn send_reply(&self, message: &Message) -> Result<()> {
        self.record(message)
    }
}

/// In-memory path to a remote peer's entry points.
#[derive(Default)]
pub struct Wire {
    requests: OnceLock<Arc<dyn InboundRequests>>,
    responses: OnceLock<Arc<dyn InboundResponses>>,
}

impl Wire {
    fn attach(&self, peer: &Peer) {
        let _ = self.requests.set(peer.requests());
        let _ = self.responses.set(peer.responses());
    }
}

#[async_trait]
impl Caller for Wire {
    async fn call(&self, message: &Message) -> Result<()> {
        let requests = self
            .requests
            .get()
            .ok_or_else(|| Error::custom("wire not attached"))?;
        requests.accept_request(message.clone())
    }
}

#[async_trait]
impl ReplySender for Wire {
    async fn send_reply(&self, message: &Message) -> Result<()> {
        let responses = self
            .responses
            .get()
            .ok_or_else(|| Error::custom("wire not attached"))?;
        responses.accept_response(message.clone())
    }
}

/// Two peers wired to each other in memory.
pub fn pair() -> (Peer, Peer) {
    let toward_b = Arc::new(Wire::default());
    let toward_a = Arc::new(Wire::default());

    let a = Peer::new(toward_b.clone(), toward_b.clone(), PeerConfig::default());
    let b = Peer::new(toward_a.clone(), toward_a.clone(), PeerConfig::default());

    toward_b.attach(&b);
    toward_a.attach(&a);

    (a, b)
}
