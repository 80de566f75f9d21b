//! Scripted transports shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::retrieve::error::ContentError;
use crate::retrieve::transport::{RequestOptions, Transport, TransportResponse};

type Reply = Result<TransportResponse, ContentError>;

/// Plays back queued replies in order, then keeps returning the fallback.
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, RequestOptions)>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            queue: Mutex::new(replies.into()),
            fallback: Err(ContentError::Transport("script exhausted".into())),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(reply: Reply) -> Self {
        let mut transport = Self::new(Vec::new());
        transport.fallback = reply;
        transport
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<(String, RequestOptions)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, url: &str, options: &RequestOptions) -> Result<TransportResponse, ContentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((url.to_string(), options.clone()));

        if let Some(reply) = self.queue.lock().unwrap().pop_front() {
            return reply;
        }
        self.fallback.clone()
    }
}
