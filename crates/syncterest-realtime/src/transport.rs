//! Transport abstraction over the hosted realtime service.
//!
//! The socket task is written against these traits so tests can drive it
//! with an in-memory transport instead of a live connection.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use url::Url;

use syncterest_shared::protocol::RealtimeMessage;

use crate::error::{RealtimeError, Result};

/// Events pushed from the transport into the socket task.
#[derive(Debug)]
pub enum TransportEvent {
    Message(RealtimeMessage),
    Disconnected { error: Option<String> },
}

pub type TransportEventHandler = Box<dyn Fn(TransportEvent) + Send + Sync>;

/// Something that can open a realtime connection.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    async fn connect(
        &self,
        url: &Url,
        access_token: &str,
        handler: TransportEventHandler,
    ) -> Result<Box<dyn RealtimeConnection>>;
}

/// A live connection to the realtime service.
pub trait RealtimeConnection: Send + Sync {
    fn send(&self, message: RealtimeMessage) -> Result<()>;
    fn disconnect(&self);
}

// ---------------------------------------------------------------------------
// In-memory transport for tests
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    sent: Vec<RealtimeMessage>,
    handler: Option<TransportEventHandler>,
    connected: bool,
}

/// Transport that records outbound frames and lets tests inject inbound
/// ones. `connect` hands the event handler to the shared state so
/// [`MemoryTransport::inject`] can call it.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an inbound frame as if the server pushed it.
    pub fn inject(&self, message: RealtimeMessage) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handler) = &state.handler {
            handler(TransportEvent::Message(message));
        }
    }

    /// Simulate the transport dropping.
    pub fn drop_connection(&self, error: Option<String>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.connected = false;
        if let Some(handler) = &state.handler {
            handler(TransportEvent::Disconnected { error });
        }
    }

    /// Snapshot of every frame sent so far.
    pub fn sent(&self) -> Vec<RealtimeMessage> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).sent.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).connected
    }
}

struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl RealtimeTransport for MemoryTransport {
    async fn connect(
        &self,
        _url: &Url,
        _access_token: &str,
        handler: TransportEventHandler,
    ) -> Result<Box<dyn RealtimeConnection>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.handler = Some(handler);
        state.connected = true;
        Ok(Box::new(MemoryConnection {
            state: self.state.clone(),
        }))
    }
}

impl RealtimeConnection for MemoryConnection {
    fn send(&self, message: RealtimeMessage) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.connected {
            return Err(RealtimeError::NotConnected);
        }
        state.sent.push(message);
        Ok(())
    }

    fn disconnect(&self) {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).connected = false;
    }
}
