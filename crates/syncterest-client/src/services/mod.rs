//! Per-entity operations wiring the API client, local store and realtime
//! layer together.
//!
//! Every service catches its own failures at the boundary: the error is
//! surfaced as an [`ClientEvent::ErrorSurfaced`] event and still returned
//! to the caller. Mutations are never retried.

pub mod calls;
pub mod channels;
pub mod discovery;
pub mod events;
pub mod groups;
pub mod live_activity;
pub mod location;
pub mod messaging;
pub mod notifications;
pub mod profile;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use syncterest_realtime::{ChannelRegistry, SocketCommand};
use syncterest_shared::time::TimeProvider;
use syncterest_store::{Database, QueryCache};

use crate::api::ApiClient;
use crate::auth::AuthManager;
use crate::error::Result;
use crate::events::{ClientEvent, EventBus};

/// Everything a service needs. Cloning shares all handles.
#[derive(Clone)]
pub struct ServiceContext {
    pub api: Arc<ApiClient>,
    pub auth: Arc<AuthManager>,
    pub db: Arc<Mutex<Database>>,
    /// Shared query cache. Written only from mutation-success paths and
    /// realtime handlers.
    pub cache: Arc<Mutex<QueryCache>>,
    pub registry: ChannelRegistry,
    pub cmd_tx: mpsc::Sender<SocketCommand>,
    pub bus: EventBus,
    pub time: Arc<dyn TimeProvider>,
}

impl ServiceContext {
    /// Surface a failure as a user-facing event while propagating it.
    pub(crate) fn surface<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.bus.emit(ClientEvent::ErrorSurfaced {
                message: e.surface_message(),
            });
        }
        result
    }
}
