//! # syncterest-client
//!
//! Headless client core for the Syncterest social network. An embedding
//! shell (desktop UI, TUI, bot) constructs a [`Client`], signs in through
//! [`Client::auth`], drives the per-entity services and renders from the
//! [`ClientEvent`] stream.

pub mod api;
pub mod auth;
pub mod config;
pub mod events;
pub mod routes;
pub mod services;
pub mod state;

mod error;

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use syncterest_realtime::{
    spawn_socket, ChannelRegistry, RealtimeTransport, SocketCommand, SocketConfig,
    SocketNotification,
};
use syncterest_shared::time::{SystemTimeProvider, TimeProvider};
use syncterest_store::{Database, QueryCache};

use crate::api::ApiClient;
use crate::auth::AuthManager;
use crate::config::ClientConfig;
use crate::events::EventBus;
use crate::services::ServiceContext;

pub use crate::error::{ClientError, Result};
pub use crate::events::ClientEvent;
pub use crate::routes::{redirect_for, Route, SettingsSection};
pub use crate::state::{AuthUser, Session};

/// Install the process-wide tracing subscriber.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("syncterest_client=debug,syncterest_realtime=debug,syncterest_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// The assembled client core.
pub struct Client {
    config: ClientConfig,
    api: Arc<ApiClient>,
    auth: Arc<AuthManager>,
    db: Arc<Mutex<Database>>,
    cache: Arc<Mutex<QueryCache>>,
    bus: EventBus,
    time: Arc<dyn TimeProvider>,
}

impl Client {
    /// Build a client against one backend project, opening the local
    /// cache database.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let api = Arc::new(ApiClient::new(&config)?);
        let auth = Arc::new(AuthManager::new(api.clone()));
        let db = Arc::new(Mutex::new(Database::new()?));

        Ok(Self {
            config,
            api,
            auth,
            db,
            cache: Arc::new(Mutex::new(QueryCache::new())),
            bus: EventBus::new(),
            time: Arc::new(SystemTimeProvider),
        })
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn events(&self) -> tokio::sync::broadcast::Receiver<ClientEvent> {
        self.bus.subscribe()
    }

    /// Sign out and drop every cached query result.
    pub async fn sign_out(&self) -> Result<()> {
        self.auth.sign_out().await?;
        self.cache.lock()?.clear();
        Ok(())
    }

    /// Connect the realtime socket for the signed-in session and build
    /// the shared service context.
    ///
    /// The returned notification receiver carries everything the socket
    /// task produces; the embedder's event loop routes notifications to
    /// the matching service handlers.
    pub async fn connect_realtime(
        &self,
        transport: Arc<dyn RealtimeTransport>,
    ) -> Result<(ServiceContext, mpsc::Receiver<SocketNotification>)> {
        let access_token = self
            .api
            .access_token()
            .ok_or(ClientError::NotSignedIn)?;

        let socket_config = SocketConfig {
            url: self.config.realtime_url()?,
            access_token,
        };
        let (cmd_tx, notif_rx) = spawn_socket(transport, socket_config).await?;
        self.bus
            .emit(ClientEvent::ConnectionChanged { connected: true });

        let ctx = ServiceContext {
            api: self.api.clone(),
            auth: self.auth.clone(),
            db: self.db.clone(),
            cache: self.cache.clone(),
            registry: ChannelRegistry::new(cmd_tx.clone()),
            cmd_tx,
            bus: self.bus.clone(),
            time: self.time.clone(),
        };
        Ok((ctx, notif_rx))
    }

    /// Tear down the realtime connection and emit the disconnect event.
    pub async fn disconnect_realtime(&self, ctx: &ServiceContext) -> Result<()> {
        ctx.cmd_tx
            .send(SocketCommand::Shutdown)
            .await
            .map_err(|_| syncterest_realtime::RealtimeError::SocketGone)?;
        self.bus
            .emit(ClientEvent::ConnectionChanged { connected: false });
        Ok(())
    }
}
