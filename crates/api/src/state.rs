use std::sync::Arc;

use andon_audio::AnnouncementCoordinator;
use andon_events::EventBus;
use andon_store::{CatalogStore, TicketStore};

use crate::config::ServerConfig;
use crate::engine::LifecycleController;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (operator, technician and dashboard views).
    pub ws_manager: Arc<WsManager>,
    pub event_bus: Arc<EventBus>,
    pub tickets: Arc<TicketStore>,
    pub catalogs: Arc<CatalogStore>,
    pub controller: Arc<LifecycleController>,
    pub coordinator: Arc<AnnouncementCoordinator>,
}
