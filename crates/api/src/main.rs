use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use andon_api::background::analytics::AnalyticsTicker;
use andon_api::config::ServerConfig;
use andon_api::engine::{Announcer, LifecycleController};
use andon_api::notifications::EventRelay;
use andon_api::router::build_app_router;
use andon_api::state::AppState;
use andon_api::ws;
use andon_audio::{
    AnnouncementCoordinator, AudioScheduler, CommandSpeaker, GeminiSpeech, SpeechSynthesizer,
};
use andon_events::EventBus;
use andon_store::{CatalogStore, LocalStore, RemoteBackend, RestBackend, TicketStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "andon_api=debug,andon_store=debug,andon_audio=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let addr = match config.host.parse() {
        Ok(ip) => SocketAddr::new(ip, config.port),
        Err(e) => {
            tracing::error!(host = %config.host, error = %e, "Invalid HOST address");
            std::process::exit(1);
        }
    };

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    // --- Stores ---
    let local = LocalStore::new(&config.andon.data_dir);
    let remote = config
        .andon
        .backend
        .clone()
        .and_then(|backend| match RestBackend::new(backend) {
            Ok(backend) => Some(Arc::new(backend) as Arc<dyn RemoteBackend>),
            Err(e) => {
                tracing::warn!(error = %e, "Remote backend unavailable, running local-only");
                None
            }
        });
    if remote.is_none() {
        tracing::info!(data_dir = %config.andon.data_dir.display(), "Running local-only");
    }

    let tickets = Arc::new(TicketStore::new(
        local.clone(),
        remote,
        Arc::clone(&event_bus),
        config.andon.history_limit,
    ));
    tickets.load().await;

    let catalogs = Arc::new(CatalogStore::load(local, Arc::clone(&event_bus)).await);

    let cancel = CancellationToken::new();
    let feed_handle = tickets.subscribe(cancel.child_token());

    // --- Audio ---
    let fallback = Arc::new(CommandSpeaker::new(config.andon.fallback_tts_program.clone()));
    let mut scheduler = with_output_device(AudioScheduler::new(fallback));
    match config.andon.speech.clone().map(GeminiSpeech::new) {
        Some(Ok(speech)) => {
            scheduler = scheduler.with_synthesizer(Arc::new(speech) as Arc<dyn SpeechSynthesizer>);
        }
        Some(Err(e)) => tracing::warn!(error = %e, "Speech provider unavailable, using fallback speaker"),
        None => tracing::info!("No speech provider configured, using fallback speaker"),
    }
    let coordinator = Arc::new(
        AnnouncementCoordinator::new(Arc::new(scheduler))
            .with_arrival_beep(config.andon.arrival_beep),
    );
    let controller = Arc::new(LifecycleController::new(
        Arc::clone(&tickets),
        Arc::clone(&coordinator),
    ));

    // --- WebSocket manager ---
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));

    // --- Background services ---
    let relay_handle = tokio::spawn(
        EventRelay::new(Arc::clone(&ws_manager)).run(event_bus.subscribe(), cancel.child_token()),
    );
    let announcer_handle = tokio::spawn(
        Announcer::new(Arc::clone(&tickets), Arc::clone(&coordinator))
            .run(event_bus.subscribe(), cancel.child_token()),
    );
    let analytics_handle = tokio::spawn(
        AnalyticsTicker::new(
            Arc::clone(&tickets),
            Arc::clone(&catalogs),
            Arc::clone(&ws_manager),
            config.andon.utc_offset,
        )
        .run(event_bus.subscribe(), cancel.child_token()),
    );
    tracing::info!("Background services started (relay, announcer, analytics)");

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        event_bus,
        tickets,
        catalogs,
        controller,
        coordinator,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    let mut handles: Vec<(&str, JoinHandle<()>)> = vec![
        ("relay", relay_handle),
        ("announcer", announcer_handle),
        ("analytics", analytics_handle),
    ];
    if let Some(feed) = feed_handle {
        handles.push(("change feed", feed));
    }
    for (name, handle) in handles {
        if tokio::time::timeout(drain, handle).await.is_err() {
            tracing::warn!(task = name, "Background task did not stop in time");
        }
    }
    tracing::info!("Background services stopped");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Play through the default output device when one can be opened.
#[cfg(feature = "playback")]
fn with_output_device(scheduler: AudioScheduler) -> AudioScheduler {
    match andon_audio::RodioClock::open() {
        Ok(clock) => scheduler.with_clock(Arc::new(clock)),
        Err(e) => {
            tracing::warn!(error = %e, "No audio output, tones and speech clips will not be heard");
            scheduler
        }
    }
}

#[cfg(not(feature = "playback"))]
fn with_output_device(scheduler: AudioScheduler) -> AudioScheduler {
    tracing::warn!("Built without playback, tones and speech clips will not be heard");
    scheduler
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
