use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::handlers;
use crate::config::PortalConfig;
use crate::session::{SessionEvent, WaveSession};
use crate::view::PortalView;
use crate::Result;

/// Shared state behind every handler
///
/// The session is locked for the duration of an operation. The view is
/// maintained from session events by a background reducer so page reads
/// stay responsive while a submission waits for confirmation.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<WaveSession>>,
    pub view: Arc<RwLock<PortalView>>,
}

impl AppState {
    /// Wrap a session and start its view reducer (requires a tokio runtime)
    pub fn new(mut session: WaveSession) -> Self {
        let events = session.observe();
        let view = Arc::new(RwLock::new(PortalView::from_session(&session)));
        tokio::spawn(reduce_view(events, view.clone()));

        Self {
            session: Arc::new(Mutex::new(session)),
            view,
        }
    }
}

async fn reduce_view(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    view: Arc<RwLock<PortalView>>,
) {
    while let Some(event) = events.recv().await {
        view.write().await.apply(&event);
    }
}

/// Background task feeding live `NewWave` notifications into the session
pub struct LiveUpdates {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl LiveUpdates {
    /// Stop the pump and uninstall its filter
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            log::warn!("Live update task ended abnormally: {}", e);
        }
    }
}

pub async fn spawn_live_updates(state: AppState) -> Result<LiveUpdates> {
    let mut subscription = state.session.lock().await.subscribe_new_waves().await?;
    let (stop, mut stopped) = oneshot::channel();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                wave = subscription.next() => match wave {
                    Some(wave) => state.session.lock().await.record_new_wave(wave),
                    None => break,
                },
                _ = &mut stopped => break,
            }
        }
        if let Err(e) = subscription.close().await {
            log::warn!("Failed to uninstall NewWave filter: {}", e);
        }
    });

    Ok(LiveUpdates { stop, task })
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::index_handler))
        .route("/wave", post(handlers::wave_form_handler))
        .route("/connect", post(handlers::connect_form_handler))
        .route("/api/state", get(handlers::state_handler))
        .route("/api/connect", post(handlers::connect_handler))
        .route("/api/wave", post(handlers::wave_handler))
        .route("/api/refresh", post(handlers::refresh_handler))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        log::warn!("CORS: Allowing all origins (development mode). Set ALLOWED_ORIGINS env var for production.");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        log::info!("CORS configured for {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub async fn start_server(config: PortalConfig) -> anyhow::Result<()> {
    let mut session = WaveSession::from_config(&config);
    session.initialize().await;

    let state = AppState::new(session);
    let live = match spawn_live_updates(state.clone()).await {
        Ok(live) => Some(live),
        Err(e) => {
            log::warn!("Live wave updates disabled: {}", e);
            None
        }
    };

    let app = router(state, &config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    log::info!("Server listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(live) = live {
        live.stop().await;
    }
    Ok(())
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Failed to install Ctrl+C handler: {}", e);
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
                log::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            log::info!("Received SIGTERM signal");
        },
    }

    log::info!("Shutdown signal received, exiting gracefully...");
}
