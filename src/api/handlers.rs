use axum::{
    extract::State,
    response::{Html, Redirect},
    Form, Json,
};

use super::server::AppState;
use super::types::{ConnectResponse, RefreshResponse, WaveRequest, WaveResponse};
use crate::error::WavePortalError;
use crate::session::WaveSession;
use crate::view::PortalView;

pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(state.view.read().await.render_html())
}

pub async fn state_handler(State(state): State<AppState>) -> Json<PortalView> {
    Json(state.view.read().await.clone())
}

pub async fn connect_handler(
    State(state): State<AppState>,
) -> Result<Json<ConnectResponse>, WavePortalError> {
    let mut session = state.session.lock().await;
    let account = session.connect().await?;
    reload_after_connect(&mut session).await;
    Ok(Json(ConnectResponse { account }))
}

pub async fn wave_handler(
    State(state): State<AppState>,
    Json(req): Json<WaveRequest>,
) -> Result<Json<WaveResponse>, WavePortalError> {
    let receipt = state.session.lock().await.submit_wave(&req.message).await?;
    Ok(Json(WaveResponse {
        tx_hash: receipt.tx_hash,
        total: receipt.total,
    }))
}

pub async fn refresh_handler(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, WavePortalError> {
    let mut session = state.session.lock().await;
    let loaded = session.load_waves().await?;
    Ok(Json(RefreshResponse {
        loaded,
        total: session.total_waves(),
    }))
}

/// HTML form submission; outcome is shown through the page notice
pub async fn wave_form_handler(
    State(state): State<AppState>,
    Form(req): Form<WaveRequest>,
) -> Redirect {
    if let Err(e) = state.session.lock().await.submit_wave(&req.message).await {
        log::warn!("Form wave failed: {}", e);
    }
    Redirect::to("/")
}

pub async fn connect_form_handler(State(state): State<AppState>) -> Redirect {
    let mut session = state.session.lock().await;
    match session.connect().await {
        Ok(_) => reload_after_connect(&mut session).await,
        Err(e) => log::warn!("Form connect failed: {}", e),
    }
    Redirect::to("/")
}

/// The page reloads its waves whenever the account changes
async fn reload_after_connect(session: &mut WaveSession) {
    if let Err(e) = session.load_waves().await {
        log::warn!("Reloading waves after connect failed: {}", e);
    }
}
