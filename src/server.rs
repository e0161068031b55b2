use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::dispatch::{Dispatcher, MessageDispatcher};
use crate::locale::Direction;
use crate::session::{ChatMessage, ChatSession, SendError, SessionStore};
use crate::ui::{fallback_bubble, html_shell, message_bubble, typing_indicator};

/// How often idle sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    info!(
        name: "webhook.config.loaded",
        url = %config.webhook.url,
        timeout_secs = config.webhook.timeout_secs,
        "Webhook configuration loaded"
    );

    let dispatcher: Arc<dyn MessageDispatcher> = Arc::new(Dispatcher::new(
        config.webhook.url.clone(),
        config.webhook.timeout(),
    ));
    let sessions = SessionStore::new();
    spawn_session_sweeper(sessions.clone(), config.server.session_idle_timeout());

    let state = AppState::new(config.widget_config(), sessions, dispatcher);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Build the router for the page and the widget API.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(|| async { "ok" }))
        .route("/api/widget/config", get(api_widget_config))
        .route("/api/sessions", post(api_create_session))
        .route(
            "/api/sessions/{id}",
            get(api_get_session).delete(api_delete_session),
        )
        .route(
            "/api/sessions/{id}/messages",
            get(api_get_messages).post(api_send_message),
        )
        .route(
            "/api/sessions/{id}/messages/{message_id}/html",
            get(api_message_html),
        )
        .route("/api/sessions/{id}/direction", post(api_set_direction))
        .nest_service("/static", ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn spawn_session_sweeper(sessions: SessionStore, idle: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let removed = sessions.cleanup_expired_with_timeout(idle);
            if removed > 0 {
                tracing::debug!(removed, remaining = sessions.len(), "Dropped idle sessions");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(name: "server.stopping", "Shutdown signal received");
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors returned by the widget API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("session not found")]
    SessionNotFound,
    #[error("message not found")]
    MessageNotFound,
    #[error(transparent)]
    Send(#[from] SendError),
    #[error("direction toggle is disabled")]
    ToggleDisabled,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::SessionNotFound | Self::MessageNotFound => StatusCode::NOT_FOUND,
            Self::Send(SendError::Empty) => StatusCode::BAD_REQUEST,
            Self::Send(SendError::Busy) => StatusCode::CONFLICT,
            Self::ToggleDisabled => StatusCode::FORBIDDEN,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Query parameters selecting the page direction.
#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    dir: Option<String>,
}

/// GET / - Landing page with the widget mounted.
async fn index_handler(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Html<String> {
    let direction = Direction::detect(query.dir.as_deref(), query.lang.as_deref());
    Html(html_shell(&state.widget, direction))
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for mounting a widget.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MountRequest {
    /// Document language tag, e.g. `ar` or `en-US`.
    #[serde(default)]
    lang: Option<String>,
    /// Document direction attribute.
    #[serde(default)]
    dir: Option<String>,
    /// Explicit direction; wins over `lang` and `dir`.
    #[serde(default, rename = "isRTL")]
    is_rtl: Option<bool>,
}

/// Session snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    session_id: String,
    #[serde(rename = "isRTL")]
    is_rtl: bool,
    sending: bool,
    messages: Vec<ChatMessage>,
    /// Bubble fragments, one per message.
    html: Vec<String>,
    typing_html: String,
    /// Shown by the page when a send cannot be completed.
    fallback_html: String,
}

impl SessionView {
    fn new(session: &ChatSession) -> Self {
        let direction = session.direction();
        let messages = session.messages();
        let html = messages
            .iter()
            .map(|m| message_bubble(m, direction))
            .collect();
        Self {
            session_id: session.id().to_string(),
            is_rtl: direction.is_rtl(),
            sending: session.is_sending(),
            messages,
            html,
            typing_html: typing_indicator(direction),
            fallback_html: fallback_bubble(direction),
        }
    }
}

/// Request body for sending a message.
#[derive(Debug, Deserialize)]
struct SendRequest {
    message: String,
}

/// Response to a send.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
    user_message: ChatMessage,
    reply: ChatMessage,
    user_html: String,
    reply_html: String,
}

/// Request body for changing direction. Without `isRTL` the direction is
/// toggled.
#[derive(Debug, Default, Deserialize)]
struct DirectionRequest {
    #[serde(default, rename = "isRTL")]
    is_rtl: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DirectionResponse {
    #[serde(rename = "isRTL")]
    is_rtl: bool,
    placeholder: String,
    typing_html: String,
    fallback_html: String,
}

fn session(state: &AppState, id: &str) -> Result<ChatSession, ApiError> {
    state.sessions.get(id).ok_or(ApiError::SessionNotFound)
}

/// GET /api/widget/config - Widget configuration.
async fn api_widget_config(State(state): State<AppState>) -> Json<crate::ui::WidgetConfig> {
    Json(state.widget.as_ref().clone())
}

/// POST /api/sessions - Mount a widget.
async fn api_create_session(
    State(state): State<AppState>,
    Json(req): Json<MountRequest>,
) -> (StatusCode, Json<SessionView>) {
    let direction = req.is_rtl.map_or_else(
        || Direction::detect(req.dir.as_deref(), req.lang.as_deref()),
        Direction::from_rtl,
    );
    let session = state.sessions.create(direction, &state.widget.welcome_message);

    info!(
        name: "session.created",
        session_id = %session.id(),
        is_rtl = direction.is_rtl(),
        "Widget session created"
    );

    (StatusCode::CREATED, Json(SessionView::new(&session)))
}

/// GET /api/sessions/{id} - Session snapshot.
async fn api_get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    let session = session(&state, &id)?;
    Ok(Json(SessionView::new(&session)))
}

/// DELETE /api/sessions/{id} - Unmount a widget.
async fn api_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .remove(&id)
        .ok_or(ApiError::SessionNotFound)?;
    tracing::debug!(session_id = %id, "Widget session removed");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/sessions/{id}/messages - Session messages.
async fn api_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(session(&state, &id)?.messages()))
}

/// POST /api/sessions/{id}/messages - Send a message and wait for the reply.
async fn api_send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let session = session(&state, &id)?;
    tracing::info!(
        session_id = %id,
        message_length = req.message.len(),
        "Received chat message"
    );

    let exchange = session
        .send(
            &req.message,
            Arc::clone(&state.dispatcher),
            &state.widget.brand_name,
        )
        .await?;

    Ok(Json(SendResponse {
        user_html: message_bubble(&exchange.user, exchange.direction),
        reply_html: message_bubble(&exchange.reply, exchange.direction),
        user_message: exchange.user,
        reply: exchange.reply,
    }))
}

/// GET /api/sessions/{id}/messages/{message_id}/html - Bubble fragment.
async fn api_message_html(
    State(state): State<AppState>,
    Path((id, message_id)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let session = session(&state, &id)?;
    let message = session
        .message(&message_id)
        .ok_or(ApiError::MessageNotFound)?;
    Ok(Html(message_bubble(&message, session.direction())))
}

/// POST /api/sessions/{id}/direction - Set or toggle direction.
async fn api_set_direction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DirectionRequest>,
) -> Result<Json<DirectionResponse>, ApiError> {
    if !state.widget.enable_rtl_toggle {
        return Err(ApiError::ToggleDisabled);
    }
    let session = session(&state, &id)?;
    let direction = match req.is_rtl {
        Some(is_rtl) => {
            let direction = Direction::from_rtl(is_rtl);
            session.set_direction(direction);
            direction
        }
        None => session.toggle_direction(),
    };
    tracing::debug!(session_id = %id, is_rtl = direction.is_rtl(), "Direction changed");

    Ok(Json(DirectionResponse {
        is_rtl: direction.is_rtl(),
        placeholder: state.widget.placeholder_for(direction).to_string(),
        typing_html: typing_indicator(direction),
        fallback_html: fallback_bubble(direction),
    }))
}
