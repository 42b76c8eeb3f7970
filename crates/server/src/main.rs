use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use demo_apps::{registry, HostInfo};
use shared::{
    domain::{InputId, SessionId},
    error::{ApiError, ErrorCode},
    protocol::{AppSummary, ClientRequest, ServerEvent, SessionSnapshot, SetInputRequest},
};
use tokio::sync::{broadcast, mpsc};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;
mod html;

use app_state::{AppState, SessionLimits};
use config::load_settings;

const REAP_INTERVAL: Duration = Duration::from_secs(60);
const REPLY_CAPACITY: usize = 16;

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The log filter comes from settings; report loading problems unfiltered.
    let settings =
        tracing::subscriber::with_default(tracing_subscriber::fmt().finish(), load_settings);
    let limits = SessionLimits::try_from(&settings)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .init();

    let host = HostInfo::detect();
    let state = Arc::new(AppState::new(registry(&host), limits));
    tokio::spawn(reap_idle_sessions(Arc::clone(&state)));

    let app = build_router(state, settings.max_body_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(index))
        .route("/apps", get(http_list_apps))
        .route("/apps/:app", get(app_page))
        .route("/apps/:app/sessions", post(http_create_session))
        .route(
            "/sessions/:session_id",
            get(http_snapshot).delete(http_close_session),
        )
        .route("/sessions/:session_id/inputs", post(http_set_input))
        .route(
            "/sessions/:session_id/actions/:input_id",
            post(http_trigger),
        )
        .route("/sessions/:session_id/ws", get(ws_handler))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}

async fn reap_idle_sessions(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(REAP_INTERVAL);
    loop {
        ticker.tick().await;
        let removed = api::reap_idle_sessions(&state, Utc::now()).await;
        if removed > 0 {
            info!(removed, "reaped idle sessions");
        }
    }
}

fn reject(error: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match error.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(html::render_index(&api::list_apps(&state)))
}

async fn http_list_apps(State(state): State<Arc<AppState>>) -> Json<Vec<AppSummary>> {
    Json(api::list_apps(&state))
}

async fn app_page(
    State(state): State<Arc<AppState>>,
    Path(app): Path<String>,
) -> ApiResult<Html<String>> {
    let snapshot = api::create_session(&state, &app).await.map_err(reject)?;
    let view = api::find_app(&state, &app).map_err(reject)?.view();
    Ok(Html(html::render_page(view, &snapshot)))
}

async fn http_create_session(
    State(state): State<Arc<AppState>>,
    Path(app): Path<String>,
) -> ApiResult<(StatusCode, Json<SessionSnapshot>)> {
    let snapshot = api::create_session(&state, &app).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn http_snapshot(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> ApiResult<Json<SessionSnapshot>> {
    let snapshot = api::snapshot(&state, session_id).await.map_err(reject)?;
    Ok(Json(snapshot))
}

async fn http_close_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> ApiResult<StatusCode> {
    api::close_session(&state, session_id)
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn http_set_input(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<SetInputRequest>,
) -> ApiResult<Json<Vec<ServerEvent>>> {
    let events = api::set_input(&state, session_id, req.input_id, req.value)
        .await
        .map_err(reject)?;
    Ok(Json(events))
}

async fn http_trigger(
    State(state): State<Arc<AppState>>,
    Path((session_id, input_id)): Path<(SessionId, String)>,
) -> ApiResult<Json<Vec<ServerEvent>>> {
    let events = api::trigger(&state, session_id, InputId::new(input_id))
        .await
        .map_err(reject)?;
    Ok(Json(events))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> ApiResult<impl IntoResponse> {
    let events = api::session_events(&state, session_id)
        .await
        .map_err(reject)?;
    Ok(ws.on_upgrade(move |socket| ws_connection(state, socket, session_id, events)))
}

async fn ws_connection(
    state: Arc<AppState>,
    socket: axum::extract::ws::WebSocket,
    session_id: SessionId,
    events: broadcast::Sender<ServerEvent>,
) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = events.subscribe();
    // Errors go back to the socket that caused them, not the whole session.
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerEvent>(REPLY_CAPACITY);

    let send_task = tokio::spawn(async move {
        while let Some(event) = next_outgoing(session_id, &mut events_rx, &mut reply_rx).await {
            let closed = matches!(event, ServerEvent::SessionClosed { .. });
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() || closed {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        if let Some(reply) = handle_client_message(&state, session_id, &text).await {
            if reply_tx.send(reply).await.is_err() {
                break;
            }
        }
    }

    send_task.abort();
}

/// Next event for one socket. A lagging receiver skips what it missed and
/// keeps going; `None` once the session's sender is gone.
async fn next_outgoing(
    session_id: SessionId,
    events_rx: &mut broadcast::Receiver<ServerEvent>,
    replies: &mut mpsc::Receiver<ServerEvent>,
) -> Option<ServerEvent> {
    loop {
        tokio::select! {
            received = events_rx.recv() => match received {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(%session_id, skipped, "socket fell behind session events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            },
            Some(reply) = replies.recv() => return Some(reply),
        }
    }
}

/// Applies one socket message. Successful requests reach every socket
/// through the session broadcast; a rejection is returned for the sender only.
async fn handle_client_message(
    state: &AppState,
    session_id: SessionId,
    text: &str,
) -> Option<ServerEvent> {
    let outcome = match serde_json::from_str::<ClientRequest>(text) {
        Ok(request) => api::apply_request(state, session_id, request)
            .await
            .map(|_| ()),
        Err(error) => Err(ApiError::validation(format!("malformed request: {error}"))),
    };
    match outcome {
        Ok(()) => None,
        Err(error) => {
            warn!(%session_id, message = %error.message, "client request rejected");
            Some(ServerEvent::Error(error))
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
