//! Session operations behind the HTTP and WebSocket routes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use demo_apps::Rendered;
use reactive::{App, Change, InputError, SessionError};
use shared::{
    domain::{InputId, SessionId},
    error::{ApiError, ErrorCode},
    protocol::{AppSummary, ClientRequest, OutputState, ServerEvent, SessionSnapshot},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::app_state::{AppState, SessionEntry, SESSION_EVENT_CAPACITY};

pub(crate) fn list_apps(state: &AppState) -> Vec<AppSummary> {
    state
        .apps
        .values()
        .map(|app| AppSummary {
            name: app.name().to_string(),
            title: app.title().to_string(),
        })
        .collect()
}

pub(crate) fn find_app<'a>(state: &'a AppState, name: &str) -> Result<&'a App<Rendered>, ApiError> {
    state
        .apps
        .get(name)
        .ok_or_else(|| ApiError::not_found(format!("app '{name}' not found")))
}

pub(crate) async fn create_session(
    state: &AppState,
    app_name: &str,
) -> Result<SessionSnapshot, ApiError> {
    let app = find_app(state, app_name)?;
    if state.sessions.read().await.len() >= state.limits.max_sessions {
        return Err(session_limit_reached(state));
    }

    // Rendering happens outside the registry lock.
    let (session, initial) = app.start_session().map_err(session_error)?;
    let session_id = SessionId::random();
    let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
    let entry = SessionEntry {
        app: app_name.to_string(),
        session,
        last_seen: Utc::now(),
        events,
    };
    let snapshot = snapshot_of(app, session_id, &entry);

    let mut sessions = state.sessions.write().await;
    if sessions.len() >= state.limits.max_sessions {
        return Err(session_limit_reached(state));
    }
    sessions.insert(session_id, Arc::new(Mutex::new(entry)));
    drop(sessions);

    info!(%session_id, app = app_name, outputs = initial.len(), "session started");
    Ok(snapshot)
}

pub(crate) async fn snapshot(state: &AppState, session_id: SessionId) -> Result<SessionSnapshot, ApiError> {
    let entry = session_entry(state, session_id).await?;
    let entry = entry.lock().await;
    let app = find_app(state, &entry.app)?;
    Ok(snapshot_of(app, session_id, &entry))
}

/// Applies one client request and returns the resulting events in order.
///
/// The same events are broadcast to every socket attached to the session.
pub(crate) async fn apply_request(
    state: &AppState,
    session_id: SessionId,
    request: ClientRequest,
) -> Result<Vec<ServerEvent>, ApiError> {
    let entry = session_entry(state, session_id).await?;
    let mut entry = entry.lock().await;

    let changes = match &request {
        ClientRequest::SetInput { input_id, value } => entry.session.set_input(input_id, value),
        ClientRequest::Trigger { input_id } => entry.session.trigger(input_id),
    }
    .map_err(session_error)?;
    entry.last_seen = Utc::now();

    let events: Vec<ServerEvent> = changes.into_iter().map(change_event).collect();
    debug!(%session_id, events = events.len(), "request applied");
    for event in &events {
        let _ = entry.events.send(event.clone());
    }
    Ok(events)
}

pub(crate) async fn set_input(
    state: &AppState,
    session_id: SessionId,
    input_id: InputId,
    value: serde_json::Value,
) -> Result<Vec<ServerEvent>, ApiError> {
    apply_request(state, session_id, ClientRequest::SetInput { input_id, value }).await
}

pub(crate) async fn trigger(
    state: &AppState,
    session_id: SessionId,
    input_id: InputId,
) -> Result<Vec<ServerEvent>, ApiError> {
    apply_request(state, session_id, ClientRequest::Trigger { input_id }).await
}

pub(crate) async fn session_events(
    state: &AppState,
    session_id: SessionId,
) -> Result<broadcast::Sender<ServerEvent>, ApiError> {
    let entry = session_entry(state, session_id).await?;
    let mut entry = entry.lock().await;
    entry.last_seen = Utc::now();
    Ok(entry.events.clone())
}

pub(crate) async fn close_session(state: &AppState, session_id: SessionId) -> Result<(), ApiError> {
    let entry = state
        .sessions
        .write()
        .await
        .remove(&session_id)
        .ok_or_else(|| session_not_found(session_id))?;
    let _ = entry
        .lock()
        .await
        .events
        .send(ServerEvent::SessionClosed { session_id });
    info!(%session_id, "session closed");
    Ok(())
}

/// Drops every session not touched since `now - idle_timeout`.
pub(crate) async fn reap_idle_sessions(state: &AppState, now: DateTime<Utc>) -> usize {
    let cutoff = now - state.limits.idle_timeout;
    let candidates: Vec<(SessionId, Arc<Mutex<SessionEntry>>)> = state
        .sessions
        .read()
        .await
        .iter()
        .map(|(id, entry)| (*id, Arc::clone(entry)))
        .collect();

    let mut idle = Vec::new();
    for (session_id, entry) in candidates {
        if entry.lock().await.last_seen < cutoff {
            idle.push(session_id);
        }
    }

    let mut removed = 0;
    for session_id in idle {
        if close_session(state, session_id).await.is_ok() {
            removed += 1;
        }
    }
    removed
}

async fn session_entry(
    state: &AppState,
    session_id: SessionId,
) -> Result<Arc<Mutex<SessionEntry>>, ApiError> {
    state
        .sessions
        .read()
        .await
        .get(&session_id)
        .cloned()
        .ok_or_else(|| session_not_found(session_id))
}

fn session_limit_reached(state: &AppState) -> ApiError {
    warn!(limit = state.limits.max_sessions, "session limit reached");
    ApiError::new(ErrorCode::Unavailable, "too many active sessions")
}

fn session_not_found(session_id: SessionId) -> ApiError {
    ApiError::not_found(format!("session {session_id} not found"))
}

fn snapshot_of(app: &App<Rendered>, session_id: SessionId, entry: &SessionEntry) -> SessionSnapshot {
    SessionSnapshot {
        session_id,
        app: entry.app.clone(),
        inputs: entry.session.inputs().clone(),
        outputs: app
            .view()
            .outputs()
            .map(|spec| (spec.id.clone(), output_state(entry.session.output(&spec.id))))
            .collect(),
    }
}

fn output_state(result: Option<&Result<Rendered, String>>) -> OutputState {
    match result {
        None => OutputState::Pending,
        Some(Ok(rendered)) => OutputState::Ready {
            payload: rendered.to_payload(),
        },
        Some(Err(message)) => OutputState::Failed {
            message: message.clone(),
        },
    }
}

fn change_event(change: Change<Rendered>) -> ServerEvent {
    match change {
        Change::Input { id, value } => ServerEvent::InputUpdated {
            input_id: id,
            value,
        },
        Change::Output { id, result } => ServerEvent::OutputUpdated {
            output_id: id,
            state: output_state(Some(&result)),
        },
    }
}

fn session_error(error: SessionError) -> ApiError {
    match error {
        SessionError::Input(InputError::UnknownInput(id)) => {
            ApiError::not_found(format!("unknown input '{id}'"))
        }
        SessionError::Input(error) => ApiError::validation(error.to_string()),
        other => {
            warn!(error = %other, "session error");
            ApiError::new(ErrorCode::Internal, other.to_string())
        }
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
