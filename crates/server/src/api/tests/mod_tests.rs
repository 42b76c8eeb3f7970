use super::*;
use crate::app_state::SessionLimits;
use chrono::Duration;
use demo_apps::{doubling, registry, scatter, HostInfo};
use serde_json::json;
use shared::domain::{InputValue, OutputId};

fn state(max_sessions: usize) -> AppState {
    AppState::new(
        registry(&HostInfo::new("alice")),
        SessionLimits {
            max_sessions,
            idle_timeout: Duration::minutes(5),
        },
    )
}

#[tokio::test]
async fn list_apps_is_sorted_by_name() {
    let state = state(4);
    let apps = list_apps(&state);
    assert_eq!(apps.len(), 2);
    assert_eq!(apps[0].name, doubling::APP_NAME);
    assert_eq!(apps[0].title, "Doubling Demo");
    assert_eq!(apps[1].name, scatter::APP_NAME);
}

#[tokio::test]
async fn new_scatter_session_has_both_outputs_ready() {
    let state = state(4);
    let snapshot = create_session(&state, scatter::APP_NAME).await.expect("session");

    assert_eq!(
        snapshot.inputs.get(&InputId::from(scatter::INPUT_N)),
        Some(&InputValue::Int(scatter::DEFAULT_POINTS))
    );
    for output in [scatter::OUTPUT_PLOT, scatter::OUTPUT_SUMMARY] {
        let state = snapshot.outputs.get(&OutputId::from(output)).expect("output");
        assert!(matches!(state, OutputState::Ready { .. }), "{output}: {state:?}");
    }
}

#[tokio::test]
async fn unknown_app_is_not_found() {
    let state = state(4);
    let error = create_session(&state, "missing").await.expect_err("no app");
    assert_eq!(error.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn session_limit_is_enforced() {
    let state = state(1);
    create_session(&state, doubling::APP_NAME).await.expect("first");
    let error = create_session(&state, doubling::APP_NAME)
        .await
        .expect_err("second");
    assert_eq!(error.code, ErrorCode::Unavailable);
}

#[tokio::test]
async fn applied_requests_are_broadcast_to_subscribers() {
    let state = state(4);
    let snapshot = create_session(&state, doubling::APP_NAME).await.expect("session");
    let mut rx = session_events(&state, snapshot.session_id)
        .await
        .expect("events")
        .subscribe();

    let events = set_input(&state, snapshot.session_id, "n".into(), json!(7))
        .await
        .expect("set");
    assert_eq!(events.len(), 1);

    match rx.recv().await.expect("broadcast") {
        ServerEvent::OutputUpdated { output_id, state } => {
            assert_eq!(output_id.as_str(), doubling::OUTPUT_TXT);
            assert_eq!(
                state,
                OutputState::Ready {
                    payload: shared::protocol::OutputPayload::Text {
                        text: "n*2 is going to be 14".to_string()
                    }
                }
            );
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn unchanged_value_produces_no_events() {
    let state = state(4);
    let snapshot = create_session(&state, doubling::APP_NAME).await.expect("session");
    let events = set_input(
        &state,
        snapshot.session_id,
        "n".into(),
        json!(doubling::DEFAULT_N),
    )
    .await
    .expect("set");
    assert!(events.is_empty());
}

#[tokio::test]
async fn reset_reports_input_changes_before_the_summary() {
    let state = state(4);
    let session_id = create_session(&state, scatter::APP_NAME)
        .await
        .expect("session")
        .session_id;
    set_input(&state, session_id, scatter::INPUT_N.into(), json!(80))
        .await
        .expect("n");
    set_input(&state, session_id, scatter::INPUT_COLOR.into(), json!("red"))
        .await
        .expect("color");

    let events = trigger(&state, session_id, scatter::ACTION_RESET.into())
        .await
        .expect("reset");

    let inputs: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::InputUpdated { input_id, .. } => Some(input_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(inputs, vec![scatter::INPUT_N, scatter::INPUT_COLOR]);
    assert!(matches!(
        events.last(),
        Some(ServerEvent::OutputUpdated { output_id, .. }) if output_id.as_str() == scatter::OUTPUT_SUMMARY
    ));
    assert!(!events.iter().any(|event| matches!(
        event,
        ServerEvent::OutputUpdated { output_id, .. } if output_id.as_str() == scatter::OUTPUT_PLOT
    )));
}

#[tokio::test]
async fn wrong_type_is_a_validation_error() {
    let state = state(4);
    let session_id = create_session(&state, scatter::APP_NAME)
        .await
        .expect("session")
        .session_id;
    let error = set_input(&state, session_id, scatter::INPUT_SHOW_LINE.into(), json!(3))
        .await
        .expect_err("type");
    assert_eq!(error.code, ErrorCode::Validation);
}

#[tokio::test]
async fn close_session_notifies_and_forgets() {
    let state = state(4);
    let session_id = create_session(&state, doubling::APP_NAME)
        .await
        .expect("session")
        .session_id;
    let mut rx = session_events(&state, session_id)
        .await
        .expect("events")
        .subscribe();

    close_session(&state, session_id).await.expect("close");
    assert!(matches!(
        rx.recv().await.expect("closed"),
        ServerEvent::SessionClosed { session_id: id } if id == session_id
    ));
    let error = snapshot(&state, session_id).await.expect_err("gone");
    assert_eq!(error.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn reaper_drops_only_idle_sessions() {
    let state = state(4);
    let stale = create_session(&state, doubling::APP_NAME)
        .await
        .expect("stale")
        .session_id;
    let fresh = create_session(&state, doubling::APP_NAME)
        .await
        .expect("fresh")
        .session_id;

    let later = Utc::now() + Duration::minutes(10);
    set_input(&state, fresh, "n".into(), json!(3)).await.expect("touch");
    state
        .sessions
        .read()
        .await
        .get(&fresh)
        .expect("fresh entry")
        .lock()
        .await
        .last_seen = later;

    assert_eq!(reap_idle_sessions(&state, later).await, 1);
    assert!(snapshot(&state, stale).await.is_err());
    assert!(snapshot(&state, fresh).await.is_ok());
}

#[tokio::test]
async fn concurrent_creates_respect_the_session_cap() {
    let state = state(3);
    let attempts = (0..8).map(|_| create_session(&state, doubling::APP_NAME));
    let results = futures::future::join_all(attempts).await;

    let created = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(created, 3);
    assert!(results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .all(|error| error.code == ErrorCode::Unavailable));
    assert_eq!(state.sessions.read().await.len(), 3);
}
