use super::*;
use reactive::Session;
use shared::domain::{InputId, InputValue, OutputId};

fn host() -> HostInfo {
    HostInfo::new("alice")
}

fn text_of(session: &Session<Rendered>) -> String {
    session
        .output(&OutputId::from(OUTPUT_TXT))
        .expect("rendered")
        .clone()
        .expect("ok")
        .as_text()
        .expect("text")
        .to_string()
}

#[test]
fn startup_renders_default() {
    let (session, _) = app(&host()).start_session().expect("session");
    assert_eq!(text_of(&session), "n*2 is going to be 40");
}

#[test]
fn output_doubles_every_slider_value() {
    let (mut session, _) = app(&host()).start_session().expect("session");
    for n in MIN_N..=MAX_N {
        session
            .set_value(&InputId::from(INPUT_N), InputValue::Int(n))
            .expect("set n");
        assert_eq!(text_of(&session), format!("n*2 is going to be {}", 2 * n));
    }
}

#[test]
fn zero_is_a_valid_trivial_input() {
    assert_eq!(doubled_text(0), "n*2 is going to be 0");
}

#[test]
fn banner_is_static_view_content() {
    let view = view(&host());
    let banner_text = view
        .nodes()
        .find_map(|node| match node {
            Node::StaticText { text } => Some(text.clone()),
            _ => None,
        })
        .expect("banner");
    assert_eq!(banner_text, "Running as user: alice");
    assert_eq!(view.outputs().count(), 1);
}

#[test]
fn host_lookup_prefers_login_variables_in_order() {
    let host = HostInfo::from_lookup(
        |key| match key {
            "USER" => Some("bob".to_string()),
            "USERNAME" => Some("carol".to_string()),
            _ => None,
        },
        || panic!("account database consulted while a login variable is set"),
    );
    assert_eq!(host.username, "bob");
}

#[test]
fn host_lookup_falls_back_to_process_account() {
    let host = HostInfo::from_lookup(|_| None, || Some("daemon".to_string()));
    assert_eq!(host.username, "daemon");

    let host = HostInfo::from_lookup(
        |key| (key == "LOGNAME").then(|| "  ".to_string()),
        || Some("svc".to_string()),
    );
    assert_eq!(host.username, "svc");
}

#[test]
fn host_lookup_reports_unknown_when_nothing_resolves() {
    let host = HostInfo::from_lookup(|_| None, || None);
    assert_eq!(host.username, "unknown");
}
