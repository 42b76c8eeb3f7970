use super::*;
use crate::view::{Layout, Node, OutputSpec};
use serde_json::json;

fn view() -> View {
    View {
        title: "test".into(),
        layout: Layout::Stack {
            children: vec![
                InputSpec::slider("a", "A", 0, 10, 1).into(),
                InputSpec::slider("b", "B", 0, 10, 2).into(),
                InputSpec::checkbox("use_b", "Use B", false).into(),
                InputSpec::action_button("go", "Go").into(),
                InputSpec::action_button("reset", "Reset").into(),
                OutputSpec::text("auto").into(),
                OutputSpec::text("gated").into(),
                OutputSpec::text("eager").into(),
            ],
        },
    }
}

fn table() -> ReactionTable<String> {
    ReactionTable::new()
        .effect("reset", Trigger::on(["reset"]), |_, updates| {
            updates.set("a", InputValue::Int(1));
            updates.set("b", InputValue::Int(2));
            Ok(())
        })
        .output("auto", Trigger::Auto, |inputs| {
            if inputs.flag("use_b")? {
                Ok(format!("b={}", inputs.int("b")?))
            } else {
                Ok(format!("a={}", inputs.int("a")?))
            }
        })
        .output("gated", Trigger::on(["go"]), |inputs| {
            Ok(format!("a+b={}", inputs.int("a")? + inputs.int("b")?))
        })
        .output("eager", Trigger::on(["go"]).ignore_none(false), |inputs| {
            Ok(format!("clicks={}", inputs.clicks("go")?))
        })
}

fn rendered(session: &Session<String>, id: &str) -> Option<String> {
    session
        .output(&OutputId::from(id))
        .map(|result| result.clone().expect("rendered"))
}

fn output_ids(changes: &[Change<String>]) -> Vec<&str> {
    changes
        .iter()
        .filter_map(|change| match change {
            Change::Output { id, .. } => Some(id.as_str()),
            Change::Input { .. } => None,
        })
        .collect()
}

#[test]
fn startup_runs_auto_and_eager_reactions_only() {
    let (session, changes) = Session::start(&view(), table()).expect("start");
    assert_eq!(output_ids(&changes), ["auto", "eager"]);
    assert_eq!(rendered(&session, "auto").as_deref(), Some("a=1"));
    assert_eq!(rendered(&session, "eager").as_deref(), Some("clicks=0"));
    assert!(session.output(&OutputId::from("gated")).is_none());
}

#[test]
fn auto_reaction_tracks_only_what_it_read() {
    let (mut session, _) = Session::start(&view(), table()).expect("start");

    let changes = session
        .set_input(&InputId::from("b"), &json!(7))
        .expect("set b");
    assert!(changes.is_empty(), "auto did not read b yet");

    let changes = session
        .set_input(&InputId::from("use_b"), &json!(true))
        .expect("set flag");
    assert_eq!(output_ids(&changes), ["auto"]);
    assert_eq!(rendered(&session, "auto").as_deref(), Some("b=7"));

    let deps = session
        .dependencies(&OutputId::from("auto"))
        .expect("deps");
    assert!(deps.contains(&InputId::from("b")));
    assert!(!deps.contains(&InputId::from("a")));
}

#[test]
fn event_reactions_wait_for_their_action() {
    let (mut session, _) = Session::start(&view(), table()).expect("start");

    let changes = session
        .set_input(&InputId::from("a"), &json!(4))
        .expect("set a");
    assert_eq!(output_ids(&changes), ["auto"]);
    assert!(session.output(&OutputId::from("gated")).is_none());

    let changes = session.trigger(&InputId::from("go")).expect("go");
    assert_eq!(output_ids(&changes), ["gated", "eager"]);
    assert_eq!(rendered(&session, "gated").as_deref(), Some("a+b=6"));
    assert_eq!(rendered(&session, "eager").as_deref(), Some("clicks=1"));
}

#[test]
fn effect_updates_cascade_to_auto_reactions_but_not_gated_ones() {
    let (mut session, _) = Session::start(&view(), table()).expect("start");
    session.trigger(&InputId::from("go")).expect("go");
    session
        .set_input(&InputId::from("a"), &json!(9))
        .expect("set a");

    let changes = session.trigger(&InputId::from("reset")).expect("reset");
    assert_eq!(
        changes,
        vec![
            Change::Input {
                id: InputId::from("a"),
                value: InputValue::Int(1),
            },
            Change::Output {
                id: OutputId::from("auto"),
                result: Ok("a=1".to_string()),
            },
        ]
    );
    assert_eq!(rendered(&session, "gated").as_deref(), Some("a+b=3"));
}

#[test]
fn unchanged_values_do_not_invalidate() {
    let (mut session, _) = Session::start(&view(), table()).expect("start");
    let changes = session
        .set_input(&InputId::from("a"), &json!("1"))
        .expect("same value");
    assert!(changes.is_empty());
}

#[test]
fn rejected_values_leave_state_untouched() {
    let (mut session, _) = Session::start(&view(), table()).expect("start");
    let err = session
        .set_input(&InputId::from("a"), &json!(11))
        .expect_err("out of range");
    assert!(matches!(
        err,
        SessionError::Input(InputError::OutOfRange { .. })
    ));
    assert_eq!(
        session.input(&InputId::from("a")),
        Some(&InputValue::Int(1))
    );

    assert!(matches!(
        session.trigger(&InputId::from("a")),
        Err(SessionError::Input(InputError::NotAnAction(_)))
    ));
    assert!(matches!(
        session.set_value(&InputId::from("go"), InputValue::Clicks(5)),
        Err(SessionError::Input(InputError::NotSettable(_)))
    ));
    assert!(matches!(
        session.set_input(&InputId::from("missing"), &json!(1)),
        Err(SessionError::Input(InputError::UnknownInput(_)))
    ));
}

#[test]
fn failures_are_stored_as_output_state() {
    let table = ReactionTable::new().output("auto", Trigger::Auto, |inputs| {
        let a = inputs.int("a")?;
        if a > 5 {
            return Err(ReactionError::failed("too big"));
        }
        Ok(a.to_string())
    });
    let (mut session, _) = Session::start(&view(), table).expect("start");
    session
        .set_input(&InputId::from("a"), &json!(6))
        .expect("set a");
    assert_eq!(
        session.output(&OutputId::from("auto")),
        Some(&Err("too big".to_string()))
    );
}

#[test]
fn self_invalidating_effect_hits_the_round_limit() {
    let table: ReactionTable<String> =
        ReactionTable::new().effect("flip", Trigger::Auto, |inputs, updates| {
            updates.set("use_b", InputValue::Bool(!inputs.flag("use_b")?));
            Ok(())
        });
    let err = Session::start(&view(), table)
        .err()
        .expect("should not settle");
    assert!(matches!(err, SessionError::FlushLimit(MAX_FLUSH_ROUNDS)));
}

#[test]
fn start_rejects_reactions_for_unknown_ids() {
    let table: ReactionTable<String> =
        ReactionTable::new().output("nope", Trigger::Auto, |_| Ok(String::new()));
    assert!(matches!(
        Session::start(&view(), table),
        Err(SessionError::UnknownOutput { .. })
    ));

    let table: ReactionTable<String> =
        ReactionTable::new().output("auto", Trigger::on(["ghost"]), |_| Ok(String::new()));
    assert!(matches!(
        Session::start(&view(), table),
        Err(SessionError::UnknownEventInput { .. })
    ));
}

#[test]
fn duplicate_ids_fail_view_validation() {
    let view = View {
        title: "dup".into(),
        layout: Layout::Stack {
            children: vec![
                InputSpec::slider("x", "X", 0, 1, 0).into(),
                Node::card("card", vec![OutputSpec::text("x").into()]),
            ],
        },
    };
    assert!(matches!(
        Session::start(&view, ReactionTable::<String>::new()),
        Err(SessionError::View(ViewError::DuplicateId(_)))
    ));
}
