use super::*;
use serde_json::json;

fn slider() -> InputSpec {
    InputSpec::slider("n", "Number of points", 10, 100, 50)
}

#[test]
fn defaults_follow_control_kind() {
    assert_eq!(slider().default_value(), InputValue::Int(50));
    assert_eq!(
        InputSpec::select("c", "Color", ["blue", "red"], "blue").default_value(),
        InputValue::Text("blue".into())
    );
    assert_eq!(
        InputSpec::checkbox("b", "Flag", true).default_value(),
        InputValue::Bool(true)
    );
    assert_eq!(
        InputSpec::action_button("go", "Go").default_value(),
        InputValue::Clicks(0)
    );
}

#[test]
fn slider_accepts_numbers_and_numeric_strings_in_range() {
    assert_eq!(slider().coerce(&json!(10)), Ok(InputValue::Int(10)));
    assert_eq!(slider().coerce(&json!("75")), Ok(InputValue::Int(75)));
    assert_eq!(slider().coerce(&json!(100.0)), Ok(InputValue::Int(100)));
}

#[test]
fn slider_rejects_values_outside_its_domain() {
    let err = slider().coerce(&json!(9)).expect_err("below min");
    assert!(matches!(err, InputError::OutOfRange { value: 9, min: 10, .. }));
    assert!(matches!(
        slider().coerce(&json!(2.5)),
        Err(InputError::TypeMismatch { .. })
    ));
    assert!(matches!(
        slider().coerce(&json!("many")),
        Err(InputError::TypeMismatch { .. })
    ));
}

#[test]
fn select_only_accepts_listed_choices() {
    let spec = InputSpec::select("c", "Color", ["blue", "red"], "blue");
    assert_eq!(spec.coerce(&json!("red")), Ok(InputValue::Text("red".into())));
    assert!(matches!(
        spec.coerce(&json!("teal")),
        Err(InputError::UnknownChoice { .. })
    ));
}

#[test]
fn checkbox_accepts_booleans_and_form_strings() {
    let spec = InputSpec::checkbox("b", "Flag", true);
    assert_eq!(spec.coerce(&json!(false)), Ok(InputValue::Bool(false)));
    assert_eq!(spec.coerce(&json!("TRUE")), Ok(InputValue::Bool(true)));
    assert!(spec.coerce(&json!(1)).is_err());
}

#[test]
fn actions_cannot_be_set() {
    let spec = InputSpec::action_button("go", "Go");
    assert_eq!(
        spec.coerce(&json!(3)),
        Err(InputError::NotSettable(InputId::from("go")))
    );
}
