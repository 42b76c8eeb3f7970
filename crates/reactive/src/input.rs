use serde_json::Value;
use shared::domain::{InputId, InputValue};
use thiserror::Error;

use crate::view::{InputKind, InputSpec};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown input '{0}'")]
    UnknownInput(InputId),
    #[error("input '{id}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        id: InputId,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("input '{id}' does not offer the choice '{value}'")]
    UnknownChoice { id: InputId, value: String },
    #[error("input '{id}' expects {expected}, got {found}")]
    TypeMismatch {
        id: InputId,
        expected: &'static str,
        found: String,
    },
    #[error("input '{0}' is an action and can only be triggered")]
    NotSettable(InputId),
    #[error("input '{0}' is not an action")]
    NotAnAction(InputId),
}

impl InputSpec {
    pub fn default_value(&self) -> InputValue {
        match &self.kind {
            InputKind::Slider { value, .. } => InputValue::Int(*value),
            InputKind::Select { selected, .. } => InputValue::Text(selected.clone()),
            InputKind::Checkbox { value } => InputValue::Bool(*value),
            InputKind::Text { value } => InputValue::Text(value.clone()),
            InputKind::ActionButton => InputValue::Clicks(0),
        }
    }

    /// Checks a typed value against this control's domain.
    pub fn check(&self, value: &InputValue) -> Result<(), InputError> {
        match (&self.kind, value) {
            (InputKind::Slider { min, max, .. }, InputValue::Int(v)) => {
                if v < min || v > max {
                    return Err(InputError::OutOfRange {
                        id: self.id.clone(),
                        value: *v,
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
            (InputKind::Select { choices, .. }, InputValue::Text(v)) => {
                if !choices.iter().any(|choice| choice == v) {
                    return Err(InputError::UnknownChoice {
                        id: self.id.clone(),
                        value: v.clone(),
                    });
                }
                Ok(())
            }
            (InputKind::Checkbox { .. }, InputValue::Bool(_))
            | (InputKind::Text { .. }, InputValue::Text(_))
            | (InputKind::ActionButton, InputValue::Clicks(_)) => Ok(()),
            (_, other) => Err(self.mismatch(other.type_name())),
        }
    }

    /// Converts a raw JSON value sent by a browser or API client.
    ///
    /// Form elements report everything as strings, so sliders accept numeric
    /// strings and checkboxes accept `"true"`/`"false"`.
    pub fn coerce(&self, raw: &Value) -> Result<InputValue, InputError> {
        let value = match &self.kind {
            InputKind::Slider { .. } => InputValue::Int(self.coerce_int(raw)?),
            InputKind::Select { .. } | InputKind::Text { .. } => match raw {
                Value::String(s) => InputValue::Text(s.clone()),
                other => return Err(self.mismatch(json_type(other))),
            },
            InputKind::Checkbox { .. } => match raw {
                Value::Bool(b) => InputValue::Bool(*b),
                Value::String(s) if s.eq_ignore_ascii_case("true") => InputValue::Bool(true),
                Value::String(s) if s.eq_ignore_ascii_case("false") => InputValue::Bool(false),
                other => return Err(self.mismatch(json_type(other))),
            },
            InputKind::ActionButton => return Err(InputError::NotSettable(self.id.clone())),
        };
        self.check(&value)?;
        Ok(value)
    }

    fn coerce_int(&self, raw: &Value) -> Result<i64, InputError> {
        match raw {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| self.mismatch("non-integer number")),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.mismatch("non-numeric string")),
            other => Err(self.mismatch(json_type(other))),
        }
    }

    fn expected(&self) -> &'static str {
        match self.kind {
            InputKind::Slider { .. } => "an integer",
            InputKind::Select { .. } | InputKind::Text { .. } => "a string",
            InputKind::Checkbox { .. } => "a boolean",
            InputKind::ActionButton => "a click count",
        }
    }

    fn mismatch(&self, found: &str) -> InputError {
        InputError::TypeMismatch {
            id: self.id.clone(),
            expected: self.expected(),
            found: found.to_string(),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "tests/input_tests.rs"]
mod tests;
