use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use shared::domain::{InputId, OutputId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub id: InputId,
    pub label: String,
    pub kind: InputKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum InputKind {
    Slider { min: i64, max: i64, value: i64 },
    Select { choices: Vec<String>, selected: String },
    Checkbox { value: bool },
    Text { value: String },
    ActionButton,
}

impl InputSpec {
    pub fn slider(id: &str, label: &str, min: i64, max: i64, value: i64) -> Self {
        Self::with_kind(id, label, InputKind::Slider { min, max, value })
    }

    pub fn select<I, S>(id: &str, label: &str, choices: I, selected: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_kind(
            id,
            label,
            InputKind::Select {
                choices: choices.into_iter().map(Into::into).collect(),
                selected: selected.to_string(),
            },
        )
    }

    pub fn checkbox(id: &str, label: &str, value: bool) -> Self {
        Self::with_kind(id, label, InputKind::Checkbox { value })
    }

    pub fn text(id: &str, label: &str, value: &str) -> Self {
        Self::with_kind(
            id,
            label,
            InputKind::Text {
                value: value.to_string(),
            },
        )
    }

    pub fn action_button(id: &str, label: &str) -> Self {
        Self::with_kind(id, label, InputKind::ActionButton)
    }

    fn with_kind(id: &str, label: &str, kind: InputKind) -> Self {
        Self {
            id: InputId::from(id),
            label: label.to_string(),
            kind,
        }
    }

    pub fn is_action(&self) -> bool {
        matches!(self.kind, InputKind::ActionButton)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Plot,
    Text,
    /// Monospaced, whitespace-preserving text.
    Verbatim,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub id: OutputId,
    pub kind: OutputKind,
}

impl OutputSpec {
    pub fn plot(id: &str) -> Self {
        Self {
            id: OutputId::from(id),
            kind: OutputKind::Plot,
        }
    }

    pub fn text(id: &str) -> Self {
        Self {
            id: OutputId::from(id),
            kind: OutputKind::Text,
        }
    }

    pub fn verbatim(id: &str) -> Self {
        Self {
            id: OutputId::from(id),
            kind: OutputKind::Verbatim,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Heading { text: String },
    Control { input: InputSpec },
    Rule,
    Output { output: OutputSpec },
    Card {
        header: Option<String>,
        children: Vec<Node>,
    },
    StaticText { text: String },
}

impl Node {
    pub fn heading(text: &str) -> Self {
        Self::Heading {
            text: text.to_string(),
        }
    }

    pub fn static_text(text: impl Into<String>) -> Self {
        Self::StaticText { text: text.into() }
    }

    pub fn card(header: &str, children: Vec<Node>) -> Self {
        Self::Card {
            header: Some(header.to_string()),
            children,
        }
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        if let Self::Card { children, .. } = self {
            for child in children {
                child.walk(visit);
            }
        }
    }
}

impl From<InputSpec> for Node {
    fn from(input: InputSpec) -> Self {
        Self::Control { input }
    }
}

impl From<OutputSpec> for Node {
    fn from(output: OutputSpec) -> Self {
        Self::Output { output }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Layout {
    Sidebar { sidebar: Vec<Node>, main: Vec<Node> },
    Stack { children: Vec<Node> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub title: String,
    pub layout: Layout,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("id '{0}' is declared more than once")]
    DuplicateId(String),
    #[error("input '{id}' has an invalid default: {reason}")]
    InvalidDefault { id: InputId, reason: String },
}

impl View {
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        let mut nodes = Vec::new();
        let roots: Vec<&Node> = match &self.layout {
            Layout::Sidebar { sidebar, main } => sidebar.iter().chain(main.iter()).collect(),
            Layout::Stack { children } => children.iter().collect(),
        };
        for root in roots {
            root.walk(&mut |node| nodes.push(node));
        }
        nodes.into_iter()
    }

    /// Every control in document order.
    pub fn inputs(&self) -> impl Iterator<Item = &InputSpec> {
        self.nodes().filter_map(|node| match node {
            Node::Control { input } => Some(input),
            _ => None,
        })
    }

    pub fn outputs(&self) -> impl Iterator<Item = &OutputSpec> {
        self.nodes().filter_map(|node| match node {
            Node::Output { output } => Some(output),
            _ => None,
        })
    }

    pub fn input(&self, id: &InputId) -> Option<&InputSpec> {
        self.inputs().find(|spec| &spec.id == id)
    }

    pub fn output(&self, id: &OutputId) -> Option<&OutputSpec> {
        self.outputs().find(|spec| &spec.id == id)
    }

    pub fn validate(&self) -> Result<(), ViewError> {
        let mut seen = BTreeSet::new();
        for spec in self.inputs() {
            if !seen.insert(spec.id.as_str()) {
                return Err(ViewError::DuplicateId(spec.id.to_string()));
            }
            spec.check(&spec.default_value())
                .map_err(|error| ViewError::InvalidDefault {
                    id: spec.id.clone(),
                    reason: error.to_string(),
                })?;
        }
        for spec in self.outputs() {
            if !seen.insert(spec.id.as_str()) {
                return Err(ViewError::DuplicateId(spec.id.to_string()));
            }
        }
        Ok(())
    }
}
