//! Per-session reaction engine.
//!
//! A [`Session`] owns one copy of every input value and the last rendered
//! value of every output. Changing an input (or pressing an action) marks the
//! reactions that depend on it as pending; pending reactions then run to
//! completion, in registration order, before the call returns. Effects may
//! write inputs, which schedules another round.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde_json::Value;
use shared::domain::{InputId, InputValue, OutputId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    input::InputError,
    view::{InputSpec, View, ViewError},
};

/// Rounds of effect-driven re-evaluation allowed before a flush gives up.
pub const MAX_FLUSH_ROUNDS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Re-run whenever an input read during the last run changes.
    Auto,
    /// Re-run only when one of `inputs` fires. Reads inside the body are not
    /// tracked.
    Event {
        inputs: Vec<InputId>,
        ignore_none: bool,
    },
}

impl Trigger {
    pub fn on<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<InputId>,
    {
        Self::Event {
            inputs: inputs.into_iter().map(Into::into).collect(),
            ignore_none: true,
        }
    }

    /// With `false`, the reaction also runs at session start before any
    /// event has fired.
    pub fn ignore_none(self, ignore: bool) -> Self {
        match self {
            Self::Event { inputs, .. } => Self::Event {
                inputs,
                ignore_none: ignore,
            },
            auto => auto,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReactionError {
    #[error("reaction read unknown input '{0}'")]
    MissingInput(InputId),
    #[error("input '{id}' holds {found}, expected {expected}")]
    WrongType {
        id: InputId,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{0}")]
    Failed(String),
}

impl ReactionError {
    pub fn failed(error: impl fmt::Display) -> Self {
        Self::Failed(error.to_string())
    }
}

/// Read access to the session's inputs from inside a reaction body.
pub struct Inputs<'a> {
    values: &'a BTreeMap<InputId, InputValue>,
    reads: Option<RefCell<BTreeSet<InputId>>>,
}

impl<'a> Inputs<'a> {
    fn new(values: &'a BTreeMap<InputId, InputValue>, tracking: bool) -> Self {
        Self {
            values,
            reads: tracking.then(RefCell::default),
        }
    }

    pub fn value(&self, id: &str) -> Result<&'a InputValue, ReactionError> {
        let id = InputId::from(id);
        let value = self
            .values
            .get(&id)
            .ok_or_else(|| ReactionError::MissingInput(id.clone()))?;
        if let Some(reads) = &self.reads {
            reads.borrow_mut().insert(id);
        }
        Ok(value)
    }

    pub fn int(&self, id: &str) -> Result<i64, ReactionError> {
        let value = self.value(id)?;
        value.as_int().ok_or_else(|| wrong_type(id, "int", value))
    }

    pub fn text(&self, id: &str) -> Result<&'a str, ReactionError> {
        let value = self.value(id)?;
        value.as_text().ok_or_else(|| wrong_type(id, "text", value))
    }

    pub fn flag(&self, id: &str) -> Result<bool, ReactionError> {
        let value = self.value(id)?;
        value.as_bool().ok_or_else(|| wrong_type(id, "bool", value))
    }

    pub fn clicks(&self, id: &str) -> Result<u32, ReactionError> {
        let value = self.value(id)?;
        value.as_clicks().ok_or_else(|| wrong_type(id, "clicks", value))
    }

    fn into_reads(self) -> Option<BTreeSet<InputId>> {
        self.reads.map(RefCell::into_inner)
    }
}

fn wrong_type(id: &str, expected: &'static str, found: &InputValue) -> ReactionError {
    ReactionError::WrongType {
        id: InputId::from(id),
        expected,
        found: found.type_name(),
    }
}

/// Input writes requested by an effect.
#[derive(Debug, Default)]
pub struct Updates {
    pending: Vec<(InputId, InputValue)>,
}

impl Updates {
    pub fn set(&mut self, id: &str, value: InputValue) {
        self.pending.push((InputId::from(id), value));
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

type RenderFn<O> = Box<dyn Fn(&Inputs<'_>) -> Result<O, ReactionError> + Send + Sync>;
type EffectFn = Box<dyn Fn(&Inputs<'_>, &mut Updates) -> Result<(), ReactionError> + Send + Sync>;

enum Body<O> {
    Render { output: OutputId, render: RenderFn<O> },
    Effect { name: String, effect: EffectFn },
}

struct Reaction<O> {
    trigger: Trigger,
    body: Body<O>,
}

impl<O> Reaction<O> {
    fn label(&self) -> &str {
        match &self.body {
            Body::Render { output, .. } => output.as_str(),
            Body::Effect { name, .. } => name,
        }
    }
}

/// Ordered reactions of one app. Order decides evaluation order within a round.
pub struct ReactionTable<O> {
    reactions: Vec<Reaction<O>>,
}

impl<O> Default for ReactionTable<O> {
    fn default() -> Self {
        Self {
            reactions: Vec::new(),
        }
    }
}

impl<O> ReactionTable<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output<F>(mut self, id: &str, trigger: Trigger, render: F) -> Self
    where
        F: Fn(&Inputs<'_>) -> Result<O, ReactionError> + Send + Sync + 'static,
    {
        self.reactions.push(Reaction {
            trigger,
            body: Body::Render {
                output: OutputId::from(id),
                render: Box::new(render),
            },
        });
        self
    }

    pub fn effect<F>(mut self, name: &str, trigger: Trigger, effect: F) -> Self
    where
        F: Fn(&Inputs<'_>, &mut Updates) -> Result<(), ReactionError> + Send + Sync + 'static,
    {
        self.reactions.push(Reaction {
            trigger,
            body: Body::Effect {
                name: name.to_string(),
                effect: Box::new(effect),
            },
        });
        self
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change<O> {
    /// An effect overwrote an input.
    Input { id: InputId, value: InputValue },
    /// An output was re-rendered; `Err` carries the failure message.
    Output {
        id: OutputId,
        result: Result<O, String>,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    View(#[from] ViewError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("reaction '{reaction}' targets unknown output '{output}'")]
    UnknownOutput { reaction: String, output: OutputId },
    #[error("reaction '{reaction}' listens to unknown input '{input}'")]
    UnknownEventInput { reaction: String, input: InputId },
    #[error("reactions did not settle after {0} rounds")]
    FlushLimit(usize),
}

enum Outcome<O> {
    Rendered {
        output: OutputId,
        result: Result<O, String>,
    },
    Effect {
        updates: Vec<(InputId, InputValue)>,
    },
}

pub struct Session<O> {
    specs: BTreeMap<InputId, InputSpec>,
    values: BTreeMap<InputId, InputValue>,
    reactions: Vec<Reaction<O>>,
    deps: Vec<BTreeSet<InputId>>,
    outputs: BTreeMap<OutputId, Result<O, String>>,
}

impl<O: Clone> Session<O> {
    /// Builds a session with default input values and runs the startup flush.
    pub fn start(view: &View, table: ReactionTable<O>) -> Result<(Self, Vec<Change<O>>), SessionError> {
        view.validate()?;

        let specs: BTreeMap<InputId, InputSpec> = view
            .inputs()
            .map(|spec| (spec.id.clone(), spec.clone()))
            .collect();
        let values = specs
            .iter()
            .map(|(id, spec)| (id.clone(), spec.default_value()))
            .collect();

        for reaction in &table.reactions {
            if let Body::Render { output, .. } = &reaction.body {
                if view.output(output).is_none() {
                    return Err(SessionError::UnknownOutput {
                        reaction: reaction.label().to_string(),
                        output: output.clone(),
                    });
                }
            }
            if let Trigger::Event { inputs, .. } = &reaction.trigger {
                if let Some(input) = inputs.iter().find(|id| !specs.contains_key(*id)) {
                    return Err(SessionError::UnknownEventInput {
                        reaction: reaction.label().to_string(),
                        input: input.clone(),
                    });
                }
            }
        }

        let reaction_count = table.reactions.len();
        let mut session = Self {
            specs,
            values,
            reactions: table.reactions,
            deps: vec![BTreeSet::new(); reaction_count],
            outputs: BTreeMap::new(),
        };

        let initial: BTreeSet<usize> = session
            .reactions
            .iter()
            .enumerate()
            .filter(|(_, reaction)| match &reaction.trigger {
                Trigger::Auto => true,
                Trigger::Event {
                    inputs,
                    ignore_none,
                } => !ignore_none || inputs.iter().any(|id| session.has_fired(id)),
            })
            .map(|(index, _)| index)
            .collect();

        let changes = session.flush(initial)?;
        Ok((session, changes))
    }

    /// Applies a raw value from a client. Unchanged values are a no-op.
    pub fn set_input(&mut self, id: &InputId, raw: &Value) -> Result<Vec<Change<O>>, SessionError> {
        let value = self.spec(id)?.coerce(raw)?;
        self.assign(id, value)
    }

    pub fn set_value(&mut self, id: &InputId, value: InputValue) -> Result<Vec<Change<O>>, SessionError> {
        let spec = self.spec(id)?;
        if spec.is_action() {
            return Err(InputError::NotSettable(id.clone()).into());
        }
        spec.check(&value)?;
        self.assign(id, value)
    }

    /// Presses an action button.
    pub fn trigger(&mut self, id: &InputId) -> Result<Vec<Change<O>>, SessionError> {
        if !self.spec(id)?.is_action() {
            return Err(InputError::NotAnAction(id.clone()).into());
        }
        let clicks = self
            .values
            .get(id)
            .and_then(InputValue::as_clicks)
            .unwrap_or_default();
        self.values
            .insert(id.clone(), InputValue::Clicks(clicks.saturating_add(1)));
        debug!(input = %id, clicks = clicks + 1, "action triggered");
        let pending = self.dependents(id);
        self.flush(pending)
    }

    pub fn input(&self, id: &InputId) -> Option<&InputValue> {
        self.values.get(id)
    }

    pub fn inputs(&self) -> &BTreeMap<InputId, InputValue> {
        &self.values
    }

    /// Last rendered value; `None` while the output has never run.
    pub fn output(&self, id: &OutputId) -> Option<&Result<O, String>> {
        self.outputs.get(id)
    }

    pub fn outputs(&self) -> &BTreeMap<OutputId, Result<O, String>> {
        &self.outputs
    }

    /// Inputs the reaction behind `output` read during its last run.
    pub fn dependencies(&self, output: &OutputId) -> Option<&BTreeSet<InputId>> {
        self.reactions
            .iter()
            .position(|reaction| matches!(&reaction.body, Body::Render { output: o, .. } if o == output))
            .map(|index| &self.deps[index])
    }

    fn spec(&self, id: &InputId) -> Result<&InputSpec, InputError> {
        self.specs
            .get(id)
            .ok_or_else(|| InputError::UnknownInput(id.clone()))
    }

    fn has_fired(&self, id: &InputId) -> bool {
        self.values
            .get(id)
            .is_some_and(|value| !value.is_none_event())
    }

    fn assign(&mut self, id: &InputId, value: InputValue) -> Result<Vec<Change<O>>, SessionError> {
        if self.values.get(id) == Some(&value) {
            return Ok(Vec::new());
        }
        debug!(input = %id, %value, "input changed");
        self.values.insert(id.clone(), value);
        let pending = self.dependents(id);
        self.flush(pending)
    }

    fn dependents(&self, id: &InputId) -> BTreeSet<usize> {
        self.reactions
            .iter()
            .enumerate()
            .filter(|(index, reaction)| match &reaction.trigger {
                Trigger::Auto => self.deps[*index].contains(id),
                Trigger::Event {
                    inputs,
                    ignore_none,
                } => inputs.contains(id) && !(*ignore_none && !self.has_fired(id)),
            })
            .map(|(index, _)| index)
            .collect()
    }

    fn flush(&mut self, mut pending: BTreeSet<usize>) -> Result<Vec<Change<O>>, SessionError> {
        let mut changes = Vec::new();
        let mut rounds = 0;

        while !pending.is_empty() {
            rounds += 1;
            if rounds > MAX_FLUSH_ROUNDS {
                warn!(rounds = MAX_FLUSH_ROUNDS, "reaction flush did not settle");
                return Err(SessionError::FlushLimit(MAX_FLUSH_ROUNDS));
            }

            let mut next = BTreeSet::new();
            for index in std::mem::take(&mut pending) {
                match self.run(index) {
                    Outcome::Rendered { output, result } => {
                        self.outputs.insert(output.clone(), result.clone());
                        changes.push(Change::Output { id: output, result });
                    }
                    Outcome::Effect { updates } => {
                        for (id, value) in updates {
                            if let Err(error) = self.spec(&id).and_then(|spec| spec.check(&value)) {
                                warn!(%error, "effect wrote an invalid input value; ignored");
                                continue;
                            }
                            if self.values.get(&id) == Some(&value) {
                                continue;
                            }
                            self.values.insert(id.clone(), value.clone());
                            next.extend(self.dependents(&id));
                            changes.push(Change::Input { id, value });
                        }
                    }
                }
            }
            pending = next;
        }

        Ok(changes)
    }

    fn run(&mut self, index: usize) -> Outcome<O> {
        let reaction = &self.reactions[index];
        debug!(reaction = reaction.label(), "running reaction");
        let inputs = Inputs::new(&self.values, reaction.trigger == Trigger::Auto);

        let outcome = match &reaction.body {
            Body::Render { output, render } => {
                let result = render(&inputs).map_err(|error| {
                    warn!(output = %output, %error, "output failed to render");
                    error.to_string()
                });
                Outcome::Rendered {
                    output: output.clone(),
                    result,
                }
            }
            Body::Effect { name, effect } => {
                let mut updates = Updates::default();
                match effect(&inputs, &mut updates) {
                    Ok(()) => Outcome::Effect {
                        updates: updates.pending,
                    },
                    Err(error) => {
                        warn!(effect = %name, %error, "effect failed");
                        Outcome::Effect {
                            updates: Vec::new(),
                        }
                    }
                }
            }
        };

        if let Some(reads) = inputs.into_reads() {
            self.deps[index] = reads;
        }
        outcome
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
