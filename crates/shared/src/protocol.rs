use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    domain::{InputId, InputValue, OutputId, SessionId},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientRequest {
    SetInput {
        input_id: InputId,
        value: serde_json::Value,
    },
    Trigger {
        input_id: InputId,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetInputRequest {
    pub input_id: InputId,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputPayload {
    Text {
        text: String,
    },
    Plot {
        src: String,
        width: u32,
        height: u32,
        alt: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutputState {
    Pending,
    Ready { payload: OutputPayload },
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    InputUpdated {
        input_id: InputId,
        value: InputValue,
    },
    OutputUpdated {
        output_id: OutputId,
        state: OutputState,
    },
    SessionClosed {
        session_id: SessionId,
    },
    Error(ApiError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSummary {
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub app: String,
    pub inputs: BTreeMap<InputId, InputValue>,
    pub outputs: BTreeMap<OutputId, OutputState>,
}
