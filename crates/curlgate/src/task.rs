//! Task requests and dispatch by task kind.

use serde::Deserialize;
use thiserror::Error;

use crate::curl::{CurlEngine, ExecutionResult};
use crate::error::Result;

/// Body of a task execution request.
///
/// Every field defaults when absent; `secure_key` is only read by the auth gate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskRequest {
    /// Task kind code, see [`TaskKind::from_code`]
    #[serde(rename = "type", default)]
    pub task_type: String,
    /// Command line to run
    #[serde(default)]
    pub command: String,
    /// Key sent in the JSON body. The auth gate reads it from the raw
    /// bytes; the field keeps the request schema complete.
    #[serde(default)]
    pub secure_key: Option<String>,
}

/// Task type code outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported task type: {0}")]
pub struct UnsupportedTaskType(pub String);

/// Kinds of task the agent understands. Only [`TaskKind::Curl`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Curl,
    Node,
    Python,
}

impl TaskKind {
    pub fn from_code(code: &str) -> std::result::Result<Self, UnsupportedTaskType> {
        match code {
            "1" => Ok(Self::Curl),
            "2" => Ok(Self::Node),
            "3" => Ok(Self::Python),
            other => Err(UnsupportedTaskType(other.to_string())),
        }
    }

    /// Wire code, the inverse of [`TaskKind::from_code`]. Logged with each task.
    pub fn code(self) -> &'static str {
        match self {
            Self::Curl => "1",
            Self::Node => "2",
            Self::Python => "3",
        }
    }

    /// Human-readable runtime name used in responses.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Curl => "curl",
            Self::Node => "Node.js",
            Self::Python => "Python",
        }
    }
}

/// What running a task produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed(ExecutionResult),
    /// The kind is recognized but has no executor.
    NotImplemented(TaskKind),
}

impl TaskKind {
    /// Run `command` as this kind of task.
    pub async fn run(self, engine: &CurlEngine, command: &str) -> Result<TaskOutcome> {
        match self {
            Self::Curl => Ok(TaskOutcome::Completed(engine.execute(command).await?)),
            Self::Node | Self::Python => Ok(TaskOutcome::NotImplemented(self)),
        }
    }
}
