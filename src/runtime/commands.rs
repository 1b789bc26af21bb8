/// Lifecycle commands sent to the active-learning engine
///
/// Each command type carries its own typed payload. Payloads are validated before they are
/// wrapped in a `CommandEnvelope`, the self-describing JSON body posted to the command
/// endpoint, and decoded back into the typed form at that same boundary.

use crate::error::{OrchestratorError, Result};
use crate::project::Role;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kinds of lifecycle command understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    StartQuerying,
    ContinueQuerying,
    PromptTraining,
    SubmitLabels,
    TerminateProject,
}

impl CommandType {
    pub const ALL: [CommandType; 5] = [
        CommandType::StartQuerying,
        CommandType::ContinueQuerying,
        CommandType::PromptTraining,
        CommandType::SubmitLabels,
        CommandType::TerminateProject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::StartQuerying => "start_querying",
            CommandType::ContinueQuerying => "continue_querying",
            CommandType::PromptTraining => "prompt_training",
            CommandType::SubmitLabels => "submit_labels",
            CommandType::TerminateProject => "terminate_project",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.as_str() == value)
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartQuerying {
    pub query_count: u32,
    /// Replaces the configured query strategy for this session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueQuerying {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTraining {
    pub session_id: String,
    #[serde(default)]
    pub training_config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitLabels {
    pub session_id: String,
    pub labeled_samples: Vec<LabeledSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub sample_id: String,
    pub label: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminateProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A typed lifecycle command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartQuerying(StartQuerying),
    ContinueQuerying(ContinueQuerying),
    PromptTraining(PromptTraining),
    SubmitLabels(SubmitLabels),
    TerminateProject(TerminateProject),
}

impl Command {
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::StartQuerying(_) => CommandType::StartQuerying,
            Command::ContinueQuerying(_) => CommandType::ContinueQuerying,
            Command::PromptTraining(_) => CommandType::PromptTraining,
            Command::SubmitLabels(_) => CommandType::SubmitLabels,
            Command::TerminateProject(_) => CommandType::TerminateProject,
        }
    }

    /// Check the payload against the per-command requirements
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| -> Result<()> {
            Err(OrchestratorError::InvalidCommand {
                command_type: self.command_type().as_str(),
                reason: reason.to_string(),
            })
        };

        match self {
            Command::StartQuerying(payload) if payload.query_count == 0 => {
                invalid("query_count must be positive")
            }
            Command::StartQuerying(payload) if payload.max_rounds == Some(0) => {
                invalid("max_rounds must be positive when set")
            }
            Command::ContinueQuerying(payload) if payload.session_id.trim().is_empty() => {
                invalid("session_id is required")
            }
            Command::ContinueQuerying(payload) if payload.query_count == Some(0) => {
                invalid("query_count must be positive when set")
            }
            Command::PromptTraining(payload) if payload.session_id.trim().is_empty() => {
                invalid("session_id is required")
            }
            Command::SubmitLabels(payload) if payload.session_id.trim().is_empty() => {
                invalid("session_id is required")
            }
            Command::SubmitLabels(payload) if payload.labeled_samples.is_empty() => {
                invalid("at least one labeled sample is required")
            }
            _ => Ok(()),
        }
    }

    /// Payload as the `parameters` object of the envelope
    pub fn parameters(&self) -> Result<Value> {
        let value = match self {
            Command::StartQuerying(payload) => serde_json::to_value(payload)?,
            Command::ContinueQuerying(payload) => serde_json::to_value(payload)?,
            Command::PromptTraining(payload) => serde_json::to_value(payload)?,
            Command::SubmitLabels(payload) => serde_json::to_value(payload)?,
            Command::TerminateProject(payload) => serde_json::to_value(payload)?,
        };
        Ok(value)
    }

    /// Rebuild a typed command from its wire form
    pub fn decode(command_type: CommandType, parameters: Value) -> Result<Self> {
        let command = match command_type {
            CommandType::StartQuerying => Command::StartQuerying(payload(command_type, parameters)?),
            CommandType::ContinueQuerying => {
                Command::ContinueQuerying(payload(command_type, parameters)?)
            }
            CommandType::PromptTraining => Command::PromptTraining(payload(command_type, parameters)?),
            CommandType::SubmitLabels => Command::SubmitLabels(payload(command_type, parameters)?),
            CommandType::TerminateProject => {
                let parameters = if parameters.is_null() {
                    Value::Object(Default::default())
                } else {
                    parameters
                };
                Command::TerminateProject(payload(command_type, parameters)?)
            }
        };
        command.validate()?;
        Ok(command)
    }
}

fn payload<T: DeserializeOwned>(command_type: CommandType, parameters: Value) -> Result<T> {
    serde_json::from_value(parameters).map_err(|e| OrchestratorError::InvalidCommand {
        command_type: command_type.as_str(),
        reason: e.to_string(),
    })
}

/// Self-describing command body posted to the command endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub command_type: CommandType,
    pub project_id: String,
    pub workflow_id: String,
    pub parameters: Value,
    pub timestamp: DateTime<Utc>,
    pub user_wallet: String,
    pub user_role: Role,
    #[serde(default)]
    pub contract_address: Option<String>,
}

impl CommandEnvelope {
    pub fn decode_command(&self) -> Result<Command> {
        Command::decode(self.command_type, self.parameters.clone())
    }
}

/// Acknowledgement returned for an accepted command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub command_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Command-specific result data (e.g. queried samples)
    #[serde(default)]
    pub data: Option<Value>,
}
