//! Command envelope: the `{command, data, id}` message between the agent and MCP layers.
//!
//! [`CommandEnvelope`] is the wire form and accepts whatever shape the text generator produced.
//! [`Command`] is the closed form the router dispatches on; converting one into the other is the
//! only place an unknown command or a missing argument can surface.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Marker the MCP and agent layers put on every relayed response.
pub const HANDLED: &str = "Handled";

/// Response header on MCP's execute reply carrying the backend's own status code.
pub const BACKEND_STATUS_HEADER: &str = "x-lead-backend-status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CreateLead,
    GetLeads,
    GetLeadById,
    UpdateLeadById,
    DeleteLeadById,
}

impl CommandKind {
    pub const ALL: [CommandKind; 5] = [
        CommandKind::CreateLead,
        CommandKind::GetLeads,
        CommandKind::GetLeadById,
        CommandKind::UpdateLeadById,
        CommandKind::DeleteLeadById,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::CreateLead => "createLead",
            CommandKind::GetLeads => "getLeads",
            CommandKind::GetLeadById => "getLeadById",
            CommandKind::UpdateLeadById => "updateLeadById",
            CommandKind::DeleteLeadById => "deleteLeadById",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CommandError::Unknown(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("command is required")]
    MissingCommand,
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("ID is required for {0}")]
    MissingId(CommandKind),
    #[error("data is required for {0}")]
    MissingData(CommandKind),
    #[error("ID and data are required for {0}")]
    MissingIdAndData(CommandKind),
    #[error("malformed command envelope: {0}")]
    Malformed(String),
}

/// Wire form of a command. Unknown keys are ignored; a blank or non-scalar `id` reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    #[serde(default, deserialize_with = "lenient_text")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl CommandEnvelope {
    /// Read an envelope from an arbitrary JSON value. Only non-objects are rejected here.
    pub fn from_value(value: Value) -> Result<Self, CommandError> {
        if !value.is_object() {
            return Err(CommandError::Malformed(
                "expected a JSON object with a `command` field".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| CommandError::Malformed(e.to_string()))
    }

    pub fn kind(&self) -> Result<CommandKind, CommandError> {
        self.command
            .as_deref()
            .ok_or(CommandError::MissingCommand)?
            .parse()
    }

    /// `data` as an object, when it is one.
    pub fn data_object(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref().and_then(Value::as_object)
    }
}

/// A validated command. Each variant carries only what its operation needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateLead { data: Map<String, Value> },
    GetLeads,
    GetLeadById { id: String },
    UpdateLeadById { id: String, data: Map<String, Value> },
    DeleteLeadById { id: String },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::CreateLead { .. } => CommandKind::CreateLead,
            Command::GetLeads => CommandKind::GetLeads,
            Command::GetLeadById { .. } => CommandKind::GetLeadById,
            Command::UpdateLeadById { .. } => CommandKind::UpdateLeadById,
            Command::DeleteLeadById { .. } => CommandKind::DeleteLeadById,
        }
    }
}

impl TryFrom<CommandEnvelope> for Command {
    type Error = CommandError;

    fn try_from(envelope: CommandEnvelope) -> Result<Self, Self::Error> {
        let kind = envelope.kind()?;
        let CommandEnvelope { data, id, .. } = envelope;
        let data = match data {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        };
        match kind {
            CommandKind::CreateLead => data
                .map(|data| Command::CreateLead { data })
                .ok_or(CommandError::MissingData(kind)),
            CommandKind::GetLeads => Ok(Command::GetLeads),
            CommandKind::GetLeadById => id
                .map(|id| Command::GetLeadById { id })
                .ok_or(CommandError::MissingId(kind)),
            CommandKind::UpdateLeadById => match (id, data) {
                (Some(id), Some(data)) if !data.is_empty() => {
                    Ok(Command::UpdateLeadById { id, data })
                }
                _ => Err(CommandError::MissingIdAndData(kind)),
            },
            CommandKind::DeleteLeadById => id
                .map(|id| Command::DeleteLeadById { id })
                .ok_or(CommandError::MissingId(kind)),
        }
    }
}

impl From<Command> for CommandEnvelope {
    fn from(command: Command) -> Self {
        let command_name = Some(command.kind().as_str().to_string());
        match command {
            Command::CreateLead { data } => CommandEnvelope {
                command: command_name,
                data: Some(Value::Object(data)),
                id: None,
            },
            Command::GetLeads => CommandEnvelope {
                command: command_name,
                ..Default::default()
            },
            Command::GetLeadById { id } | Command::DeleteLeadById { id } => CommandEnvelope {
                command: command_name,
                data: None,
                id: Some(id),
            },
            Command::UpdateLeadById { id, data } => CommandEnvelope {
                command: command_name,
                data: Some(Value::Object(data)),
                id: Some(id),
            },
        }
    }
}

/// `{message: "Handled", mcpResponse: ...}` wrapper shared by the MCP and agent responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Handled<T> {
    pub message: &'static str,
    pub mcp_response: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_status: Option<u16>,
}

impl<T> Handled<T> {
    pub fn new(mcp_response: T) -> Self {
        Self {
            message: HANDLED,
            mcp_response,
            mcp_status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.mcp_status = Some(status);
        self
    }
}
