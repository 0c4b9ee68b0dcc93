//! Agent: turns free-form conversation into one command envelope and relays it to MCP.
//!
//! Flow: prompt → generation (once) → strip fences → decode → screen → POST to MCP.
//! Screening rejects what MCP would reject anyway, so obviously incomplete commands never leave
//! this layer.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::{json, Value};

use crate::command::{CommandEnvelope, CommandError, CommandKind, Handled, BACKEND_STATUS_HEADER};
use crate::generation::{GenerationClient, GenerationError};
use crate::schema::{example_lead, inspect_lead};

const FAILED_TO_PROCESS: &str = "Failed to process";

/// Instructional prompt with one worked example per command, conversation last.
pub fn build_prompt(conversation: &str) -> String {
    format!(
        r#"You are a CRM assistant. Read the conversation below and answer with exactly one JSON command.
Reply with JSON only: no prose, no explanation.

Create a lead:
{{
  "command": "createLead",
  "data": {{
    "name": "...",
    "source": "cold_call",
    "contact": {{ "email": "...", "phone": null }},
    "interestedProducts": ["..."],
    "status": "New",
    "notes": "..."
  }}
}}

List all leads:
{{ "command": "getLeads" }}

Fetch one lead:
{{ "command": "getLeadById", "id": "123" }}

Update a lead:
{{
  "command": "updateLeadById",
  "id": "123",
  "data": {{ "status": "Contacted", "notes": "Follow-up done." }}
}}

Delete a lead:
{{ "command": "deleteLeadById", "id": "123" }}

Conversation:
{conversation}
"#
    )
}

/// Remove every ```` ```json ```` and ```` ``` ```` marker, then trim.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Decode cleaned generator output into an envelope.
pub fn decode_envelope(cleaned: &str) -> Result<CommandEnvelope, AgentError> {
    let value: Value = serde_json::from_str(cleaned).map_err(AgentError::Decode)?;
    CommandEnvelope::from_value(value).map_err(AgentError::Envelope)
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Conversation required")]
    MissingConversation,
    #[error("{0}")]
    Generation(#[from] GenerationError),
    #[error("generator output is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("{0}")]
    Envelope(CommandError),
    #[error("MCP unreachable: {0}")]
    McpUnreachable(#[source] reqwest::Error),
    #[error("MCP responded with status {status}")]
    McpStatus { status: u16, body: Value },
}

impl AgentError {
    pub fn status(&self) -> u16 {
        match self {
            AgentError::MissingConversation => 400,
            AgentError::McpStatus { status, .. } => *status,
            _ => 500,
        }
    }

    /// JSON body sent back to the caller.
    pub fn body(&self) -> Value {
        match self {
            AgentError::MissingConversation => json!({ "error": self.to_string() }),
            AgentError::McpStatus { body, .. } => {
                let error = ["error", "message"]
                    .iter()
                    .find_map(|key| body.get(key).filter(|v| !v.is_null()).cloned())
                    .unwrap_or_else(|| Value::from(FAILED_TO_PROCESS));
                let details = body
                    .get("details")
                    .filter(|v| !v.is_null())
                    .cloned()
                    .unwrap_or_else(|| Value::from(self.to_string()));
                json!({ "error": error, "details": details })
            }
            _ => json!({ "error": FAILED_TO_PROCESS, "details": self.to_string() }),
        }
    }
}

/// A 400 produced by screening; the command is not forwarded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRejection {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
    pub example: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AgentRejection {
    fn new(error: impl Into<String>, example: Value) -> Self {
        Self {
            error: error.into(),
            message: None,
            missing_fields: Vec::new(),
            example,
            note: None,
        }
    }

    fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

fn create_example() -> Value {
    json!({ "command": "createLead", "data": example_lead() })
}

fn update_example() -> Value {
    json!({
        "command": "updateLeadById",
        "id": "123",
        "data": {
            "status": "Contacted",
            "notes": "Updated notes",
            "contact": { "email": "new@example.com" },
            "interestedProducts": ["premium plan", "basic plan"]
        }
    })
}

/// Pre-flight check of a decoded envelope.
pub fn screen(envelope: &CommandEnvelope) -> Result<(), AgentRejection> {
    let kind = match envelope.kind() {
        Ok(kind) => kind,
        Err(e) => {
            let supported: Vec<&str> = CommandKind::ALL.iter().map(|k| k.as_str()).collect();
            return Err(AgentRejection::new("Unsupported command", create_example()).message(
                format!("{}. Supported commands: {}", e, supported.join(", ")),
            ));
        }
    };

    match kind {
        CommandKind::CreateLead => {
            // Same order as the MCP validator: a malformed email wins over missing fields.
            let report = inspect_lead(envelope.data.as_ref().unwrap_or(&Value::Null));
            if report.invalid_email {
                return Err(AgentRejection::new("Invalid email format", create_example())
                    .message("Please provide a valid email address (example: user@example.com)"));
            }
            if !report.missing.is_empty() {
                let mut rejection =
                    AgentRejection::new("Missing required fields", create_example());
                rejection.missing_fields = report.missing_paths();
                return Err(rejection);
            }
        }
        CommandKind::GetLeads => {}
        CommandKind::GetLeadById if envelope.id.is_none() => {
            return Err(AgentRejection::new(
                "Lead ID is required",
                json!({ "command": "getLeadById", "id": "123" }),
            )
            .message("Please provide a lead ID to look up"));
        }
        CommandKind::DeleteLeadById if envelope.id.is_none() => {
            return Err(AgentRejection::new(
                "Lead ID is required",
                json!({ "command": "deleteLeadById", "id": "123" }),
            )
            .message("Please provide a lead ID to delete"));
        }
        CommandKind::UpdateLeadById => {
            let mut problems = Vec::new();
            if envelope.id.is_none() {
                problems.push("Lead ID is required");
            }
            if envelope.data_object().map_or(true, |d| d.is_empty()) {
                problems.push("Update data is required");
            }
            if !problems.is_empty() {
                let mut rejection = AgentRejection::new(problems.join(" and "), update_example())
                    .message("Please provide both a lead ID and update data");
                rejection.note = Some(
                    "At least one field must be provided in the data object for update.".into(),
                );
                return Err(rejection);
            }
        }
        CommandKind::GetLeadById | CommandKind::DeleteLeadById => {}
    }
    Ok(())
}

/// HTTP client for MCP's execute endpoint.
#[derive(Clone)]
pub struct McpClient {
    url: Url,
    client: Client,
}

impl McpClient {
    pub fn new(url: Url, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let client = crate::http::client(timeout)?;
        Ok(Self { url, client })
    }

    /// POST the envelope. 2xx gives `(status, body)`, where `status` is the backend's own code
    /// when MCP reports one; anything else is [`AgentError::McpStatus`].
    pub async fn execute(&self, envelope: &CommandEnvelope) -> Result<(u16, Value), AgentError> {
        let res = self
            .client
            .post(self.url.clone())
            .json(envelope)
            .send()
            .await
            .map_err(AgentError::McpUnreachable)?;
        let status = res.status().as_u16();
        let backend_status = backend_status(res.headers());
        let text = res.text().await.map_err(AgentError::McpUnreachable)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        if (200..300).contains(&status) {
            Ok((backend_status.unwrap_or(status), body))
        } else {
            Err(AgentError::McpStatus { status, body })
        }
    }
}

fn backend_status(headers: &reqwest::header::HeaderMap) -> Option<u16> {
    headers
        .get(BACKEND_STATUS_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome {
    /// MCP accepted the command; `body` is its reply verbatim.
    Forwarded { status: u16, body: Value },
    Rejected(AgentRejection),
}

impl AgentOutcome {
    /// `{message: "Handled", mcpResponse, mcpStatus}` for a forwarded command.
    pub fn handled(status: u16, body: Value) -> Handled<Value> {
        Handled::new(body).with_status(status)
    }
}

#[derive(Clone)]
pub struct Agent {
    generator: Arc<dyn GenerationClient>,
    mcp: McpClient,
}

impl Agent {
    pub fn new(generator: Arc<dyn GenerationClient>, mcp: McpClient) -> Self {
        Self { generator, mcp }
    }

    pub async fn handle(&self, conversation: &str) -> Result<AgentOutcome, AgentError> {
        if conversation.trim().is_empty() {
            return Err(AgentError::MissingConversation);
        }

        let raw = self.generator.generate(&build_prompt(conversation)).await?;
        let envelope = decode_envelope(&strip_code_fences(&raw))?;
        tracing::debug!(command = ?envelope.command, "[agent] decoded command");

        if let Err(rejection) = screen(&envelope) {
            tracing::warn!(error = %rejection.error, "[agent] command rejected before MCP");
            return Ok(AgentOutcome::Rejected(rejection));
        }

        let (status, body) = self.mcp.execute(&envelope).await?;
        tracing::info!(command = ?envelope.command, status, "[agent] relayed to MCP");
        Ok(AgentOutcome::Forwarded { status, body })
    }
}
