//! MCP service: `POST /execute` validates a command envelope and routes it to the backend.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use leadrelay_core::{
    validate_create, CommandEnvelope, CommandError, CommandKind, CommandRouter, RouteError,
    Verdict, BACKEND_STATUS_HEADER,
};
use serde_json::{json, Value};

use crate::http::{health, status_code};

pub struct McpError(RouteError);

impl From<RouteError> for McpError {
    fn from(e: RouteError) -> Self {
        McpError(e)
    }
}

impl From<CommandError> for McpError {
    fn from(e: CommandError) -> Self {
        McpError(RouteError::Command(e))
    }
}

impl IntoResponse for McpError {
    fn into_response(self) -> Response {
        let status = status_code(self.0.status());
        let body = match &self.0 {
            RouteError::Command(e) => {
                tracing::warn!("[mcp] rejected command: {}", e);
                json!({ "error": e.to_string() })
            }
            RouteError::Service(e) => {
                tracing::error!("[mcp] backend call failed: {}", e);
                match e.details() {
                    Some(details) => json!({ "error": e.to_string(), "details": details }),
                    None => json!({ "error": e.to_string() }),
                }
            }
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(commands: CommandRouter) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/execute", post(execute))
        .with_state(commands)
}

async fn execute(
    State(commands): State<CommandRouter>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, McpError> {
    let Json(value) = payload.map_err(|r| CommandError::Malformed(r.body_text()))?;
    let envelope = CommandEnvelope::from_value(value)?;

    if envelope.kind() == Ok(CommandKind::CreateLead) {
        if let Verdict::Reject(rejection) = validate_create(envelope.data.as_ref()) {
            tracing::warn!("[mcp] createLead rejected: {}", rejection.message);
            return Ok((StatusCode::OK, Json(rejection.into_handled())).into_response());
        }
    }

    // Any routed reply is a handled command, including a backend 404.
    let res = commands.route(envelope).await?;
    let backend_status = [(BACKEND_STATUS_HEADER, res.status.to_string())];
    Ok((StatusCode::OK, backend_status, Json(res.data)).into_response())
}
