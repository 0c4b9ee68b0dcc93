//! Agent service: `POST /api/ai-agent/parse-and-create`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use leadrelay_core::{Agent, AgentError, AgentOutcome};
use serde_json::Value;

use crate::http::{health, status_code};

pub fn router(agent: Agent) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/ai-agent/parse-and-create", post(parse_and_create))
        .with_state(agent)
}

fn failure(err: AgentError) -> Response {
    match &err {
        AgentError::MissingConversation => tracing::warn!("[agent] request without conversation"),
        _ => tracing::error!("[agent] failed: {}", err),
    }
    (status_code(err.status()), Json(err.body())).into_response()
}

async fn parse_and_create(
    State(agent): State<Agent>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let conversation = payload.ok().and_then(|Json(body)| {
        body.get("conversation")
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    let Some(conversation) = conversation else {
        return failure(AgentError::MissingConversation);
    };

    match agent.handle(&conversation).await {
        Ok(AgentOutcome::Forwarded { status, body }) => {
            Json(AgentOutcome::handled(status, body)).into_response()
        }
        Ok(AgentOutcome::Rejected(rejection)) => {
            (StatusCode::BAD_REQUEST, Json(rejection)).into_response()
        }
        Err(err) => failure(err),
    }
}
