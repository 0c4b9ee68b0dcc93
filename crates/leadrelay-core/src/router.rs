//! Command Router: pure dispatch from a [`Command`] to one [`LeadBackend`] call.
//! Stateless, no retries. Argument checks happen in the envelope-to-command conversion,
//! so a rejected envelope never reaches the backend.

use std::sync::Arc;

use crate::command::{Command, CommandEnvelope, CommandError};
use crate::lead_service::{LeadBackend, LeadServiceError, ServiceResponse};

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Service(#[from] LeadServiceError),
}

impl RouteError {
    /// HTTP status for this failure: 400 for bad input, the backend's status when it gave one,
    /// otherwise 500.
    pub fn status(&self) -> u16 {
        match self {
            RouteError::Command(_) => 400,
            RouteError::Service(e) => e.status().unwrap_or(500),
        }
    }
}

#[derive(Clone)]
pub struct CommandRouter {
    backend: Arc<dyn LeadBackend>,
}

impl CommandRouter {
    pub fn new(backend: Arc<dyn LeadBackend>) -> Self {
        Self { backend }
    }

    /// Validate the envelope's shape for its command, then dispatch.
    pub async fn route(&self, envelope: CommandEnvelope) -> Result<ServiceResponse, RouteError> {
        let command = Command::try_from(envelope)?;
        self.dispatch(command).await
    }

    pub async fn dispatch(&self, command: Command) -> Result<ServiceResponse, RouteError> {
        tracing::debug!(command = %command.kind(), "[mcp] dispatching");
        let result = match &command {
            Command::CreateLead { data } => self.backend.create_lead(data).await,
            Command::GetLeads => self.backend.list_leads().await,
            Command::GetLeadById { id } => self.backend.get_lead(id).await,
            Command::UpdateLeadById { id, data } => self.backend.update_lead(id, data).await,
            Command::DeleteLeadById { id } => self.backend.delete_lead(id).await,
        };
        let kind = command.kind();
        match &result {
            Ok(res) => tracing::info!(command = %kind, status = res.status, "[mcp] handled"),
            Err(e) => tracing::warn!(command = %kind, error = %e, "[mcp] backend failure"),
        }
        Ok(result?)
    }
}
