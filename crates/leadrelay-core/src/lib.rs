//! Lead relay core library.
//! Lead records and their store, the command envelope, validation, routing, and the clients
//! each tier uses to reach the next one.

pub mod agent;
pub mod command;
pub mod config;
pub mod generation;
pub mod http;
pub mod lead;
pub mod lead_service;
pub mod router;
pub mod schema;
pub mod store;
pub mod validator;

pub use agent::{Agent, AgentError, AgentOutcome, AgentRejection, McpClient};
pub use command::{
    Command, CommandEnvelope, CommandError, CommandKind, Handled, BACKEND_STATUS_HEADER, HANDLED,
};
pub use config::{ConfigError, GenerationProvider, RelayConfig};
pub use generation::{client_from_config, GenerationClient, GenerationError};
pub use lead::{Contact, ContactFields, Lead, LeadFields};
pub use lead_service::{LeadBackend, LeadService, LeadServiceError, ServiceResponse};
pub use router::{CommandRouter, RouteError};
pub use store::{LeadStore, StoreError};
pub use validator::{validate_create, LeadRejection, Verdict};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
