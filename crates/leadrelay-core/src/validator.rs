//! Lead Validator: gates `createLead` before it reaches the router.
//!
//! A rejection never becomes a bare 500: it carries every missing-field message plus an example
//! payload, so a person or a downstream formatter can act on it.

use serde::Serialize;
use serde_json::Value;

use crate::command::Handled;
use crate::schema::{example_lead, inspect_lead};

const NO_DATA_MESSAGES: [&str; 4] = [
    "Name is required",
    "Source is required",
    "Email is required",
    "At least one interested product is required",
];

const INVALID_EMAIL_MESSAGE: &str =
    "Please provide a valid email address (example: user@example.com)";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRejection {
    pub message: String,
    pub missing_fields: Vec<String>,
    /// Labels of the missing required fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// Semantic status embedded inside a transport-level success.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticError {
    pub status: u16,
    pub error: LeadRejection,
}

impl LeadRejection {
    /// `{message: "Handled", mcpResponse: {status: 400, error}}`, sent with HTTP 200.
    pub fn into_handled(self) -> Handled<SemanticError> {
        Handled::new(SemanticError {
            status: 400,
            error: self,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Proceed,
    Reject(LeadRejection),
}

/// Check the `data` of a `createLead` envelope. `data` is only read.
pub fn validate_create(data: Option<&Value>) -> Verdict {
    let data = match data {
        Some(value) if !value.is_null() => value,
        _ => {
            return Verdict::Reject(LeadRejection {
                message: "Please provide lead information".to_string(),
                missing_fields: NO_DATA_MESSAGES.iter().map(|m| m.to_string()).collect(),
                fields: Vec::new(),
                example: None,
            })
        }
    };

    let report = inspect_lead(data);

    if report.invalid_email {
        return Verdict::Reject(LeadRejection {
            message: "Invalid email format".to_string(),
            missing_fields: vec![INVALID_EMAIL_MESSAGE.to_string()],
            fields: Vec::new(),
            example: None,
        });
    }

    if report.missing.is_empty() {
        return Verdict::Proceed;
    }

    let mut messages: Vec<String> = report.missing.iter().map(|r| r.hint.to_string()).collect();
    messages.extend(report.advisories.iter().map(|r| r.hint.to_string()));

    Verdict::Reject(LeadRejection {
        message: "Please provide the following information".to_string(),
        missing_fields: messages,
        fields: report.missing_labels(),
        example: Some(example_lead()),
    })
}
