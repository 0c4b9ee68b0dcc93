//! Lead records as persisted by the backend store.

use serde::{Deserialize, Serialize};

/// Sentinel for a blank `name` or `source` at creation.
pub const UNKNOWN: &str = "Unknown";

/// Status given to a lead created without one.
pub const DEFAULT_STATUS: &str = "New";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A prospective customer record. `id` is assigned once at creation and is the store key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub source: String,
    pub contact: Contact,
    pub interested_products: Vec<String>,
    pub status: String,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactFields {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Mutable lead fields, every one optional. Used as the create body (blanks fall back to
/// defaults) and as the partial update body (absent fields keep their value).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub contact: Option<ContactFields>,
    #[serde(default)]
    pub interested_products: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LeadFields {
    /// True when the body would change nothing.
    pub fn is_empty(&self) -> bool {
        let contact_empty = self
            .contact
            .as_ref()
            .map(|c| c.email.is_none() && c.phone.is_none())
            .unwrap_or(true);
        self.name.is_none()
            && self.source.is_none()
            && contact_empty
            && self.interested_products.is_none()
            && self.status.is_none()
            && self.notes.is_none()
    }
}

impl Lead {
    /// Builds a new lead, applying the creation defaults.
    pub fn create(id: impl Into<String>, fields: LeadFields) -> Self {
        let contact = fields.contact.unwrap_or_default();
        Self {
            id: id.into(),
            name: non_blank(fields.name).unwrap_or_else(|| UNKNOWN.to_string()),
            source: non_blank(fields.source).unwrap_or_else(|| UNKNOWN.to_string()),
            contact: Contact {
                email: non_blank(contact.email),
                phone: non_blank(contact.phone),
            },
            interested_products: fields.interested_products.unwrap_or_default(),
            status: non_blank(fields.status).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            notes: fields.notes.unwrap_or_default(),
        }
    }

    /// Merges `fields` into this lead. The id is untouched.
    pub fn merge(&mut self, fields: LeadFields) {
        if let Some(name) = fields.name {
            self.name = name;
        }
        if let Some(source) = fields.source {
            self.source = source;
        }
        if let Some(contact) = fields.contact {
            if let Some(email) = contact.email {
                self.contact.email = Some(email);
            }
            if let Some(phone) = contact.phone {
                self.contact.phone = Some(phone);
            }
        }
        if let Some(products) = fields.interested_products {
            self.interested_products = products;
        }
        if let Some(status) = fields.status {
            self.status = status;
        }
        if let Some(notes) = fields.notes {
            self.notes = notes;
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
