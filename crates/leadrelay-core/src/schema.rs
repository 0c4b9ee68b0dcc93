//! Lead field schema shared by the MCP validator and the agent's screen.
//!
//! Both layers read [`LEAD_FIELDS`] through [`inspect_lead`], so the required-field set is
//! defined exactly once. Paths are dotted (`contact.email`) and resolved segment by segment.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Absence blocks creation.
    Required,
    /// Absence is reported as a note only.
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A string with non-whitespace content.
    Text,
    /// An array with at least one element.
    NonEmptyList,
}

#[derive(Debug, PartialEq, Eq)]
pub struct FieldRule {
    pub path: &'static str,
    pub label: &'static str,
    pub presence: Presence,
    pub shape: Shape,
    /// Human-readable guidance shown when the field is absent.
    pub hint: &'static str,
}

pub const LEAD_FIELDS: &[FieldRule] = &[
    FieldRule {
        path: "name",
        label: "name",
        presence: Presence::Required,
        shape: Shape::Text,
        hint: "Name is missing. Example: John Doe",
    },
    FieldRule {
        path: "source",
        label: "source",
        presence: Presence::Required,
        shape: Shape::Text,
        hint: "Source is missing. Example: website, referral, social media",
    },
    FieldRule {
        path: "contact.email",
        label: "email",
        presence: Presence::Required,
        shape: Shape::Text,
        hint: "Email is missing. Example: john@example.com",
    },
    FieldRule {
        path: "interestedProducts",
        label: "interestedProducts",
        presence: Presence::Required,
        shape: Shape::NonEmptyList,
        hint: "At least one interested product is required. Example: [\"premium plan\", \"basic plan\"]",
    },
    FieldRule {
        path: "contact.phone",
        label: "phone",
        presence: Presence::Optional,
        shape: Shape::Text,
        hint: "Phone number is missing (optional)",
    },
];

const EMAIL_PATH: &str = "contact.email";

/// Resolve a dotted path inside a JSON value.
pub fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |value, part| value.get(part))
}

fn is_present(value: Option<&Value>, shape: Shape) -> bool {
    match (value, shape) {
        (Some(Value::String(s)), Shape::Text) => !s.trim().is_empty(),
        (Some(Value::Array(items)), Shape::NonEmptyList) => !items.is_empty(),
        _ => false,
    }
}

/// `local@domain.tld`, no whitespace, exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Outcome of checking a `createLead` payload against [`LEAD_FIELDS`].
#[derive(Debug, Default)]
pub struct LeadReport {
    /// Required rules that are absent, in schema order.
    pub missing: Vec<&'static FieldRule>,
    /// Optional rules that are absent.
    pub advisories: Vec<&'static FieldRule>,
    /// An email is present but does not look like one.
    pub invalid_email: bool,
}

impl LeadReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && !self.invalid_email
    }

    pub fn missing_paths(&self) -> Vec<String> {
        self.missing.iter().map(|r| r.path.to_string()).collect()
    }

    pub fn missing_labels(&self) -> Vec<String> {
        self.missing.iter().map(|r| r.label.to_string()).collect()
    }
}

pub fn inspect_lead(data: &Value) -> LeadReport {
    let mut report = LeadReport::default();
    for rule in LEAD_FIELDS {
        if is_present(lookup(data, rule.path), rule.shape) {
            continue;
        }
        match rule.presence {
            Presence::Required => report.missing.push(rule),
            Presence::Optional => report.advisories.push(rule),
        }
    }
    if let Some(Value::String(email)) = lookup(data, EMAIL_PATH) {
        report.invalid_email = !email.trim().is_empty() && !is_valid_email(email);
    }
    report
}

/// A complete, valid `createLead` payload used in guidance responses.
pub fn example_lead() -> Value {
    serde_json::json!({
        "name": "John Doe",
        "source": "website",
        "contact": {
            "email": "john@example.com",
            "phone": "1234567890"
        },
        "interestedProducts": ["premium plan"],
        "status": "New",
        "notes": "Interested in learning more about features"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_walks_dotted_paths() {
        let data = json!({ "contact": { "email": "a@b.co" } });
        assert_eq!(lookup(&data, "contact.email"), Some(&json!("a@b.co")));
        assert_eq!(lookup(&data, "contact.phone"), None);
        assert_eq!(lookup(&Value::Null, "contact.email"), None);
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("john@example.com"));
        assert!(is_valid_email("j.d+tag@sub.example.io"));
        assert!(!is_valid_email("john@example"));
        assert!(!is_valid_email("john example@x.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("john@@example.com"));
    }

    #[test]
    fn complete_payload_passes() {
        let report = inspect_lead(&example_lead());
        assert!(report.is_complete());
        assert!(report.advisories.is_empty());
    }

    #[test]
    fn missing_fields_listed_in_schema_order() {
        let data = json!({ "source": "website", "interestedProducts": [] });
        let report = inspect_lead(&data);
        assert_eq!(
            report.missing_paths(),
            vec!["name", "contact.email", "interestedProducts"]
        );
        assert_eq!(report.missing_labels(), vec!["name", "email", "interestedProducts"]);
        assert_eq!(report.advisories.len(), 1);
        assert_eq!(report.advisories[0].label, "phone");
        assert!(!report.invalid_email);
    }

    #[test]
    fn wrong_types_count_as_missing() {
        let data = json!({
            "name": 42,
            "source": "   ",
            "contact": { "email": "a@b.co" },
            "interestedProducts": "A"
        });
        assert_eq!(
            inspect_lead(&data).missing_paths(),
            vec!["name", "source", "interestedProducts"]
        );
    }

    #[test]
    fn malformed_email_flagged() {
        let mut data = example_lead();
        data["contact"]["email"] = json!("not-an-email");
        let report = inspect_lead(&data);
        assert!(report.invalid_email);
        assert!(report.missing.is_empty());
        assert!(!report.is_complete());
    }
}
