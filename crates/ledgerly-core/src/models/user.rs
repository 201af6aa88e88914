//! The authenticated account as returned by the auth endpoints.
//!
//! Business defaults travel with the identity so consumers can prefill
//! invoices without another round trip. The session layer never interprets
//! them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(rename = "isEmailVerified", default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub settings: BusinessDefaults,
}

fn default_role() -> String {
    "user".to_string()
}

/// Per-account invoicing defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessDefaults {
    pub currency: Option<String>,
    #[serde(rename = "taxRate")]
    pub tax_rate: Option<f64>,
    #[serde(rename = "invoicePrefix")]
    pub invoice_prefix: Option<String>,
    #[serde(rename = "nextInvoiceNumber")]
    pub next_invoice_number: Option<u64>,
}

impl UserIdentity {
    /// Name for display, falling back to the email address
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_user() {
        let json = r#"{"id":"u1","email":"ana@example.com","name":"Ana","role":"admin","isEmailVerified":true,"settings":{"currency":"EUR","taxRate":21.0,"invoicePrefix":"INV-","nextInvoiceNumber":42}}"#;

        let user: UserIdentity = serde_json::from_str(json).expect("Failed to parse user JSON");
        assert_eq!(user.id, "u1");
        assert!(user.is_email_verified);
        assert!(user.is_admin());
        assert_eq!(user.settings.currency.as_deref(), Some("EUR"));
        assert_eq!(user.settings.tax_rate, Some(21.0));
        assert_eq!(user.settings.next_invoice_number, Some(42));
    }

    #[test]
    fn test_parse_minimal_user_uses_defaults() {
        let json = r#"{"id":"u2","email":"bo@example.com","createdAt":"2024-01-01"}"#;

        let user: UserIdentity = serde_json::from_str(json).expect("Failed to parse user JSON");
        assert_eq!(user.role, "user");
        assert!(!user.is_email_verified);
        assert_eq!(user.settings, BusinessDefaults::default());
        assert_eq!(user.display_name(), "bo@example.com");
    }
}
