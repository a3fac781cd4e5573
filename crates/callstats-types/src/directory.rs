//! Extension provisioning types.
//!
//! An [`ExtensionRequest`] is what a client posts to create a user. It is
//! merged with the default directory template into a [`DirectoryEntry`],
//! which the provisioning store persists as the engine's directory XML.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::Validate;

/// Request to provision a new extension.
///
/// Only `user_id` and `password` are required. The password may be given at
/// the top level or as `params.password`. Everything else overrides the
/// default template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ExtensionRequest {
    /// Directory user id (the extension number).
    #[serde(default)]
    #[validate(length(max = 64))]
    pub user_id: Option<String>,
    /// SIP password for the extension.
    #[serde(default)]
    #[validate(length(max = 128))]
    pub password: Option<String>,
    /// Caller id name presented on internal calls.
    #[serde(default)]
    #[validate(length(max = 80))]
    pub caller_id_name: Option<String>,
    /// Caller id number presented on internal calls.
    #[serde(default)]
    #[validate(length(max = 32))]
    pub caller_id_number: Option<String>,
    /// Account code used for CDR attribution.
    #[serde(default)]
    #[validate(length(max = 32))]
    pub account_code: Option<String>,
    /// Raw `<param>` overrides (voicemail settings and friends).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Raw `<variable>` overrides (dialing variables).
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl ExtensionRequest {
    /// Shorthand for a request carrying only the two required fields.
    pub fn new(user_id: &str, password: &str) -> Self {
        Self {
            user_id: Some(user_id.to_owned()),
            password: Some(password.to_owned()),
            ..Self::default()
        }
    }

    /// The effective password: top-level field first, then `params.password`.
    pub fn effective_password(&self) -> Option<&str> {
        self.password
            .as_deref()
            .or_else(|| self.params.get("password").map(String::as_str))
            .filter(|p| !p.is_empty())
    }
}

/// A complete directory entry, ready to be written as XML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DirectoryEntry {
    /// Directory user id.
    pub user_id: String,
    /// `<param name=... value=...>` entries.
    pub params: BTreeMap<String, String>,
    /// `<variable name=... value=...>` entries.
    pub variables: BTreeMap<String, String>,
}

impl DirectoryEntry {
    /// The name shown for this user: full name first, then caller id name.
    pub fn display_name(&self) -> Option<&str> {
        self.variables
            .get("directory_full_name")
            .or_else(|| self.variables.get("effective_caller_id_name"))
            .map(String::as_str)
            .filter(|n| !n.is_empty())
    }
}

/// Result of a user lookup or a successful provisioning call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProvisionedUser {
    /// Directory user id.
    pub user_id: String,
    /// Whether a directory entry exists for the user.
    pub exists: bool,
    /// Display name, when the entry carries one.
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_falls_back_to_params() {
        let mut request = ExtensionRequest {
            user_id: Some(String::from("1000")),
            ..ExtensionRequest::default()
        };
        assert_eq!(request.effective_password(), None);

        request
            .params
            .insert(String::from("password"), String::from("secret"));
        assert_eq!(request.effective_password(), Some("secret"));

        request.password = Some(String::from("override"));
        assert_eq!(request.effective_password(), Some("override"));
    }

    #[test]
    fn empty_password_is_absent() {
        let request = ExtensionRequest::new("1000", "");
        assert_eq!(request.effective_password(), None);
    }

    #[test]
    fn request_deserializes_with_missing_fields() {
        let request: ExtensionRequest =
            serde_json::from_str(r#"{"user_id": "2000"}"#).unwrap_or_default();
        assert_eq!(request.user_id.as_deref(), Some("2000"));
        assert!(request.password.is_none());
        assert!(request.params.is_empty());
    }

    #[test]
    fn overlong_user_id_fails_validation() {
        let request = ExtensionRequest::new(&"9".repeat(65), "x");
        assert!(request.validate().is_err());
        assert!(ExtensionRequest::new("2000", "x").validate().is_ok());
    }

    #[test]
    fn display_name_prefers_full_name() {
        let mut variables = BTreeMap::new();
        variables.insert(
            String::from("effective_caller_id_name"),
            String::from("Nick"),
        );
        let mut entry = DirectoryEntry {
            user_id: String::from("1000"),
            params: BTreeMap::new(),
            variables,
        };
        assert_eq!(entry.display_name(), Some("Nick"));

        entry.variables.insert(
            String::from("directory_full_name"),
            String::from("Nick Claus"),
        );
        assert_eq!(entry.display_name(), Some("Nick Claus"));
    }
}
