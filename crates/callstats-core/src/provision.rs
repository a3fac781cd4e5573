//! Extension provisioning.
//!
//! A new user is the default directory template with the caller's overrides
//! laid on top. [`Provisioner::provision`] validates the request, writes the
//! entry to the [`DirectoryStore`] and asks the engine to `reloadxml`.

use std::collections::BTreeMap;
use std::sync::Arc;

use callstats_esl::vocabulary::RELOAD_XML;
use callstats_esl::Connector;
use callstats_types::{DirectoryEntry, ExtensionRequest, ProvisionedUser};
use tracing::{info, warn};

use crate::directory::{DirectoryStore, run_blocking, validate_user_id};
use crate::error::CoreError;
use crate::exchange::send_checked;

/// `<param>` values every new user starts with.
pub const DEFAULT_PARAMS: &[(&str, &str)] = &[
    ("vm-password", "1234"),
    ("vm-email-all-messages", "true"),
    ("vm-notify-mailto", "true"),
    ("vm-attach-file", "true"),
    ("vm-message-ext", "wav"),
    ("directory-exten-visible", "true"),
];

/// `<variable>` values every new user starts with, besides the ones derived
/// from the user id.
pub const DEFAULT_VARIABLES: &[(&str, &str)] = &[
    ("toll_allow", "domestic,international,local"),
    ("user_context", "default"),
    ("outbound_caller_id_name", "$${outbound_caller_name}"),
    ("outbound_caller_id_number", "$${outbound_caller_id}"),
];

/// The default template for `user_id`, before any override.
pub fn default_entry(user_id: &str) -> DirectoryEntry {
    let params = DEFAULT_PARAMS
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();

    let mut variables: BTreeMap<String, String> = DEFAULT_VARIABLES
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    variables.insert(String::from("accountcode"), user_id.to_owned());
    variables.insert(String::from("effective_caller_id_number"), user_id.to_owned());

    DirectoryEntry {
        user_id: user_id.to_owned(),
        params,
        variables,
    }
}

/// Merge `request` into the default template.
///
/// Raw `params`/`variables` overrides apply first, then the typed fields
/// (`password`, `caller_id_name`, `caller_id_number`, `account_code`).
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the user id is missing or invalid,
/// or if no password is given.
pub fn build_directory_entry(request: &ExtensionRequest) -> Result<DirectoryEntry, CoreError> {
    let user_id = request.user_id.as_deref().map(str::trim).unwrap_or_default();
    validate_user_id(user_id)?;
    let password = request
        .effective_password()
        .ok_or_else(|| CoreError::Validation(String::from("password is required")))?;

    let mut entry = default_entry(user_id);
    entry.params.extend(
        request
            .params
            .iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    entry.variables.extend(
        request
            .variables
            .iter()
            .filter(|(name, _)| !name.is_empty())
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    entry
        .params
        .insert(String::from("password"), password.to_owned());
    let typed = [
        ("effective_caller_id_name", &request.caller_id_name),
        ("effective_caller_id_number", &request.caller_id_number),
        ("accountcode", &request.account_code),
    ];
    for (name, value) in typed {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            entry.variables.insert(name.to_owned(), value.to_owned());
        }
    }

    Ok(entry)
}

fn refuse_existing(directory: &dyn DirectoryStore, entry: &DirectoryEntry) -> Result<(), CoreError> {
    if directory.exists(&entry.user_id)? {
        return Err(CoreError::Validation(format!(
            "user `{}` already exists",
            entry.user_id
        )));
    }
    Ok(())
}

/// Creates users in the directory and reloads the engine.
pub struct Provisioner<C> {
    connector: Arc<C>,
    directory: Arc<dyn DirectoryStore>,
    reload_after_write: bool,
}

impl<C: Connector> Provisioner<C> {
    /// A provisioner writing to `directory` and reloading through `connector`.
    pub fn new(connector: Arc<C>, directory: Arc<dyn DirectoryStore>) -> Self {
        Self {
            connector,
            directory,
            reload_after_write: true,
        }
    }

    /// Whether to issue `reloadxml` after each write (default `true`).
    #[must_use]
    pub const fn with_reload(mut self, reload_after_write: bool) -> Self {
        self.reload_after_write = reload_after_write;
        self
    }

    /// Write a new user and reload the engine's directory.
    ///
    /// A failed reload is logged; the entry stays written and the call
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for a bad request or an existing
    /// user, [`CoreError::Store`] if the store cannot be queried or the
    /// entry cannot be written.
    pub async fn provision(&self, request: &ExtensionRequest) -> Result<ProvisionedUser, CoreError> {
        let entry = build_directory_entry(request)?;
        let directory = Arc::clone(&self.directory);
        let entry = run_blocking(move || {
            refuse_existing(directory.as_ref(), &entry)?;
            directory.write(&entry)?;
            Ok(entry)
        })
        .await?;
        info!(
            user_id = %entry.user_id,
            params = entry.params.len(),
            variables = entry.variables.len(),
            "provisioned user"
        );

        if self.reload_after_write
            && let Err(e) = self.reload().await
        {
            warn!(user_id = %entry.user_id, error = %e, "reloadxml failed after provisioning");
        }

        Ok(ProvisionedUser {
            name: entry.display_name().map(str::to_owned),
            user_id: entry.user_id,
            exists: true,
        })
    }

    /// Report whether `user_id` exists and its display name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for a malformed user id and
    /// [`CoreError::Store`] if the entry cannot be read.
    pub async fn lookup(&self, user_id: &str) -> Result<ProvisionedUser, CoreError> {
        validate_user_id(user_id)?;
        let directory = Arc::clone(&self.directory);
        let id = user_id.to_owned();
        let entry = run_blocking(move || directory.read(&id)).await?;
        Ok(ProvisionedUser {
            user_id: user_id.to_owned(),
            exists: entry.is_some(),
            name: entry.and_then(|e| e.display_name().map(str::to_owned)),
        })
    }

    async fn reload(&self) -> Result<(), CoreError> {
        let command = RELOAD_XML.fixed()?;
        let mut channel = self.connector.connect().await?;
        send_checked(&mut channel, &command).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use callstats_esl::ScriptedConnector;

    use super::*;
    use crate::directory::MemoryDirectoryStore;

    fn provisioner(
        connector: ScriptedConnector,
    ) -> (Provisioner<ScriptedConnector>, Arc<MemoryDirectoryStore>) {
        let store = Arc::new(MemoryDirectoryStore::new());
        let directory: Arc<dyn DirectoryStore> = store.clone();
        (Provisioner::new(Arc::new(connector), directory), store)
    }

    #[test]
    fn minimal_request_gets_every_default() {
        let entry = build_directory_entry(&ExtensionRequest::new("2000", "x")).unwrap();

        assert_eq!(entry.user_id, "2000");
        for (name, value) in DEFAULT_PARAMS {
            assert_eq!(entry.params.get(*name).map(String::as_str), Some(*value));
        }
        for (name, value) in DEFAULT_VARIABLES {
            assert_eq!(entry.variables.get(*name).map(String::as_str), Some(*value));
        }
        assert_eq!(entry.params.get("password").map(String::as_str), Some("x"));
        assert_eq!(entry.variables.get("accountcode").map(String::as_str), Some("2000"));
        assert_eq!(
            entry.variables.get("effective_caller_id_number").map(String::as_str),
            Some("2000")
        );
        assert_eq!(entry.params.len(), DEFAULT_PARAMS.len() + 1);
        assert_eq!(entry.variables.len(), DEFAULT_VARIABLES.len() + 2);
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut request = ExtensionRequest::new("2001", "secret");
        request.caller_id_name = Some(String::from("Front Desk"));
        request.account_code = Some(String::from("sales"));
        request.params.insert(String::from("vm-password"), String::from("9876"));
        request.params.insert(String::from("vm-mailto"), String::from("desk@example.com"));
        request.variables.insert(String::from("user_context"), String::from("internal"));

        let entry = build_directory_entry(&request).unwrap();
        assert_eq!(entry.params["vm-password"], "9876");
        assert_eq!(entry.params["vm-mailto"], "desk@example.com");
        assert_eq!(entry.params["vm-message-ext"], "wav");
        assert_eq!(entry.variables["user_context"], "internal");
        assert_eq!(entry.variables["accountcode"], "sales");
        assert_eq!(entry.display_name(), Some("Front Desk"));
    }

    #[test]
    fn missing_password_is_a_validation_error() {
        let request = ExtensionRequest {
            user_id: Some(String::from("2000")),
            ..ExtensionRequest::default()
        };
        assert!(matches!(
            build_directory_entry(&request),
            Err(CoreError::Validation(_))
        ));

        let empty = ExtensionRequest::new("2000", "");
        assert!(build_directory_entry(&empty).unwrap_err().is_validation());
    }

    #[test]
    fn bad_user_ids_are_validation_errors() {
        for user_id in ["", "  ", "20 00", "2000;reloadxml", "../2000"] {
            let request = ExtensionRequest::new(user_id, "x");
            assert!(
                build_directory_entry(&request).unwrap_err().is_validation(),
                "{user_id:?} should be rejected"
            );
        }
        let request = ExtensionRequest {
            password: Some(String::from("x")),
            ..ExtensionRequest::default()
        };
        assert!(build_directory_entry(&request).unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn provision_then_exists_then_duplicate() {
        let connector = ScriptedConnector::new().respond("reloadxml", "+OK [Success]\n");
        let (provisioner, store) = provisioner(connector.clone());

        let user = provisioner
            .provision(&ExtensionRequest::new("2000", "x"))
            .await
            .unwrap();
        assert!(user.exists);
        assert!(store.exists("2000").unwrap());
        assert_eq!(connector.sent_commands(), vec!["reloadxml"]);

        let duplicate = provisioner
            .provision(&ExtensionRequest::new("2000", "y"))
            .await
            .unwrap_err();
        assert!(matches!(duplicate, CoreError::Validation(_)));
        assert_eq!(connector.sent_commands().len(), 1);
    }

    #[tokio::test]
    async fn failed_reload_still_succeeds() {
        let (provisioner, store) = provisioner(ScriptedConnector::unreachable());
        let user = provisioner
            .provision(&ExtensionRequest::new("3000", "x"))
            .await
            .unwrap();
        assert_eq!(user.user_id, "3000");
        assert!(store.exists("3000").unwrap());
    }

    #[tokio::test]
    async fn reload_can_be_disabled() {
        let connector = ScriptedConnector::new();
        let (provisioner, _store) = provisioner(connector.clone());
        let provisioner = provisioner.with_reload(false);
        provisioner
            .provision(&ExtensionRequest::new("4000", "x"))
            .await
            .unwrap();
        assert!(connector.sent_commands().is_empty());
    }

    #[tokio::test]
    async fn lookup_reports_name_and_existence() {
        let (provisioner, store) = provisioner(ScriptedConnector::new());
        let mut entry = default_entry("1000");
        entry
            .variables
            .insert(String::from("directory_full_name"), String::from("Ada Lovelace"));
        store.write(&entry).unwrap();

        let found = provisioner.lookup("1000").await.unwrap();
        assert!(found.exists);
        assert_eq!(found.name.as_deref(), Some("Ada Lovelace"));

        let missing = provisioner.lookup("1001").await.unwrap();
        assert!(!missing.exists);
        assert_eq!(missing.name, None);

        assert!(provisioner.lookup("10 01").await.unwrap_err().is_validation());
    }
}
