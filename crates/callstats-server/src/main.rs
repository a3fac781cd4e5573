//! Callstats server binary.
//!
//! Wires the event-socket connector, the queue registry, the directory
//! store and the services into the HTTP API, then serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `callstats-config.yaml` (or the file named
//!    by `CALLSTATS_CONFIG`), with environment overrides
//! 2. Initialize structured logging (tracing)
//! 3. Resolve the access key source
//! 4. Build the queue registry, discovering queues from the engine if asked
//! 5. Build the services and serve the API

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use callstats_api::{AppState, CredentialStore, start_server};
use callstats_core::config::{CallstatsConfig, LogFormat, LoggingConfig};
use callstats_core::directory::{DirectoryStore, XmlDirectoryStore};
use callstats_core::monitor::MonitorService;
use callstats_core::provision::Provisioner;
use callstats_core::queues::QueueService;
use callstats_core::registry::{QueueRegistry, StaticQueueRegistry, discover_queues};
use callstats_esl::EslConnector;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::LaunchError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "callstats-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, no access key is
/// configured, or the HTTP server cannot bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("callstats-server starting");
    info!(
        esl_host = %config.esl.host,
        esl_port = config.esl.port,
        esl_timeout_ms = config.esl.timeout_ms,
        domain = %config.callcenter.domain,
        queues = config.callcenter.queues.len(),
        directory = %config.provisioning.directory.display(),
        "Configuration loaded"
    );

    // 3. Access key source.
    let credentials = credential_store(&config)?;

    // 4. Queue registry.
    let connector = Arc::new(EslConnector::new(config.esl.to_client_config()));
    let commands = config.callcenter.schemas.command_set();
    let mut registry = StaticQueueRegistry::new(config.callcenter.queues.clone());
    if config.callcenter.discover_queues {
        match discover_queues(connector.as_ref(), &commands, &config.callcenter.domain).await {
            Ok(found) => registry = registry.extended(found),
            Err(e) => warn!(error = %e, "queue discovery failed; using configured queues only"),
        }
    }
    if registry.is_empty() {
        warn!("no queues registered; every queue endpoint will refuse its queue name");
    }
    info!(queues = ?registry.names(), "Queue registry ready");

    // 5. Services and HTTP server.
    let directory: Arc<dyn DirectoryStore> =
        Arc::new(XmlDirectoryStore::new(config.provisioning.directory.clone()));
    let queues = QueueService::new(
        Arc::clone(&connector),
        Arc::new(registry),
        Arc::clone(&directory),
        commands.clone(),
        config.callcenter.domain.clone(),
    );
    let monitor = MonitorService::new(Arc::clone(&connector), commands);
    let provisioner = Provisioner::new(connector, directory)
        .with_reload(config.provisioning.reload_after_write);

    let state = AppState::new(queues, monitor, provisioner, credentials)
        .with_features(config.features);
    start_server(&config.server, Arc::new(state))
        .await
        .map_err(LaunchError::from)?;

    Ok(())
}

/// Load configuration from the config file, or defaults if it is absent.
///
/// Environment overrides apply in both cases.
fn load_config() -> Result<CallstatsConfig, LaunchError> {
    let path = std::env::var("CALLSTATS_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        return Ok(CallstatsConfig::from_file(&path)?);
    }

    let mut config = CallstatsConfig::default();
    config.apply_overrides(|name| std::env::var(name).ok())?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

fn credential_store(config: &CallstatsConfig) -> Result<CredentialStore, LaunchError> {
    if let Some(path) = &config.auth.key_file {
        if !Path::new(path).exists() {
            warn!(path = %path.display(), "credential file does not exist yet; requests will fail until it does");
        }
        return Ok(CredentialStore::File(path.clone()));
    }
    if let Some(key) = config.auth.access_key.as_ref().filter(|k| !k.is_empty()) {
        return Ok(CredentialStore::Static(key.clone()));
    }
    Err(LaunchError::Credentials {
        message: String::from(
            "set auth.key_file (or CALLSTATS_AUTH_FILE) or auth.access_key",
        ),
    })
}
