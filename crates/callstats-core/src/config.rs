//! Configuration loading and typed config structures for callstats.
//!
//! The configuration lives in `callstats-config.yaml`. It is read once at
//! startup into [`CallstatsConfig`] and handed to each component; nothing
//! reads configuration after that. Every field has a default, so an empty
//! file (or no file) is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use callstats_esl::{CommandSet, EslConfig};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held a value of the wrong type.
    #[error("invalid value for {name}: {reason}")]
    Env {
        /// The environment variable.
        name: String,
        /// Why the value was refused.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `callstats-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallstatsConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: HttpConfig,

    /// Event socket connection.
    #[serde(default)]
    pub esl: EslSettings,

    /// Call-center queues and command schemas.
    #[serde(default)]
    pub callcenter: CallcenterConfig,

    /// Provisioning store location.
    #[serde(default)]
    pub provisioning: ProvisioningConfig,

    /// Access key source.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Route groups to expose.
    #[serde(default)]
    pub features: FeatureFlags,

    /// Log level and format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CallstatsConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// Recognised variables: `CALLSTATS_HOST`, `CALLSTATS_PORT`, `ESL_HOST`,
    /// `ESL_PORT`, `ESL_PASSWORD`, `CALLSTATS_AUTH_FILE`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Env`] if an override does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a port override is not a number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("CALLSTATS_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("CALLSTATS_PORT") {
            self.server.port = parse_port("CALLSTATS_PORT", &val)?;
        }
        if let Some(val) = lookup("ESL_HOST") {
            self.esl.host = val;
        }
        if let Some(val) = lookup("ESL_PORT") {
            self.esl.port = parse_port("ESL_PORT", &val)?;
        }
        if let Some(val) = lookup("ESL_PASSWORD") {
            self.esl.password = val;
        }
        if let Some(val) = lookup("CALLSTATS_AUTH_FILE") {
            self.auth.key_file = Some(PathBuf::from(val));
        }
        Ok(())
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse().map_err(|e| ConfigError::Env {
        name: name.to_owned(),
        reason: format!("{e}"),
    })
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Address to bind.
    #[serde(default = "default_http_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
        }
    }
}

/// Event socket configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EslSettings {
    /// Engine host.
    #[serde(default = "default_esl_host")]
    pub host: String,

    /// Event socket port.
    #[serde(default = "default_esl_port")]
    pub port: u16,

    /// Event socket password.
    #[serde(default = "default_esl_password")]
    pub password: String,

    /// Bound on connect, handshake and each command, in milliseconds.
    #[serde(default = "default_esl_timeout_ms")]
    pub timeout_ms: u64,
}

impl EslSettings {
    /// Convert to the client's connection settings.
    pub fn to_client_config(&self) -> EslConfig {
        EslConfig {
            host: self.host.clone(),
            port: self.port,
            password: self.password.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }
}

impl Default for EslSettings {
    fn default() -> Self {
        Self {
            host: default_esl_host(),
            port: default_esl_port(),
            password: default_esl_password(),
            timeout_ms: default_esl_timeout_ms(),
        }
    }
}

/// Call-center configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallcenterConfig {
    /// Domain appended to queue names in commands (`<queue>@<domain>`).
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Registered queue names, without the domain.
    #[serde(default)]
    pub queues: Vec<String>,

    /// Also register the queues the engine reports at startup.
    #[serde(default)]
    pub discover_queues: bool,

    /// Per-command column overrides.
    #[serde(default)]
    pub schemas: SchemaOverrides,
}

impl Default for CallcenterConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            queues: Vec::new(),
            discover_queues: false,
            schemas: SchemaOverrides::default(),
        }
    }
}

/// Column lists replacing the default schema of a table command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SchemaOverrides {
    /// Columns of `callcenter_config queue list`.
    #[serde(default)]
    pub queues: Option<Vec<String>>,
    /// Columns of `callcenter_config queue list agents`.
    #[serde(default)]
    pub agents: Option<Vec<String>>,
    /// Columns of `callcenter_config queue list tiers`.
    #[serde(default)]
    pub tiers: Option<Vec<String>>,
    /// Columns of `callcenter_config queue list members`.
    #[serde(default)]
    pub members: Option<Vec<String>>,
    /// Columns of `show calls`.
    #[serde(default)]
    pub calls: Option<Vec<String>>,
    /// Columns of `show channels`.
    #[serde(default)]
    pub channels: Option<Vec<String>>,
}

impl SchemaOverrides {
    /// The default command set with these overrides applied.
    pub fn command_set(&self) -> CommandSet {
        let mut set = CommandSet::default();
        let slots = [
            (&mut set.queues, &self.queues),
            (&mut set.agents, &self.agents),
            (&mut set.tiers, &self.tiers),
            (&mut set.members, &self.members),
            (&mut set.calls, &self.calls),
            (&mut set.channels, &self.channels),
        ];
        for (command, columns) in slots {
            if let Some(columns) = columns {
                command.set_columns(columns.clone());
            }
        }
        set
    }
}

/// Provisioning store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProvisioningConfig {
    /// Directory holding one `<user_id>.xml` per provisioned user.
    #[serde(default = "default_directory_path")]
    pub directory: PathBuf,

    /// Issue `reloadxml` after writing an entry.
    #[serde(default = "default_true")]
    pub reload_after_write: bool,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            directory: default_directory_path(),
            reload_after_write: true,
        }
    }
}

/// Access key configuration.
///
/// `key_file` wins over `access_key` when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// Flat JSON credential file (`{"key": "..."}`), re-read per request.
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// Inline access key.
    #[serde(default)]
    pub access_key: Option<String>,
}

/// Route groups to expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct FeatureFlags {
    /// `/queues/...` call-center routes.
    #[serde(default = "default_true")]
    pub callcenter: bool,

    /// `/monitor/...` status routes.
    #[serde(default = "default_true")]
    pub monitor: bool,

    /// `/users` provisioning routes.
    #[serde(default = "default_true")]
    pub users: bool,

    /// `/calls/...` call control routes.
    #[serde(default)]
    pub calls: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            callcenter: true,
            monitor: true,
            users: true,
            calls: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_http_host() -> String {
    String::from("0.0.0.0")
}

const fn default_http_port() -> u16 {
    8080
}

fn default_esl_host() -> String {
    String::from("127.0.0.1")
}

const fn default_esl_port() -> u16 {
    8021
}

fn default_esl_password() -> String {
    String::from("ClueCon")
}

const fn default_esl_timeout_ms() -> u64 {
    5000
}

fn default_domain() -> String {
    String::from("default")
}

fn default_directory_path() -> PathBuf {
    PathBuf::from("/etc/freeswitch/directory/default")
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_true() -> bool {
    true
}
