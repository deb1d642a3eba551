//! Daemon configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file,
//! then environment variables. Empty environment values count as unset.
//!
//! ```toml
//! [discord]
//! token = "..."
//! channel_id = "1234"
//! mention_role = "5678"
//!
//! [server]
//! host = "satisfactory.example.net"
//! port = 7777
//! world_name = "Grass Fields"
//!
//! [monitor]
//! poll_interval_secs = 60
//! baseline_on_restart = "preserve"
//!
//! [health]
//! addr = "0.0.0.0:8080"
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ficsit_api::API_PATH;
use ficsit_core::DEFAULT_WORLD_NAME;
use serde::Deserialize;
use thiserror::Error;

/// Default dedicated server API port.
pub const DEFAULT_SERVER_PORT: u16 = 7777;

/// Default delay between two polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default bound on every outbound HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default health endpoint bind address.
pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8080";

/// Default Discord REST API base URL.
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

// ============================================================================
// Environment Variables
// ============================================================================

pub const ENV_DISCORD_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const ENV_DISCORD_CHANNEL: &str = "DISCORD_CHANNEL";
pub const ENV_DISCORD_ROLE: &str = "DISCORD_ROLE";
pub const ENV_DISCORD_API_BASE: &str = "DISCORD_API_BASE";
pub const ENV_SERVER_HOST: &str = "SATISFACTORY_IP";
pub const ENV_SERVER_PORT: &str = "SATISFACTORY_PORT";
pub const ENV_SERVER_TOKEN: &str = "SATISFACTORY_TOKEN";
pub const ENV_ACCEPT_INVALID_CERTS: &str = "SATISFACTORY_ACCEPT_INVALID_CERTS";
pub const ENV_WORLD_NAME: &str = "WORLD_NAME";
pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECS";
pub const ENV_REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT_SECS";
pub const ENV_NOTIFY_ON_FIRST_POLL: &str = "NOTIFY_ON_FIRST_POLL";
pub const ENV_BASELINE_ON_RESTART: &str = "BASELINE_ON_RESTART";
pub const ENV_HEALTH_ADDR: &str = "HEALTH_ADDR";

// ============================================================================
// Resolved Configuration
// ============================================================================

/// Where the game server API lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token for the server API
    pub token: Option<String>,
    /// Dedicated servers ship self-signed certificates
    pub accept_invalid_certs: bool,
    pub request_timeout: Duration,
    /// World name used in messages
    pub world_name: String,
}

impl ServerConfig {
    /// Full URL of the API endpoint.
    ///
    /// IPv6 literals are bracketed.
    pub fn endpoint(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("https://[{}]:{}{}", self.host, self.port, API_PATH)
        } else {
            format!("https://{}:{}{}", self.host, self.port, API_PATH)
        }
    }
}

/// Discord bot settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DiscordConfig {
    pub token: String,
    pub channel_id: String,
    pub mention_role: Option<String>,
    pub api_base: String,
}

// Keeps the bot token out of logs.
impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("channel_id", &self.channel_id)
            .field("mention_role", &self.mention_role)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// What a restarted poll loop starts from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineOnRestart {
    /// Resume from the last committed occupancy
    #[default]
    Preserve,
    /// Start from the unknown sentinel; the first poll only re-establishes the baseline
    Reset,
}

impl FromStr for BaselineOnRestart {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "reset" => Ok(Self::Reset),
            _ => Err(()),
        }
    }
}

/// Poll loop behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// Announce a populated server on the very first poll
    pub notify_on_first_poll: bool,
    pub baseline_on_restart: BaselineOnRestart,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            notify_on_first_poll: false,
            baseline_on_restart: BaselineOnRestart::Preserve,
        }
    }
}

/// Everything `ficsitd start` needs.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub server: ServerConfig,
    pub discord: DiscordConfig,
    pub poll: PollSettings,
    pub health_addr: SocketAddr,
}

// ============================================================================
// File Layer
// ============================================================================

/// Raw TOML file contents. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub discord: DiscordSection,
    pub server: ServerSection,
    pub monitor: MonitorSection,
    pub health: HealthSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscordSection {
    pub token: Option<String>,
    pub channel_id: Option<String>,
    pub mention_role: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub token: Option<String>,
    pub accept_invalid_certs: Option<bool>,
    pub world_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorSection {
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub notify_on_first_poll: Option<bool>,
    pub baseline_on_restart: Option<BaselineOnRestart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthSection {
    pub addr: Option<String>,
}

impl FileConfig {
    /// Reads and parses a TOML config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Resolves settings from a file layer and an environment lookup.
///
/// The lookup is injectable so tests never touch the process environment.
pub struct ConfigLoader<E> {
    file: FileConfig,
    env: E,
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl ConfigLoader<fn(&str) -> Option<String>> {
    /// Loader backed by the process environment and an optional file.
    pub fn from_process(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => FileConfig::from_path(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::new(file, process_env))
    }
}

impl<E> ConfigLoader<E>
where
    E: Fn(&str) -> Option<String>,
{
    pub fn new(file: FileConfig, env: E) -> Self {
        Self { file, env }
    }

    /// Non-empty, trimmed environment value.
    fn var(&self, key: &str) -> Option<String> {
        (self.env)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Environment value parsed as `T`, falling back to the file value.
    fn parsed<T: FromStr>(
        &self,
        key: &'static str,
        file_value: Option<T>,
        expected: &'static str,
    ) -> Result<Option<T>, ConfigError> {
        match self.var(key) {
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::Invalid {
                    key,
                    value: raw,
                    expected,
                }),
            None => Ok(file_value),
        }
    }

    fn flag(&self, key: &'static str, file_value: Option<bool>) -> Result<Option<bool>, ConfigError> {
        match self.var(key) {
            Some(raw) => parse_bool(&raw).map(Some).ok_or(ConfigError::Invalid {
                key,
                value: raw,
                expected: "a boolean (true/false)",
            }),
            None => Ok(file_value),
        }
    }

    fn string(&self, key: &'static str, file_value: &Option<String>) -> Option<String> {
        self.var(key).or_else(|| {
            file_value
                .as_ref()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
    }

    /// Game server settings. Enough for the on-demand query.
    pub fn server(&self) -> Result<ServerConfig, ConfigError> {
        let section = &self.file.server;

        let host = self
            .string(ENV_SERVER_HOST, &section.host)
            .ok_or(ConfigError::Missing { key: ENV_SERVER_HOST })?;
        let port = self
            .parsed(ENV_SERVER_PORT, section.port, "a TCP port")?
            .unwrap_or(DEFAULT_SERVER_PORT);
        let accept_invalid_certs = self
            .flag(ENV_ACCEPT_INVALID_CERTS, section.accept_invalid_certs)?
            .unwrap_or(true);
        let timeout_secs = self
            .parsed(
                ENV_REQUEST_TIMEOUT,
                self.file.monitor.request_timeout_secs,
                "a number of seconds",
            )?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT.as_secs());
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_REQUEST_TIMEOUT,
                value: "0".to_string(),
                expected: "a positive number of seconds",
            });
        }

        Ok(ServerConfig {
            host,
            port,
            token: self.string(ENV_SERVER_TOKEN, &section.token),
            accept_invalid_certs,
            request_timeout: Duration::from_secs(timeout_secs),
            world_name: self
                .string(ENV_WORLD_NAME, &section.world_name)
                .unwrap_or_else(|| DEFAULT_WORLD_NAME.to_string()),
        })
    }

    /// Discord bot settings.
    pub fn discord(&self) -> Result<DiscordConfig, ConfigError> {
        let section = &self.file.discord;

        let token = self
            .string(ENV_DISCORD_TOKEN, &section.token)
            .ok_or(ConfigError::Missing { key: ENV_DISCORD_TOKEN })?;
        let channel_id = self
            .string(ENV_DISCORD_CHANNEL, &section.channel_id)
            .ok_or(ConfigError::Missing { key: ENV_DISCORD_CHANNEL })?;
        let api_base = self
            .string(ENV_DISCORD_API_BASE, &section.api_base)
            .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string());

        Ok(DiscordConfig {
            token,
            channel_id,
            mention_role: self.string(ENV_DISCORD_ROLE, &section.mention_role),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Poll loop settings.
    pub fn poll(&self) -> Result<PollSettings, ConfigError> {
        let section = &self.file.monitor;

        let interval_secs = self
            .parsed(ENV_POLL_INTERVAL, section.poll_interval_secs, "a number of seconds")?
            .unwrap_or(DEFAULT_POLL_INTERVAL.as_secs());
        if interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: ENV_POLL_INTERVAL,
                value: "0".to_string(),
                expected: "a positive number of seconds",
            });
        }

        let baseline_on_restart = match self.var(ENV_BASELINE_ON_RESTART) {
            Some(raw) => raw.parse::<BaselineOnRestart>().map_err(|_| ConfigError::Invalid {
                key: ENV_BASELINE_ON_RESTART,
                value: raw,
                expected: "`preserve` or `reset`",
            })?,
            None => section.baseline_on_restart.unwrap_or_default(),
        };

        Ok(PollSettings {
            interval: Duration::from_secs(interval_secs),
            notify_on_first_poll: self
                .flag(ENV_NOTIFY_ON_FIRST_POLL, section.notify_on_first_poll)?
                .unwrap_or(false),
            baseline_on_restart,
        })
    }

    /// Health endpoint bind address.
    pub fn health_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = self
            .string(ENV_HEALTH_ADDR, &self.file.health.addr)
            .unwrap_or_else(|| DEFAULT_HEALTH_ADDR.to_string());
        raw.parse().map_err(|_| ConfigError::Invalid {
            key: ENV_HEALTH_ADDR,
            value: raw,
            expected: "a socket address (ip:port)",
        })
    }

    /// Full daemon configuration.
    pub fn monitor(&self) -> Result<MonitorConfig, ConfigError> {
        Ok(MonitorConfig {
            server: self.server()?,
            discord: self.discord()?,
            poll: self.poll()?,
            health_addr: self.health_addr()?,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {key}")]
    Missing { key: &'static str },

    #[error("Invalid value for {key}: {value:?} (expected {expected})")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Failed to read config file {path}: {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to parse config file {path}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Discord rejected the bot token (status {status})")]
    CredentialRejected { status: u16 },

    #[error("Failed to verify the Discord bot token: {reason}")]
    CredentialCheck { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn loader(vars: &[(&str, &str)]) -> ConfigLoader<impl Fn(&str) -> Option<String>> {
        loader_with_file(FileConfig::default(), vars)
    }

    fn loader_with_file(
        file: FileConfig,
        vars: &[(&str, &str)],
    ) -> ConfigLoader<impl Fn(&str) -> Option<String>> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigLoader::new(file, move |key: &str| vars.get(key).cloned())
    }

    const REQUIRED: &[(&str, &str)] = &[
        (ENV_DISCORD_TOKEN, "bot-token"),
        (ENV_DISCORD_CHANNEL, "1234"),
        (ENV_SERVER_HOST, "10.0.0.5"),
    ];

    #[test]
    fn test_defaults() {
        let config = loader(REQUIRED).monitor().unwrap();
        assert_eq!(config.server.host, "10.0.0.5");
        assert_eq!(config.server.port, DEFAULT_SERVER_PORT);
        assert!(config.server.token.is_none());
        assert!(config.server.accept_invalid_certs);
        assert_eq!(config.server.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.server.world_name, DEFAULT_WORLD_NAME);
        assert_eq!(config.discord.api_base, DEFAULT_DISCORD_API_BASE);
        assert!(config.discord.mention_role.is_none());
        assert_eq!(config.poll, PollSettings::default());
        assert_eq!(config.health_addr, "0.0.0.0:8080".parse().unwrap());
    }

    #[test]
    fn test_endpoint() {
        let server = loader(&[(ENV_SERVER_HOST, "example.net"), (ENV_SERVER_PORT, "15000")])
            .server()
            .unwrap();
        assert_eq!(server.endpoint(), "https://example.net:15000/api/v1");
    }

    #[test]
    fn test_endpoint_brackets_ipv6() {
        let server = loader(&[(ENV_SERVER_HOST, "::1")]).server().unwrap();
        assert_eq!(server.endpoint(), "https://[::1]:7777/api/v1");

        let server = loader(&[(ENV_SERVER_HOST, "[fd00::5]")]).server().unwrap();
        assert_eq!(server.endpoint(), "https://[fd00::5]:7777/api/v1");
    }

    #[test]
    fn test_missing_required() {
        let err = loader(&[(ENV_SERVER_HOST, "h")]).monitor().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: ENV_DISCORD_TOKEN }));

        let err = loader(&[]).server().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: ENV_SERVER_HOST }));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let mut vars = REQUIRED.to_vec();
        vars.push((ENV_DISCORD_ROLE, "   "));
        vars.push((ENV_SERVER_TOKEN, ""));
        let config = loader(&vars).monitor().unwrap();
        assert!(config.discord.mention_role.is_none());
        assert!(config.server.token.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = REQUIRED.to_vec();
        vars.push((ENV_SERVER_PORT, "not-a-port"));
        assert!(matches!(
            loader(&vars).monitor(),
            Err(ConfigError::Invalid { key: ENV_SERVER_PORT, .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push((ENV_POLL_INTERVAL, "0"));
        assert!(matches!(
            loader(&vars).monitor(),
            Err(ConfigError::Invalid { key: ENV_POLL_INTERVAL, .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push((ENV_BASELINE_ON_RESTART, "sometimes"));
        assert!(loader(&vars).poll().is_err());

        let mut vars = REQUIRED.to_vec();
        vars.push((ENV_NOTIFY_ON_FIRST_POLL, "maybe"));
        assert!(loader(&vars).poll().is_err());
    }

    #[test]
    fn test_poll_overrides() {
        let loader = loader(&[
            (ENV_POLL_INTERVAL, "15"),
            (ENV_NOTIFY_ON_FIRST_POLL, "yes"),
            (ENV_BASELINE_ON_RESTART, "Reset"),
        ]);
        let poll = loader.poll().unwrap();
        assert_eq!(poll.interval, Duration::from_secs(15));
        assert!(poll.notify_on_first_poll);
        assert_eq!(poll.baseline_on_restart, BaselineOnRestart::Reset);
    }

    #[test]
    fn test_file_layer_with_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[discord]
token = "file-token"
channel_id = "99"
mention_role = "<@&77>"
api_base = "http://localhost:9000/api/"

[server]
host = "file-host"
port = 15777
accept_invalid_certs = false
world_name = "Northern Forest"

[monitor]
poll_interval_secs = 30
baseline_on_restart = "reset"
"#
        )
        .unwrap();

        let file_config = FileConfig::from_path(file.path()).unwrap();
        let config = loader_with_file(file_config, &[(ENV_SERVER_HOST, "env-host")])
            .monitor()
            .unwrap();

        assert_eq!(config.server.host, "env-host");
        assert_eq!(config.server.port, 15777);
        assert!(!config.server.accept_invalid_certs);
        assert_eq!(config.server.world_name, "Northern Forest");
        assert_eq!(config.discord.token, "file-token");
        assert_eq!(config.discord.mention_role.as_deref(), Some("<@&77>"));
        assert_eq!(config.discord.api_base, "http://localhost:9000/api");
        assert_eq!(config.poll.interval, Duration::from_secs(30));
        assert_eq!(config.poll.baseline_on_restart, BaselineOnRestart::Reset);
    }

    #[test]
    fn test_file_errors() {
        let err = FileConfig::from_path(Path::new("/nonexistent/ficsit.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[server]\nhostname = \"typo\"\n").unwrap();
        let err = FileConfig::from_path(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_discord_debug_redacts_token() {
        let config = loader(REQUIRED).discord().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("bot-token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
