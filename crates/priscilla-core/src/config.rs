use std::path::Path;

use figment::{
    providers::{Env, Format, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{PriscillaError, Result};

// Wire protocol constants
pub const DEFAULT_PORT: u16 = 4517;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PREFIX: &str = "pris";
pub const DEFAULT_HELP_COMMAND: &str = "help";
pub const DEFAULT_LOG_LEVEL: &str = "warn";
/// Reserved connection id the broker itself uses as `source`.
pub const SERVER_ID: &str = "server";
pub const MAX_FRAME_BYTES: usize = 1024 * 1024; // 1 MB buffered without a complete envelope
pub const REQUEST_CHANNEL_CAPACITY: usize = 1024;
pub const ENGAGE_MAX_SKEW_SECS: i64 = 60; // engage `time` must be within a minute of ours
pub const DEFAULT_INVOKE_TIMEOUT_SECS: u64 = 30;
pub const MAX_INVOKE_TIMEOUT_SECS: u64 = 300;

/// Top-level broker config (priscilla.yml + PRISCILLA_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PriscillaConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub ip: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Extra command prefixes accepted alongside `prefix`.
    #[serde(default, alias = "prefix-alit")]
    pub prefix_alt: Vec<String>,
    #[serde(default = "default_help_command")]
    pub help_command: String,
    /// Shared secret engagement credentials are signed with. Empty disables the check.
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_log_level")]
    pub loglevel: String,
    /// Log destination; empty or `STDOUT` logs to stdout.
    #[serde(default)]
    pub logfile: String,
    #[serde(default)]
    pub responders: RespondersConfig,
}

impl Default for PriscillaConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            ip: DEFAULT_BIND.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            prefix_alt: Vec::new(),
            help_command: DEFAULT_HELP_COMMAND.to_string(),
            secret: String::new(),
            loglevel: DEFAULT_LOG_LEVEL.to_string(),
            logfile: String::new(),
            responders: RespondersConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RespondersConfig {
    #[serde(default)]
    pub passive: Vec<PassiveResponderDef>,
}

/// One statically configured responder, as written in the config file.
///
/// Compiled into matchers at startup by `priscilla-responders`; nothing here
/// is validated beyond what serde enforces.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct PassiveResponderDef {
    pub name: String,
    #[serde(default, rename = "match")]
    pub matches: Vec<String>,
    #[serde(default, rename = "mentionmatch")]
    pub mention_match: Vec<String>,
    #[serde(default)]
    pub noprefix: bool,
    #[serde(default)]
    pub fallthrough: bool,
    #[serde(default)]
    pub cmd: String,
    /// Argument template; `__N__` and `__room__` are substituted per invocation.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub help_commands: Vec<String>,
    #[serde(default)]
    pub help_mention_commands: Vec<String>,
    /// Seconds the command may run before it is killed.
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl PassiveResponderDef {
    /// Invocation timeout clamped to [`MAX_INVOKE_TIMEOUT_SECS`].
    pub fn effective_timeout_secs(&self) -> u64 {
        self.timeout
            .unwrap_or(DEFAULT_INVOKE_TIMEOUT_SECS)
            .clamp(1, MAX_INVOKE_TIMEOUT_SECS)
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}
fn default_help_command() -> String {
    DEFAULT_HELP_COMMAND.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl PriscillaConfig {
    /// Load config from a YAML (or `.toml`) file with PRISCILLA_* env var overrides.
    ///
    /// A missing file is an error: the broker has no useful behaviour without
    /// its responder definitions.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PriscillaError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let figment = if is_toml {
            Figment::new().merge(Toml::file(path))
        } else {
            Figment::new().merge(Yaml::file(path))
        };

        let config: PriscillaConfig = figment
            .merge(Env::prefixed("PRISCILLA_").split("__"))
            .extract()
            .map_err(|e| PriscillaError::Config(e.to_string()))?;

        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// `ip:port` string for the TCP listener.
    pub fn listen_addr(&self) -> String {
        let ip = if self.ip.trim().is_empty() {
            DEFAULT_BIND
        } else {
            self.ip.trim()
        };
        let port = if self.port == 0 { DEFAULT_PORT } else { self.port };
        format!("{}:{}", ip, port)
    }
}
