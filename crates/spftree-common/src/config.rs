//! Configuration for spftree

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix, e.g. `SPFTREE__RESOLVER__MAX_DEPTH=5`
pub const ENV_PREFIX: &str = "SPFTREE";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum include depth below the root domain
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Number of DNS lookups above which a tree is flagged (RFC 7208 §4.6.4)
    #[serde(default = "default_lookup_limit")]
    pub lookup_limit: u32,

    /// Timeout for a single DNS query in milliseconds
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,

    /// Wall-clock budget for a whole resolution in milliseconds
    #[serde(default = "default_resolution_timeout")]
    pub resolution_timeout_ms: u64,

    /// Attempts per DNS query before giving up
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    /// Upstream nameservers (`ip` or `ip:port`); empty means system configuration
    #[serde(default)]
    pub nameservers: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            lookup_limit: default_lookup_limit(),
            query_timeout_ms: default_query_timeout(),
            resolution_timeout_ms: default_resolution_timeout(),
            attempts: default_attempts(),
            nameservers: Vec::new(),
        }
    }
}

fn default_max_depth() -> usize {
    10
}

fn default_lookup_limit() -> u32 {
    10
}

fn default_query_timeout() -> u64 {
    5000
}

fn default_resolution_timeout() -> u64 {
    30_000
}

fn default_attempts() -> usize {
    2
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from a single TOML file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default locations, an optional explicit
    /// file and `SPFTREE__*` environment variables, in increasing priority.
    ///
    /// Missing default files are not an error; a missing explicit file is.
    pub fn load(explicit: Option<&Path>) -> crate::Result<Self> {
        let defaults = [
            PathBuf::from("/etc/spftree/config.toml"),
            PathBuf::from("./spftree.toml"),
        ];

        let mut builder = config::Config::builder();
        for path in &defaults {
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }
        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("resolver.nameservers"),
        );

        let config: Config = builder
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| crate::Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the resolver cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.resolver.query_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "resolver.query_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.resolver.resolution_timeout_ms < self.resolver.query_timeout_ms {
            return Err(crate::Error::Config(
                "resolver.resolution_timeout_ms must not be shorter than resolver.query_timeout_ms"
                    .to_string(),
            ));
        }
        if self.resolver.attempts == 0 {
            return Err(crate::Error::Config(
                "resolver.attempts must be at least 1".to_string(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "json" | "text") {
            return Err(crate::Error::Config(format!(
                "logging.format must be \"json\" or \"text\", got {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }
}
