//! Configuration parsing and validation for groq-relay.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;
use std::time::Duration;

/// Fixed upstream chat completion endpoint.
pub const DEFAULT_UPSTREAM_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Environment variable holding the upstream credential.
pub const API_KEY_ENV_VAR: &str = "GROQ_API_KEY";

/// Upper bound on every upstream call, streaming or not.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8000")
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Resolved upstream configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Full chat completions URL
    pub url: String,
    /// Bearer credential injected into every upstream request
    pub api_key: ApiKey,
    /// Total time budget for one upstream call
    pub timeout: Duration,
}

impl UpstreamConfig {
    /// Upstream config for the default endpoint and timeout.
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// How the upstream API key was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum KeySource {
    /// Key was a literal string in the config file
    Literal,
    /// Key contained ${VAR} references expanded from environment
    EnvExpanded,
    /// Key was read from the named environment variable
    Environment(String),
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Literal => write!(f, "config-literal"),
            KeySource::EnvExpanded => write!(f, "env-expanded"),
            KeySource::Environment(var) => write!(f, "environment ({})", var),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' could not be expanded: {message}")]
    EnvVar { var: String, message: String },

    #[error("{var} is not set; refusing to start without an upstream API key")]
    MissingApiKey { var: String },
}

/// Raw upstream section as written in TOML.
/// `api_key` may contain `${VAR}` references not yet expanded.
#[derive(Debug, Deserialize)]
pub struct RawUpstreamConfig {
    #[serde(default = "default_upstream_url")]
    url: String,
    api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for RawUpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Raw configuration deserialized directly from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    upstream: RawUpstreamConfig,
}

impl RawConfig {
    /// Read and parse a TOML config file without resolving secrets.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse a TOML string without resolving secrets.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// Supports multiple `${VAR}` in one string. Fails on the first missing
/// variable, unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(input: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            message: "unclosed '${' in config value".to_string(),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                message: "empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            message: "variable is not set".to_string(),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

impl Config {
    /// Load configuration from an optional TOML file plus the process environment.
    ///
    /// With no file, every setting takes its default and the key comes from
    /// `GROQ_API_KEY`.
    pub fn load(path: Option<&Path>) -> Result<(Self, KeySource), ConfigError> {
        let raw = match path {
            Some(path) => RawConfig::from_file(path)?,
            None => RawConfig::default(),
        };
        Self::from_raw(raw)
    }

    /// Resolve a raw config against the process environment.
    pub fn from_raw(raw: RawConfig) -> Result<(Self, KeySource), ConfigError> {
        Self::from_raw_with(raw, |name| std::env::var(name).ok())
    }

    /// Resolve a raw config with an injected environment lookup.
    ///
    /// - `api_key` containing `${VAR}`: expanded, source = `EnvExpanded`
    /// - literal `api_key`: used as-is, source = `Literal`
    /// - no `api_key`: read `GROQ_API_KEY`, source = `Environment`
    ///
    /// An empty resolved key is treated the same as a missing one.
    pub fn from_raw_with<F>(raw: RawConfig, lookup: F) -> Result<(Self, KeySource), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (api_key, source) = match raw.upstream.api_key {
            Some(ref raw_key) if raw_key.contains("${") => {
                (expand_env_vars_with(raw_key, &lookup)?, KeySource::EnvExpanded)
            }
            Some(raw_key) => (raw_key, KeySource::Literal),
            None => (
                lookup(API_KEY_ENV_VAR).unwrap_or_default(),
                KeySource::Environment(API_KEY_ENV_VAR.to_string()),
            ),
        };

        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey {
                var: API_KEY_ENV_VAR.to_string(),
            });
        }

        let config = Config {
            server: raw.server,
            upstream: UpstreamConfig {
                url: raw.upstream.url,
                api_key: ApiKey::from(api_key),
                timeout: Duration::from_secs(raw.upstream.timeout_secs),
            },
        };
        config.validate()?;

        Ok((config, source))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.upstream.url;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "Upstream URL '{}' must be an http(s) URL",
                url
            )));
        }

        if !url.starts_with("https://") {
            tracing::warn!(url = %url, "Upstream URL is not HTTPS - credential sent in clear text");
        }

        if self.upstream.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "upstream.timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_with_env_key() {
        let (config, source) = Config::from_raw_with(RawConfig::default(), |name| {
            (name == "GROQ_API_KEY").then(|| "gsk-test".to_string())
        })
        .unwrap();

        assert_eq!(config.server.listen, "0.0.0.0:8000");
        assert_eq!(config.upstream.url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.upstream.timeout, Duration::from_secs(60));
        assert_eq!(config.upstream.api_key.expose_secret(), "gsk-test");
        assert_eq!(source, KeySource::Environment("GROQ_API_KEY".to_string()));
    }

    #[test]
    fn test_missing_key_fails() {
        let err = Config::from_raw_with(RawConfig::default(), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey { .. }));
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }

    #[test]
    fn test_empty_key_fails() {
        let err = Config::from_raw_with(RawConfig::default(), |_| Some(String::new())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey { .. }));
    }

    #[test]
    fn test_parse_full_config() {
        let raw = RawConfig::parse_str(
            r#"
[server]
listen = "127.0.0.1:9000"

[upstream]
url = "https://example.test/v1/chat/completions"
api_key = "literal-key"
timeout_secs = 15
"#,
        )
        .unwrap();

        let (config, source) = Config::from_raw_with(raw, no_env).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9000");
        assert_eq!(config.upstream.url, "https://example.test/v1/chat/completions");
        assert_eq!(config.upstream.timeout, Duration::from_secs(15));
        assert_eq!(config.upstream.api_key.expose_secret(), "literal-key");
        assert_eq!(source, KeySource::Literal);
    }

    #[test]
    fn test_expanded_key() {
        let raw = RawConfig::parse_str(
            r#"
[upstream]
api_key = "${MY_GROQ_KEY}"
"#,
        )
        .unwrap();

        let (config, source) = Config::from_raw_with(raw, |name| {
            (name == "MY_GROQ_KEY").then(|| "expanded".to_string())
        })
        .unwrap();
        assert_eq!(config.upstream.api_key.expose_secret(), "expanded");
        assert_eq!(source, KeySource::EnvExpanded);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let raw = RawConfig::parse_str(
            r#"
[upstream]
api_key = "k"
timeout_secs = 0
"#,
        )
        .unwrap();

        let err = Config::from_raw_with(raw, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_non_http_url_rejected() {
        let raw = RawConfig::parse_str(
            r#"
[upstream]
url = "ftp://example.test"
api_key = "k"
"#,
        )
        .unwrap();

        let err = Config::from_raw_with(raw, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_api_key_debug_redaction() {
        let key = ApiKey::from("gsk-secret");
        assert_eq!(format!("{:?}", key), "[REDACTED]");
        assert_eq!(format!("{}", key), "[REDACTED]");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"[REDACTED]\"");
    }

    #[test]
    fn test_upstream_config_debug_redaction() {
        let upstream = UpstreamConfig::new("gsk-secret");
        let debug = format!("{:?}", upstream);
        assert!(!debug.contains("gsk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_expand_multiple_vars() {
        let lookup = |name: &str| match name {
            "A" => Some("one".to_string()),
            "B" => Some("two".to_string()),
            _ => None,
        };
        assert_eq!(expand_env_vars_with("${A}-${B}", &lookup).unwrap(), "one-two");
    }

    #[test]
    fn test_expand_no_vars_passthrough() {
        assert_eq!(expand_env_vars_with("plain$key", &no_env).unwrap(), "plain$key");
    }

    #[test]
    fn test_expand_missing_var_fails() {
        let err = expand_env_vars_with("${NOPE}", &no_env).unwrap_err();
        match err {
            ConfigError::EnvVar { var, .. } => assert_eq!(var, "NOPE"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_expand_unclosed_brace_fails() {
        assert!(expand_env_vars_with("${OPEN", &no_env).is_err());
    }

    #[test]
    fn test_expand_empty_var_name_fails() {
        assert!(expand_env_vars_with("${}", &no_env).is_err());
    }
}
