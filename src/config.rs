// ABOUTME: Configuration - settings resolved once from an ordered list of env sources,
// ABOUTME: and the typed SessionConfig that describes how to reach one MCP server.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{McpError, McpResult};
use crate::protocol::LATEST_PROTOCOL_VERSION;

/// Default bound on every blocking exchange with a server.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a setting may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvSource {
    /// The process environment.
    Process,
    /// A dotenv-style file. Skipped when it does not exist.
    File(PathBuf),
}

impl std::fmt::Display for EnvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvSource::Process => write!(f, "process environment"),
            EnvSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Key/value settings, resolved once and immutable afterwards.
///
/// Sources are walked in order and the first one to define a key wins.
/// Files are read without touching the process environment.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
    sources: Vec<EnvSource>,
}

impl Settings {
    /// The usual precedence: process env, the skill's own `.env`, then the
    /// working directory's `.env.local` and `.env`.
    pub fn default_sources(skill_dir: Option<&Path>) -> Vec<EnvSource> {
        let mut sources = vec![EnvSource::Process];
        if let Some(dir) = skill_dir {
            sources.push(EnvSource::File(dir.join(".env")));
        }
        sources.push(EnvSource::File(PathBuf::from(".env.local")));
        sources.push(EnvSource::File(PathBuf::from(".env")));
        sources
    }

    /// Walk the precedence list once and freeze the result.
    pub fn resolve(sources: &[EnvSource]) -> McpResult<Self> {
        let mut values = HashMap::new();

        for source in sources {
            match source {
                EnvSource::Process => {
                    for (key, value) in std::env::vars() {
                        values.entry(key).or_insert(value);
                    }
                }
                EnvSource::File(path) => {
                    if !path.is_file() {
                        tracing::debug!(path = %path.display(), "env file not present, skipping");
                        continue;
                    }
                    let iter = dotenvy::from_path_iter(path).map_err(|e| {
                        McpError::Configuration(format!("cannot read {}: {}", path.display(), e))
                    })?;
                    for item in iter {
                        let (key, value) = item.map_err(|e| {
                            McpError::Configuration(format!(
                                "malformed env file {}: {}",
                                path.display(),
                                e
                            ))
                        })?;
                        values.entry(key).or_insert(value);
                    }
                }
            }
        }

        Ok(Self {
            values,
            sources: sources.to_vec(),
        })
    }

    /// Build settings from literal pairs, mostly for tests and embedding.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            sources: Vec::new(),
        }
    }

    /// Look up a setting. Empty values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Look up a setting that must be present.
    pub fn require(&self, key: &str) -> McpResult<&str> {
        self.get(key).ok_or_else(|| {
            let consulted = if self.sources.is_empty() {
                "explicit settings".to_string()
            } else {
                self.sources
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            McpError::Configuration(format!("{} is not set (looked in: {})", key, consulted))
        })
    }
}

/// How to reach an MCP server.
#[derive(Debug, Clone)]
pub enum TransportConfig {
    /// Spawn a local server and speak over its stdin/stdout.
    Stdio {
        command: String,
        args: Vec<String>,
        env: HashMap<String, String>,
    },
    /// POST to a hosted server.
    Http {
        url: String,
        bearer_token: Option<String>,
        headers: HashMap<String, String>,
    },
}

/// Configuration for one MCP session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub name: String,
    pub transport: TransportConfig,
    pub protocol_version: String,
    pub request_timeout: Duration,
    pub client_name: String,
}

impl SessionConfig {
    /// A session that spawns `command` with `args`.
    pub fn stdio(
        name: impl Into<String>,
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::with_transport(
            name,
            TransportConfig::Stdio {
                command: command.into(),
                args: args.into_iter().map(Into::into).collect(),
                env: HashMap::new(),
            },
        )
    }

    /// A session that talks to a hosted server at `url`.
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_transport(
            name,
            TransportConfig::Http {
                url: url.into(),
                bearer_token: None,
                headers: HashMap::new(),
            },
        )
    }

    fn with_transport(name: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            name: name.into(),
            transport,
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client_name: "mcp-skills".to_string(),
        }
    }

    /// Add an environment variable for a stdio server. Ignored for HTTP.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let TransportConfig::Stdio { env, .. } = &mut self.transport {
            env.insert(key.into(), value.into());
        }
        self
    }

    /// Set the bearer token for an HTTP server. Ignored for stdio.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        if let TransportConfig::Http { bearer_token, .. } = &mut self.transport {
            *bearer_token = Some(token.into());
        }
        self
    }

    /// Add a header sent with every HTTP request. Ignored for stdio.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let TransportConfig::Http { headers, .. } = &mut self.transport {
            headers.insert(key.into(), value.into());
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Check the configuration before any I/O is attempted.
    pub fn validate(&self) -> McpResult<()> {
        if self.request_timeout.is_zero() {
            return Err(McpError::Configuration(format!(
                "{}: request timeout must be greater than zero",
                self.name
            )));
        }
        if self.protocol_version.trim().is_empty() {
            return Err(McpError::Configuration(format!(
                "{}: protocol version is empty",
                self.name
            )));
        }

        match &self.transport {
            TransportConfig::Stdio { command, .. } => {
                if command.trim().is_empty() {
                    return Err(McpError::Configuration(format!(
                        "{}: server command is empty",
                        self.name
                    )));
                }
            }
            TransportConfig::Http {
                url, bearer_token, ..
            } => {
                let parsed = reqwest::Url::parse(url).map_err(|e| {
                    McpError::Configuration(format!("{}: invalid URL '{}': {}", self.name, url, e))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(McpError::Configuration(format!(
                        "{}: unsupported URL scheme '{}'",
                        self.name,
                        parsed.scheme()
                    )));
                }
                if bearer_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
                    return Err(McpError::Configuration(format!(
                        "{}: bearer token is empty",
                        self.name
                    )));
                }
            }
        }

        Ok(())
    }
}
