//! Configuration loading, validation, and management for rolectx.
//!
//! Loads configuration from `~/.rolectx/config.toml` with environment
//! variable overrides. Validates all settings at startup; the rest of the
//! service treats the result as immutable and never reads the environment
//! again.

pub mod seed;

use rolectx_core::{Role, TierTtls, ToneProfile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.rolectx/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Service name reported to clients
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Service version reported to clients
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Verbose diagnostics
    #[serde(default)]
    pub debug: bool,

    /// Transport settings (consumed by the transport layer)
    #[serde(default)]
    pub server: ServerConfig,

    /// Language model settings (consumed by the LLM caller)
    #[serde(default)]
    pub llm: LlmConfig,

    /// Memory tiers and backend selection
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Extra tone profiles, appended after the built-ins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tones: Vec<ToneProfile>,

    /// Extra custom roles, registered after the defaults
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
}

fn default_app_name() -> String {
    "Role-Specific Context MCP Server".into()
}
fn default_app_version() -> String {
    "1.0.0".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_api_prefix() -> String {
    "/api/v1".into()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_prefix: default_api_prefix(),
            port: default_port(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_user_ttl")]
    pub user_ttl_secs: u64,

    #[serde(default = "default_knowledge_ttl")]
    pub knowledge_ttl_secs: u64,

    /// How often the background sweeper runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Deadline for each call to an external backend
    #[serde(default = "default_backend_timeout")]
    pub backend_timeout_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_key: Option<String>,
}

fn default_session_ttl() -> u64 {
    TierTtls::SESSION_SECS
}
fn default_user_ttl() -> u64 {
    TierTtls::USER_SECS
}
fn default_knowledge_ttl() -> u64 {
    TierTtls::KNOWLEDGE_SECS
}
fn default_sweep_interval() -> u64 {
    60
}
fn default_backend_timeout() -> u64 {
    2000
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            user_ttl_secs: default_user_ttl(),
            knowledge_ttl_secs: default_knowledge_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            backend_timeout_ms: default_backend_timeout(),
            redis_url: None,
            supabase_url: None,
            supabase_key: None,
        }
    }
}

impl std::fmt::Debug for MemoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConfig")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("user_ttl_secs", &self.user_ttl_secs)
            .field("knowledge_ttl_secs", &self.knowledge_ttl_secs)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("backend_timeout_ms", &self.backend_timeout_ms)
            .field("redis_url", &redact(&self.redis_url))
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &redact(&self.supabase_key))
            .finish()
    }
}

/// Where memory tiers live. Resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub enum BackendKind {
    InProcess,
    External(ExternalBackend),
}

/// Connection info for a network-addressable memory backend.
#[derive(Clone, PartialEq, Eq)]
pub enum ExternalBackend {
    Redis { url: String },
    Supabase { url: String, key: String },
}

impl ExternalBackend {
    pub fn name(&self) -> &'static str {
        match self {
            ExternalBackend::Redis { .. } => "redis",
            ExternalBackend::Supabase { .. } => "supabase",
        }
    }
}

impl std::fmt::Debug for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::InProcess => f.write_str("InProcess"),
            BackendKind::External(ext) => f.debug_tuple("External").field(ext).finish(),
        }
    }
}

impl std::fmt::Debug for ExternalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalBackend::Redis { .. } => {
                f.debug_struct("Redis").field("url", &"[REDACTED]").finish()
            }
            ExternalBackend::Supabase { url, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .field("key", &"[REDACTED]")
                .finish(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.rolectx/config.toml),
    /// then apply environment overrides:
    /// - `OPENAI_API_KEY`, `OPENAI_MODEL`
    /// - `PORT`, `DEBUG`
    /// - `REDIS_URL`, `SUPABASE_URL`, `SUPABASE_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`, then re-validate.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("OPENAI_MODEL").filter(|m| !m.is_empty()) {
            self.llm.model = model;
        }
        if let Some(debug) = lookup("DEBUG") {
            self.debug = debug.eq_ignore_ascii_case("true");
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("PORT must be a port number, got '{port}'"))
            })?;
        }
        if let Some(url) = lookup("REDIS_URL").filter(|u| !u.is_empty()) {
            self.memory.redis_url = Some(url);
        }
        if let Some(url) = lookup("SUPABASE_URL").filter(|u| !u.is_empty()) {
            self.memory.supabase_url = Some(url);
        }
        if let Some(key) = lookup("SUPABASE_KEY").filter(|k| !k.is_empty()) {
            self.memory.supabase_key = Some(key);
        }
        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".rolectx")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.memory;
        for (name, value) in [
            ("memory.session_ttl_secs", m.session_ttl_secs),
            ("memory.user_ttl_secs", m.user_ttl_secs),
            ("memory.knowledge_ttl_secs", m.knowledge_ttl_secs),
            ("memory.sweep_interval_secs", m.sweep_interval_secs),
            ("memory.backend_timeout_ms", m.backend_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!("{name} must be > 0")));
            }
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError("server.port must be > 0".into()));
        }

        Ok(())
    }

    /// Default retention horizon per tier.
    pub fn tier_ttls(&self) -> TierTtls {
        TierTtls {
            session: Duration::from_secs(self.memory.session_ttl_secs),
            user: Duration::from_secs(self.memory.user_ttl_secs),
            knowledge: Duration::from_secs(self.memory.knowledge_ttl_secs),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.memory.sweep_interval_secs)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.memory.backend_timeout_ms)
    }

    /// Which memory backend to use. Redis wins when both are configured;
    /// Supabase needs both its URL and key.
    pub fn backend_kind(&self) -> BackendKind {
        let m = &self.memory;
        if let Some(url) = &m.redis_url {
            return BackendKind::External(ExternalBackend::Redis { url: url.clone() });
        }
        if let (Some(url), Some(key)) = (&m.supabase_url, &m.supabase_key) {
            return BackendKind::External(ExternalBackend::Supabase {
                url: url.clone(),
                key: key.clone(),
            });
        }
        BackendKind::InProcess
    }

    /// Built-in tones followed by any configured extras.
    pub fn tone_seed(&self) -> Vec<ToneProfile> {
        let mut tones = seed::default_tones();
        tones.extend(self.tones.iter().cloned());
        tones
    }

    /// Default roles followed by configured custom roles (never defaults).
    pub fn role_seed(&self) -> Vec<Role> {
        let mut roles = seed::default_roles();
        roles.extend(self.roles.iter().cloned().map(|r| Role {
            is_default: false,
            ..r
        }));
        roles
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            app_version: default_app_version(),
            debug: false,
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            memory: MemoryConfig::default(),
            tones: vec![],
            roles: vec![],
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
