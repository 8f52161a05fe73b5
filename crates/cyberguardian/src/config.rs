//! Runtime configuration with sensible defaults.
//!
//! Loading order:
//! 1. Built-in defaults.
//! 2. TOML file, if a path is given (`--config` or `CYBERGUARDIAN_CONFIG`).
//! 3. Environment overrides (`OPENROUTER_KEY`, `CYBERGUARDIAN_*`).
//!
//! Command-line flags are applied by the binaries after loading. Call
//! [`GuardianConfig::validate`] once everything is merged.
//!
//! ```toml
//! log_level = "info"
//!
//! [model]
//! model = "google/gemini-2.5-flash"
//! max_tokens = 2048
//! temperature = 0.2
//!
//! [server]
//! bind = "127.0.0.1:3001"
//! static_dir = "dashboard/out"
//!
//! [store]
//! data_dir = "data"
//!
//! [auth]
//! jwt_secret = "at-least-32-bytes-of-shared-secret"
//! audience = "authenticated"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::flow::ModelSettings;
use crate::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, OPENROUTER_URL};

pub const ENV_CONFIG: &str = "CYBERGUARDIAN_CONFIG";
pub const ENV_API_KEY: &str = "OPENROUTER_KEY";
pub const ENV_MODEL: &str = "CYBERGUARDIAN_MODEL";
pub const ENV_BIND: &str = "CYBERGUARDIAN_BIND";
pub const ENV_DATA_DIR: &str = "CYBERGUARDIAN_DATA_DIR";
pub const ENV_JWT_SECRET: &str = "CYBERGUARDIAN_JWT_SECRET";
pub const ENV_JWT_AUDIENCE: &str = "CYBERGUARDIAN_JWT_AUDIENCE";
pub const ENV_LOG: &str = "CYBERGUARDIAN_LOG";

/// Shortest accepted HS256 secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct GuardianConfig {
    pub model: ModelConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub log_level: LogLevel,
    /// API key for the model endpoint. Only ever read from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Chat completions URL. Default: OpenRouter.
    pub endpoint: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.2,
            endpoint: OPENROUTER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Pre-built dashboard frontend served for non-API paths.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3001)),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory for the file-backed store. In-memory when unset.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider.
    pub jwt_secret: Option<String>,
    /// Expected `aud` claim. When unset, `aud` is not checked.
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::invalid(
                "log_level",
                format!("unknown level '{other}'"),
            )),
        }
    }
}

impl GuardianConfig {
    /// Load defaults, then `path` (or `$CYBERGUARDIAN_CONFIG`) if given, then
    /// environment overrides. Does not validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(ENV_CONFIG).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from an environment lookup. Empty values are ignored.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(model) = get(ENV_MODEL) {
            self.model.model = model;
        }
        if let Some(bind) = get(ENV_BIND) {
            self.server.bind = bind
                .parse()
                .map_err(|e| ConfigError::invalid("server.bind", format!("'{bind}': {e}")))?;
        }
        if let Some(dir) = get(ENV_DATA_DIR) {
            self.store.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(secret) = get(ENV_JWT_SECRET) {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(audience) = get(ENV_JWT_AUDIENCE) {
            self.auth.audience = Some(audience);
        }
        if let Some(level) = get(ENV_LOG) {
            self.log_level = level.parse()?;
        }
        Ok(())
    }

    /// Check value ranges. Call after loading and applying CLI flags.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.model.trim().is_empty() {
            return Err(ConfigError::invalid("model.model", "must not be empty"));
        }
        if self.model.max_tokens == 0 {
            return Err(ConfigError::invalid("model.max_tokens", "must be positive"));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::invalid(
                "model.temperature",
                "must be between 0.0 and 2.0",
            ));
        }
        if !self.model.endpoint.starts_with("http://") && !self.model.endpoint.starts_with("https://")
        {
            return Err(ConfigError::invalid(
                "model.endpoint",
                "must be an http(s) URL",
            ));
        }
        if let Some(secret) = &self.auth.jwt_secret
            && secret.len() < MIN_JWT_SECRET_LEN
        {
            return Err(ConfigError::invalid(
                "auth.jwt_secret",
                format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            ));
        }
        Ok(())
    }

    /// The model parameters flows run with.
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            model: self.model.model.clone(),
            max_tokens: self.model.max_tokens,
            temperature: self.model.temperature,
        }
    }
}
