use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use chatlens::{AnalysisConfig, ContextConfig, StatsConfig};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: String,
    #[serde(default)]
    pub openai_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 50 * 1024 * 1024,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `memory` or `mongodb`
    pub backend: String,
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            database: "chatlens".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let analysis = AnalysisConfig::default();
        Self {
            model: analysis.model,
            temperature: analysis.temperature,
            max_output_tokens: analysis.max_output_tokens,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub timeout_secs: u64,
    pub max_messages: usize,
    pub max_context_tokens: usize,
    pub response_language: String,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        let context = ContextConfig::default();
        Self {
            timeout_secs: 60,
            max_messages: context.max_messages,
            max_context_tokens: context.max_context_tokens,
            response_language: context.response_language,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `CHATLENS_<SECTION>__<KEY>` environment variables
    /// 4. Section-prefixed variables such as `SERVER_PORT` or `LLM_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // 3. Nested overrides
            .add_source(
                Environment::with_prefix("CHATLENS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.apply_env_overrides()?;

        // Load secrets from ENV (not in TOML)
        cfg.openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::Message("OPENAI_API_KEY environment variable is required".to_string()))?;
        if cfg.store.backend == "mongodb" {
            cfg.mongodb_uri = std::env::var("MONGODB_URI").map_err(|_| {
                ConfigError::Message("MONGODB_URI environment variable is required for the mongodb store".to_string())
            })?;
        }

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));
        builder.build()?.try_deserialize()
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }
        fn parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
            match var(name) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| ConfigError::Message(format!("{} has an invalid value: {}", name, raw))),
                None => Ok(None),
            }
        }

        if let Some(host) = var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parsed("SERVER_PORT")? {
            self.server.port = port;
        }
        if let Some(limit) = parsed("SERVER_MAX_UPLOAD_BYTES")? {
            self.server.max_upload_bytes = limit;
        }
        if let Some(backend) = var("STORE_BACKEND") {
            self.store.backend = backend;
        }
        if let Some(database) = var("STORE_DATABASE") {
            self.store.database = database;
        }
        if let Some(model) = var("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(temperature) = parsed("LLM_TEMPERATURE")? {
            self.llm.temperature = temperature;
        }
        if let Some(base_url) = var("LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(timeout) = parsed("ANALYSIS_TIMEOUT_SECS")? {
            self.analysis.timeout_secs = timeout;
        }
        if let Some(language) = var("ANALYSIS_RESPONSE_LANGUAGE") {
            self.analysis.response_language = language;
        }
        if let Some(top) = parsed("STATS_TOP_KEYWORDS")? {
            self.stats.top_keywords = top;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.logging.format = format;
        }
        Ok(())
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig::new()
            .with_model(self.llm.model.clone())
            .with_temperature(self.llm.temperature)
            .with_max_output_tokens(self.llm.max_output_tokens)
            .with_timeout(self.analysis_timeout())
    }

    pub fn context_config(&self) -> ContextConfig {
        ContextConfig {
            max_messages: self.analysis.max_messages,
            max_context_tokens: self.analysis.max_context_tokens,
            response_language: self.analysis.response_language.clone(),
        }
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis.timeout_secs.max(1))
    }
}
