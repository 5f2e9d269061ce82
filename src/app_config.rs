use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use url::Url;

use crate::errors::ConfigError;
use crate::translation::batch::BatchConfig;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language, as a name ("French") or ISO code ("fr").
    /// Empty means "use the document's declared target language".
    #[serde(default)]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Batch scheduling settings
    #[serde(default)]
    pub batch: BatchSettings,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Anthropic Messages API
    #[default]
    Anthropic,
    // @provider: OpenAI-compatible Chat Completions API
    OpenAI,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Anthropic => "Anthropic",
            Self::OpenAI => "OpenAI",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Anthropic => "anthropic".to_string(),
            Self::OpenAI => "openai".to_string(),
        }
    }

    // @returns: Environment variable consulted when no API key is configured
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Per-request timeout, a timed out call fails its batch
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::Anthropic => Self {
                provider_type: "anthropic".to_string(),
                model: default_anthropic_model(),
                api_key: String::new(),
                endpoint: default_anthropic_endpoint(),
                timeout_secs: default_timeout_secs(),
            },
            TranslationProvider::OpenAI => Self {
                provider_type: "openai".to_string(),
                model: default_openai_model(),
                api_key: String::new(),
                endpoint: default_openai_endpoint(),
                timeout_secs: default_timeout_secs(),
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for translation
    /// Placeholder: {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on tokens generated for one batch
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Batch scheduling settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchSettings {
    /// Number of units sent to the provider in one call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between consecutive batches, in seconds
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,

    /// Leave units that already have a target untouched
    #[serde(default = "default_true")]
    pub skip_existing: bool,

    /// Write a checkpoint after this many batches
    #[serde(default = "default_save_frequency")]
    pub save_frequency: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            delay_secs: default_delay_secs(),
            skip_existing: default_true(),
            save_frequency: default_save_frequency(),
        }
    }
}

impl BatchSettings {
    /// Build the scheduler configuration for one run
    pub fn to_batch_config(&self, target_language: impl Into<String>) -> BatchConfig {
        BatchConfig {
            batch_size: self.batch_size,
            delay_secs: self.delay_secs,
            skip_existing: self.skip_existing,
            save_frequency: self.save_frequency,
            target_language: target_language.into(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> usize {
    10
}

fn default_delay_secs() -> f64 {
    1.0
}

fn default_save_frequency() -> usize {
    5
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-haiku-4-5-20251001".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional translator. Translate each numbered item to {target_language}. \
     Preserve any HTML tags, XML tags, placeholders, or special formatting exactly as they appear. \
     Return only the translations in the same numbered format, one per line."
        .to_string()
}

impl Config {
    /// Load the configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_batch()?;
        self.validate_provider()
    }

    /// Validate only the batch parameters
    pub fn validate_batch(&self) -> Result<(), ConfigError> {
        self.batch.to_batch_config(self.target_language.clone()).validate_tuning()
    }

    /// Validate the active provider's endpoint and credentials
    pub fn validate_provider(&self) -> Result<(), ConfigError> {
        let provider = self.translation.provider;
        let endpoint = self.translation.get_endpoint();
        let endpoint_ok = Url::parse(&endpoint)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
            .unwrap_or(false);
        if !endpoint_ok {
            return Err(ConfigError::InvalidEndpoint {
                provider: provider.display_name().to_string(),
                endpoint,
            });
        }

        if self.translation.get_api_key().is_empty() {
            return Err(ConfigError::MissingApiKey(provider.display_name().to_string()));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: String::new(),
            translation: TranslationConfig::default(),
            batch: BatchSettings::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, created on demand
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let index = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            TranslationProvider::Anthropic => default_anthropic_model(),
            TranslationProvider::OpenAI => default_openai_model(),
        }
    }

    /// Get the API key for the active provider, falling back to the provider's environment variable
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        std::env::var(self.provider.api_key_env_var())
            .map(|key| key.trim().to_string())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            TranslationProvider::Anthropic => default_anthropic_endpoint(),
            TranslationProvider::OpenAI => default_openai_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Render the system prompt for a target language
    pub fn system_prompt_for(&self, target_language: &str) -> String {
        self.common.system_prompt.replace("{target_language}", target_language)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Anthropic),
                ProviderConfig::new(TranslationProvider::OpenAI),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
