use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_GEMINI_API_KEY";

/// Main configuration structure for intelligence-lens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Upper bound for a whole generateContent round trip
    pub timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Initial state of the web search toggle for new sessions
    pub use_web_search: bool,
    /// Language the model is told to answer in
    pub response_language: String,
    pub max_upload_bytes: u64,
    /// Title given to cited sources the backend returned without one
    pub fallback_source_title: String,
}

impl GeminiConfig {
    /// Get request timeout as Duration
    pub fn get_request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Get connect timeout as Duration
    pub fn get_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            use_web_search: true,
            response_language: "Simplified Chinese".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
            fallback_source_title: "Reference source".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::debug!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("LENS_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::debug!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides();

        // Validate configuration - log warnings but don't fail
        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from a key lookup (the process environment in production)
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // GEMINI_API_KEY wins over the generic API_KEY
        if let Some(api_key) = lookup("GEMINI_API_KEY").or_else(|| lookup("API_KEY")) {
            self.gemini.api_key = api_key;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            self.gemini.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = lookup("LENS_TIMEOUT_SECONDS") {
            if let Ok(secs) = timeout.parse() {
                self.gemini.timeout_seconds = secs;
            }
        }

        if let Some(flag) = lookup("LENS_WEB_SEARCH") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.analysis.use_web_search = true,
                "0" | "false" | "no" | "off" => self.analysis.use_web_search = false,
                other => tracing::warn!("Ignoring unrecognised LENS_WEB_SEARCH value: {}", other),
            }
        }
        if let Some(language) = lookup("LENS_LANGUAGE") {
            self.analysis.response_language = language;
        }
        if let Some(max) = lookup("LENS_MAX_UPLOAD_BYTES") {
            if let Ok(bytes) = max.parse() {
                self.analysis.max_upload_bytes = bytes;
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.gemini.api_key == PLACEHOLDER_API_KEY || self.gemini.api_key.is_empty() {
            return Err("GEMINI_API_KEY environment variable must be set".into());
        }
        if self.gemini.timeout_seconds == 0 {
            return Err("gemini.timeout_seconds cannot be 0".into());
        }
        if self.analysis.max_upload_bytes == 0 {
            return Err("analysis.max_upload_bytes cannot be 0".into());
        }
        if self.analysis.response_language.trim().is_empty() {
            return Err("analysis.response_language cannot be empty".into());
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        !self.gemini.api_key.is_empty() && self.gemini.api_key != PLACEHOLDER_API_KEY
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                api_key: PLACEHOLDER_API_KEY.to_string(),
                model: "gemini-3-flash-preview".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                timeout_seconds: 120,
                connect_timeout_seconds: 10,
            },
            analysis: AnalysisConfig::default(),
        }
    }
}
