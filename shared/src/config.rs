//! Client settings for the hosted model API.
//!
//! The shell hands these over once at startup with `Event::Configure`. The
//! API key is wrapped in [`SecretString`] so it never shows up in `Debug`
//! output or logs.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::capabilities::http::ValidatedUrl;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const ANALYSIS_TEMPERATURE: f32 = 0.1;
pub const MAX_MODEL_ID_LENGTH: usize = 128;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API key is empty")]
    MissingApiKey,
    #[error("invalid model id '{0}'")]
    InvalidModel(String),
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug)]
pub struct ClientConfig {
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            api_key: SecretString::new(api_key.trim().to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Result<Self, ConfigError> {
        let model = model.into();
        Self::validate_model(&model)?;
        self.model = model;
        Ok(self)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        let validated = ValidatedUrl::new(base_url.trim_end_matches('/'))
            .map_err(|e| ConfigError::InvalidBaseUrl(e.to_string()))?;
        self.base_url = validated.as_str().trim_end_matches('/').to_string();
        Ok(self)
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    #[must_use]
    pub fn generate_content_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn validate_model(model: &str) -> Result<(), ConfigError> {
        let valid = !model.is_empty()
            && model.len() <= MAX_MODEL_ID_LENGTH
            && model
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidModel(model.to_string()))
        }
    }
}
