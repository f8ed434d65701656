use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_RESPONSE_BODY_SIZE: usize = 16 * 1024 * 1024;
pub const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidatedUrl {
    url: String,
    scheme: String,
    host: String,
}

impl ValidatedUrl {
    pub fn new(url: impl Into<String>) -> Result<Self, HttpError> {
        let url = url.into();
        Self::validate(&url)?;

        let parsed = Url::parse(&url).map_err(|e| HttpError::InvalidUrl {
            url: Self::truncate_url(&url),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme().to_lowercase();
        let host = parsed
            .host_str()
            .ok_or_else(|| HttpError::InvalidUrl {
                url: Self::truncate_url(&url),
                reason: "missing host".to_string(),
            })?
            .to_lowercase();

        Ok(Self {
            url: parsed.to_string(),
            scheme,
            host,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn validate(url: &str) -> Result<(), HttpError> {
        if url.trim().is_empty() {
            return Err(HttpError::InvalidUrl {
                url: String::new(),
                reason: "URL cannot be empty".to_string(),
            });
        }

        if url.len() > MAX_URL_LENGTH {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: format!("URL exceeds maximum length of {} bytes", MAX_URL_LENGTH),
            });
        }

        let parsed = Url::parse(url).map_err(|e| HttpError::InvalidUrl {
            url: Self::truncate_url(url),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme().to_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: format!(
                    "invalid scheme '{}', only 'http' and 'https' are allowed",
                    scheme
                ),
            });
        }

        if parsed.host_str().is_none() {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: "URL must have a host".to_string(),
            });
        }

        // The key travels in a header; credentials in the URL would end up in logs.
        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: "credentials in URL are not allowed".to_string(),
            });
        }

        if parsed.query().is_some() {
            return Err(HttpError::InvalidUrl {
                url: Self::truncate_url(url),
                reason: "base URL must not carry a query".to_string(),
            });
        }

        Ok(())
    }

    fn truncate_url(url: &str) -> String {
        match url.char_indices().nth(100) {
            Some((idx, _)) => format!("{}...", &url[..idx]),
            None => url.to_string(),
        }
    }
}

/// Status and body of a completed exchange, detached from the Crux response
/// type so it can travel inside an `Event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    pub status: u16,
    #[serde(with = "serde_bytes")]
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json<T: Serialize>(value: &T) -> Result<Self, HttpError> {
        let body = serde_json::to_vec(value).map_err(|e| HttpError::SerializationError {
            message: e.to_string(),
        })?;
        Ok(Self::new(200, body))
    }

    /// Rejects bodies over [`MAX_RESPONSE_BODY_SIZE`]. The body is already in
    /// memory at this point, so this only keeps oversized payloads away from
    /// the JSON decoder.
    pub fn bounded(status: u16, body: Vec<u8>) -> HttpResult {
        if body.len() > MAX_RESPONSE_BODY_SIZE {
            return Err(HttpError::ResponseTooLarge {
                size: body.len(),
                max: MAX_RESPONSE_BODY_SIZE,
            });
        }
        Ok(Self::new(status, body))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub type HttpResult = Result<RawResponse, HttpError>;

/// Flattens the outcome of a `crux_http` request into an [`HttpResult`].
pub fn into_http_result(result: crux_http::Result<crux_http::Response<Vec<u8>>>) -> HttpResult {
    let mut response = result.map_err(|e| HttpError::NetworkError {
        message: e.to_string(),
    })?;
    let status: u16 = response.status().into();
    RawResponse::bounded(status, response.take_body().unwrap_or_default())
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum HttpError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("response body too large: {size} bytes exceeds maximum of {max} bytes")]
    ResponseTooLarge { size: usize, max: usize },

    #[error("network error: {message}")]
    NetworkError { message: String },

    #[error("serialization error: {message}")]
    SerializationError { message: String },
}
