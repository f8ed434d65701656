//! Report analysis: one multimodal call that turns a report photo into an
//! [`AnalysisRecord`] by constraining the model to a fixed JSON schema.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::capabilities::{HttpError, HttpResult};
use crate::config::ANALYSIS_TEMPERATURE;
use crate::gemini::{
    ApiError, Content, GenerateContentRequest, GenerationConfig, Part,
};
use crate::model::AnalysisRecord;
use crate::prompts::{ANALYSIS_FAILED_MESSAGE, ANALYSIS_INSTRUCTION};
use crate::{AppError, ErrorKind};

/// Used when the shell cannot tell what kind of image it picked.
pub const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

pub const REQUIRED_FIELDS: [&str; 6] = [
    "reportType",
    "summary",
    "parameters",
    "redFlags",
    "lifestyleRecommendations",
    "disclaimer",
];

pub const REQUIRED_PARAMETER_FIELDS: [&str; 5] =
    ["name", "value", "status", "explanation", "implication"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("model client is not configured")]
    NotConfigured,

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("prompt blocked by the model: {reason}")]
    Blocked { reason: String },

    #[error("no response text generated")]
    EmptyResponse,

    #[error("response does not match the analysis schema: {0}")]
    Schema(String),
}

impl AnalysisError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotConfigured => ErrorKind::Configuration,
            Self::Http(HttpError::NetworkError { .. }) => ErrorKind::Network,
            Self::Http(_) => ErrorKind::Internal,
            Self::Api(e) => e.kind(),
            Self::Blocked { .. } => ErrorKind::Blocked,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::Schema(_) => ErrorKind::Deserialization,
        }
    }
}

/// Every analysis failure reaches the user as the same retry message; the
/// detail is kept for diagnostics.
impl From<AnalysisError> for AppError {
    fn from(e: AnalysisError) -> Self {
        AppError::new(e.kind(), ANALYSIS_FAILED_MESSAGE).with_internal(e.to_string())
    }
}

/// Image picked by the user, as handed over by the shell.
#[derive(Clone, PartialEq, Eq)]
pub struct ReportImage {
    bytes: Vec<u8>,
    mime_type: String,
}

impl ReportImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into().trim().to_ascii_lowercase();
        let mime_type = if mime_type.starts_with("image/") && mime_type.len() > "image/".len() {
            mime_type
        } else {
            FALLBACK_IMAGE_MIME.to_string()
        };
        Self { bytes, mime_type }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

impl std::fmt::Debug for ReportImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Response schema the model output must conform to.
#[must_use]
pub fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "reportType": {
                "type": "STRING",
                "description": "Type of the report, e.g., 'CBC Blood Test', 'Lipid Profile', 'MRI Scan'"
            },
            "summary": {
                "type": "STRING",
                "description": "A friendly, easy-to-understand summary of the overall health status based on the report."
            },
            "parameters": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING" },
                        "value": { "type": "STRING" },
                        "unit": { "type": "STRING" },
                        "status": {
                            "type": "STRING",
                            "enum": ["Normal", "Abnormal", "Critical", "Unknown"]
                        },
                        "referenceRange": { "type": "STRING" },
                        "explanation": {
                            "type": "STRING",
                            "description": "What does this test measure in simple terms?"
                        },
                        "implication": {
                            "type": "STRING",
                            "description": "What does this specific result mean for the patient?"
                        }
                    },
                    "required": REQUIRED_PARAMETER_FIELDS
                }
            },
            "redFlags": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of critical or high-risk findings that need immediate attention. Be calm but clear."
            },
            "lifestyleRecommendations": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Simple lifestyle, diet, or monitoring suggestions based on the results."
            },
            "disclaimer": {
                "type": "STRING",
                "description": "Standard medical disclaimer."
            }
        },
        "required": REQUIRED_FIELDS
    })
}

#[instrument(level = "debug", skip_all, fields(mime_type = %image.mime_type(), bytes = image.len()))]
pub fn build_request(image: &ReportImage) -> GenerateContentRequest {
    debug!("building report analysis request");
    GenerateContentRequest {
        contents: vec![Content::user(vec![
            Part::inline_data(image.mime_type(), image.to_base64()),
            Part::text(ANALYSIS_INSTRUCTION),
        ])],
        system_instruction: None,
        generation_config: Some(GenerationConfig::structured(
            analysis_schema(),
            ANALYSIS_TEMPERATURE,
        )),
    }
}

/// Turns the raw HTTP outcome into a record, or the reason it could not be.
#[instrument(level = "debug", skip_all)]
pub fn decode_response(result: HttpResult) -> Result<AnalysisRecord, AnalysisError> {
    let raw = result?;
    let response = crate::gemini::parse_response(&raw)?;

    let Some(text) = response.text() else {
        if let Some(reason) = response.block_reason() {
            return Err(AnalysisError::Blocked {
                reason: reason.to_string(),
            });
        }
        warn!(finish_reason = ?response.finish_reason(), "model returned no text");
        return Err(AnalysisError::EmptyResponse);
    };

    let record: AnalysisRecord =
        serde_json::from_str(&text).map_err(|e| AnalysisError::Schema(e.to_string()))?;

    debug!(
        parameters = record.parameters.len(),
        red_flags = record.red_flags.len(),
        "decoded analysis record"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::RawResponse;
    use crate::model::ParameterStatus;
    use assert_matches::assert_matches;

    const RECORD_JSON: &str = r#"{
        "reportType": "CBC Blood Test",
        "summary": "Most values are healthy; iron looks low.",
        "parameters": [
            {
                "name": "Hemoglobin",
                "value": "10.9",
                "unit": "g/dL",
                "status": "Abnormal",
                "referenceRange": "12.0 - 15.5",
                "explanation": "Protein that carries oxygen.",
                "implication": "Slightly low, may cause tiredness."
            },
            {
                "name": "WBC",
                "value": "6.1",
                "status": "Normal",
                "explanation": "Infection-fighting cells.",
                "implication": "Normal immune cell count."
            }
        ],
        "redFlags": ["Low hemoglobin"],
        "lifestyleRecommendations": ["Eat iron-rich foods"],
        "disclaimer": "This is AI-generated and not a replacement for a doctor."
    }"#;

    fn model_reply(text: &str) -> HttpResult {
        Ok(RawResponse::new(
            200,
            serde_json::to_vec(&json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": text}]},
                    "finishReason": "STOP"
                }]
            }))
            .unwrap(),
        ))
    }

    #[test]
    fn test_mime_type_falls_back_to_jpeg() {
        assert_eq!(ReportImage::new(vec![1], "image/png").mime_type(), "image/png");
        assert_eq!(ReportImage::new(vec![1], "IMAGE/WEBP").mime_type(), "image/webp");
        assert_eq!(ReportImage::new(vec![1], "").mime_type(), FALLBACK_IMAGE_MIME);
        assert_eq!(
            ReportImage::new(vec![1], "application/pdf").mime_type(),
            FALLBACK_IMAGE_MIME
        );
        assert_eq!(ReportImage::new(vec![1], "image/").mime_type(), FALLBACK_IMAGE_MIME);
    }

    #[test]
    fn test_base64_encoding() {
        let image = ReportImage::new(b"hello".to_vec(), "image/png");
        assert_eq!(image.to_base64(), "aGVsbG8=");
    }

    #[test]
    fn test_request_shape() {
        let image = ReportImage::new(b"hello".to_vec(), "image/png");
        let value = serde_json::to_value(build_request(&image)).unwrap();

        let parts = &value["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "aGVsbG8=");
        assert_eq!(parts[1]["text"], ANALYSIS_INSTRUCTION);

        let config = &value["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert!((config["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert_eq!(config["responseSchema"]["required"], json!(REQUIRED_FIELDS));
    }

    #[test]
    fn test_schema_status_enum() {
        let schema = analysis_schema();
        let status = &schema["properties"]["parameters"]["items"]["properties"]["status"];
        assert_eq!(
            status["enum"],
            json!(["Normal", "Abnormal", "Critical", "Unknown"])
        );
    }

    #[test]
    fn test_decode_populates_all_fields() {
        let record = decode_response(model_reply(RECORD_JSON)).unwrap();
        assert_eq!(record.report_type, "CBC Blood Test");
        assert_eq!(record.summary, "Most values are healthy; iron looks low.");
        assert_eq!(record.parameters.len(), 2);
        assert_eq!(record.parameters[0].status, ParameterStatus::Abnormal);
        assert_eq!(record.parameters[1].unit, "");
        assert_eq!(record.red_flags, vec!["Low hemoglobin".to_string()]);
        assert_eq!(record.lifestyle_recommendations.len(), 1);
        assert!(record.disclaimer.contains("AI-generated"));
    }

    #[test]
    fn test_decode_missing_required_field() {
        let mut value: Value = serde_json::from_str(RECORD_JSON).unwrap();
        value.as_object_mut().unwrap().remove("disclaimer");
        let result = decode_response(model_reply(&value.to_string()));
        assert_matches!(result, Err(AnalysisError::Schema(_)));
    }

    #[test]
    fn test_decode_not_json() {
        let result = decode_response(model_reply("Sorry, I cannot read this image."));
        assert_matches!(result, Err(AnalysisError::Schema(_)));
    }

    #[test]
    fn test_decode_empty_candidates() {
        let result = decode_response(Ok(RawResponse::new(200, b"{}".to_vec())));
        assert_matches!(result, Err(AnalysisError::EmptyResponse));
    }

    #[test]
    fn test_decode_blocked_prompt() {
        let body = br#"{"promptFeedback": {"blockReason": "SAFETY"}}"#.to_vec();
        let result = decode_response(Ok(RawResponse::new(200, body)));
        assert_matches!(result, Err(AnalysisError::Blocked { reason }) if reason == "SAFETY");
    }

    #[test]
    fn test_decode_api_error_status() {
        let body = br#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        let result = decode_response(Ok(RawResponse::new(403, body.to_vec())));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(err.to_string().contains("API key not valid"));
    }

    #[test]
    fn test_decode_transport_error() {
        let result = decode_response(Err(HttpError::NetworkError {
            message: "connection reset".into(),
        }));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn test_app_error_uses_generic_message() {
        let app_error: AppError = AnalysisError::EmptyResponse.into();
        assert_eq!(app_error.user_facing_message(), ANALYSIS_FAILED_MESSAGE);
        assert_eq!(
            app_error.internal_message.as_deref(),
            Some("no response text generated")
        );
    }
}
