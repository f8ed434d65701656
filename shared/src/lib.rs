// lib.rs - MediGuide shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]

pub mod analysis;
pub mod capabilities;
pub mod chat;
pub mod config;
pub mod event;
pub mod gemini;
pub mod model;
pub mod prompts;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::Event;
pub use model::{
    AnalysisRecord, ChatMessage, ChatRole, Model, Parameter, ParameterStatus, QuickStats,
    ResultsTab, Screen,
};

/// Browser file input filter for the upload screen.
pub const ACCEPTED_UPLOAD_TYPES: &str = "image/*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    RateLimited,
    Configuration,
    Deserialization,
    Blocked,
    EmptyResponse,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::Configuration => "NOT_CONFIGURED",
            Self::Deserialization => "DESERIALIZATION_ERROR",
            Self::Blocked => "CONTENT_BLOCKED",
            Self::EmptyResponse => "EMPTY_RESPONSE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            400 => Self::Validation,
            401 => Self::Authentication,
            403 => Self::Authorization,
            404 => Self::NotFound,
            408 => Self::Timeout,
            429 => Self::RateLimited,
            500..=599 => Self::Internal,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    /// Shown to the user as is.
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        self.message.clone()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

#[must_use]
pub fn get_current_time_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Success,
    Warning,
    Danger,
    Neutral,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusBadge {
    pub label: String,
    pub tone: BadgeTone,
}

impl From<ParameterStatus> for StatusBadge {
    fn from(status: ParameterStatus) -> Self {
        let (label, tone) = match status {
            ParameterStatus::Normal => ("Normal", BadgeTone::Success),
            ParameterStatus::Abnormal => ("Abnormal", BadgeTone::Warning),
            ParameterStatus::Critical => ("Attention", BadgeTone::Danger),
            ParameterStatus::Unknown => ("Unknown", BadgeTone::Neutral),
        };
        Self {
            label: label.into(),
            tone,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParameterView {
    pub name: String,
    pub value: String,
    pub unit: String,
    pub reference_range: String,
    pub explanation: String,
    pub implication: String,
    pub status: ParameterStatus,
    pub badge: StatusBadge,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportView {
    pub report_type: String,
    pub summary: String,
    pub analyzed_at_ms: u64,
    pub stats: QuickStats,
    pub parameters: Vec<ParameterView>,
    pub red_flags: Vec<String>,
    pub has_red_flags: bool,
    pub recommendations: Vec<String>,
    pub disclaimer: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessageView {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatView {
    pub messages: Vec<ChatMessageView>,
    pub input: String,
    pub is_waiting: bool,
    pub can_send: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewState {
    Home,
    Upload {
        accept: String,
        hint: String,
    },
    Analyzing {
        message: String,
        tip: String,
    },
    Results {
        active_tab: ResultsTab,
        report: ReportView,
        chat: ChatView,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserFacingError {
    pub message: String,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewModel {
    pub screen: Screen,
    pub state: ViewState,
    pub error: Option<UserFacingError>,
    pub is_configured: bool,
    pub notice: String,
}

pub mod app {
    use super::*;
    use crate::analysis::{self, AnalysisError, ReportImage};
    use crate::capabilities::{
        http::API_KEY_HEADER, into_http_result, Capabilities, HttpError, HttpResult,
    };
    use crate::chat::{self, ChatTranscript};
    use crate::config::{ClientConfig, ConfigError};
    use crate::gemini::{GenerateContentRequest, JSON_MIME_TYPE};
    use crate::model::{SessionId, UnixTimeMs};
    use crate::prompts;
    use tracing::{debug, error, info, warn};

    #[derive(Default)]
    pub struct App;

    impl App {
        fn build_config(
            api_key: String,
            model: Option<String>,
            base_url: Option<String>,
        ) -> Result<ClientConfig, ConfigError> {
            let mut config = ClientConfig::new(api_key)?;
            if let Some(model) = model {
                config = config.with_model(model)?;
            }
            if let Some(base_url) = base_url {
                config = config.with_base_url(base_url)?;
            }
            Ok(config)
        }

        fn encode_request(request: &GenerateContentRequest) -> Result<Vec<u8>, String> {
            serde_json::to_vec(request).map_err(|e| e.to_string())
        }

        fn fail_analysis(model: &mut Model, err: AnalysisError) {
            warn!(error = %err, kind = err.kind().code(), "report analysis failed");
            model.session = None;
            model.screen = Screen::Upload;
            model.set_error(err.into());
        }

        fn start_analysis(model: &mut Model, caps: &Capabilities, image: ReportImage) {
            model.clear_error();
            model.clear_session();
            let session = SessionId::generate();
            model.session = Some(session.clone());
            model.screen = Screen::Analyzing;

            let Some((url, api_key)) = model
                .config
                .as_ref()
                .map(|c| (c.generate_content_url(), c.api_key().to_string()))
            else {
                Self::fail_analysis(model, AnalysisError::NotConfigured);
                return;
            };

            let request = analysis::build_request(&image);
            let body = match Self::encode_request(&request) {
                Ok(body) => body,
                Err(e) => {
                    error!(error = %e, "failed to encode analysis request");
                    Self::fail_analysis(
                        model,
                        AnalysisError::Http(HttpError::SerializationError { message: e }),
                    );
                    return;
                }
            };

            info!(session = %session, mime_type = image.mime_type(), bytes = image.len(), "analysing report");

            caps.http
                .post(url)
                .header(API_KEY_HEADER, api_key.as_str())
                .header("content-type", JSON_MIME_TYPE)
                .body(body)
                .send(move |result| Event::AnalysisCompleted {
                    session,
                    result: into_http_result(result),
                });
        }

        fn finish_analysis(model: &mut Model, session: &SessionId, result: HttpResult) {
            if model.screen != Screen::Analyzing || !model.is_current_session(session) {
                debug!(session = %session, "discarding stale analysis response");
                return;
            }

            match analysis::decode_response(result) {
                Ok(record) => {
                    info!(
                        session = %session,
                        parameters = record.parameters.len(),
                        "report analysis complete"
                    );
                    model.transcript = ChatTranscript::seeded(&record);
                    model.analysis = Some(record);
                    model.analyzed_at = Some(UnixTimeMs::now());
                    model.active_tab = ResultsTab::Overview;
                    model.screen = Screen::Results;
                }
                Err(err) => Self::fail_analysis(model, err),
            }
        }

        /// Returns `true` when a question was appended to the transcript.
        fn send_chat_message(model: &mut Model, caps: &Capabilities) -> bool {
            if model.screen != Screen::Results || model.chat_pending {
                return false;
            }
            if model.chat_input.trim().is_empty() {
                return false;
            }
            let (Some(record), Some(session)) = (model.analysis.as_ref(), model.session.clone())
            else {
                return false;
            };

            let question = std::mem::take(&mut model.chat_input);
            let request = chat::build_request(record, model.transcript.messages(), &question);
            model.transcript.push(ChatMessage::new(ChatRole::User, question));

            let Some(config) = model.config.as_ref() else {
                warn!("chat requested without client configuration");
                model
                    .transcript
                    .push(ChatMessage::new(ChatRole::Model, prompts::CHAT_CONNECTION_FALLBACK));
                return true;
            };

            let body = match Self::encode_request(&request) {
                Ok(body) => body,
                Err(e) => {
                    error!(error = %e, "failed to encode chat request");
                    model
                        .transcript
                        .push(ChatMessage::new(ChatRole::Model, prompts::CHAT_CONNECTION_FALLBACK));
                    return true;
                }
            };

            model.chat_pending = true;
            debug!(session = %session, turns = model.transcript.len(), "sending follow-up question");

            caps.http
                .post(config.generate_content_url())
                .header(API_KEY_HEADER, config.api_key())
                .header("content-type", JSON_MIME_TYPE)
                .body(body)
                .send(move |result| Event::ChatReplyReceived {
                    session,
                    result: into_http_result(result),
                });
            true
        }

        fn build_report_view(record: &AnalysisRecord, analyzed_at: Option<UnixTimeMs>) -> ReportView {
            ReportView {
                report_type: record.report_type.clone(),
                summary: record.summary.clone(),
                analyzed_at_ms: analyzed_at.map_or(0, |t| t.0),
                stats: record.quick_stats(),
                parameters: record
                    .parameters
                    .iter()
                    .map(|p| ParameterView {
                        name: p.name.clone(),
                        value: p.value.clone(),
                        unit: p.unit.clone(),
                        reference_range: p.reference_range.clone(),
                        explanation: p.explanation.clone(),
                        implication: p.implication.clone(),
                        status: p.status,
                        badge: StatusBadge::from(p.status),
                    })
                    .collect(),
                red_flags: record.red_flags.clone(),
                has_red_flags: record.has_red_flags(),
                recommendations: record.lifestyle_recommendations.clone(),
                disclaimer: record.disclaimer.clone(),
            }
        }

        fn build_chat_view(model: &Model) -> ChatView {
            ChatView {
                messages: model
                    .transcript
                    .messages()
                    .iter()
                    .map(|m| ChatMessageView {
                        id: m.id.0.clone(),
                        role: m.role,
                        text: m.text.clone(),
                        timestamp_ms: m.timestamp.0,
                    })
                    .collect(),
                input: model.chat_input.clone(),
                is_waiting: model.chat_pending,
                can_send: model.can_send_chat(),
            }
        }

        fn upload_state() -> ViewState {
            ViewState::Upload {
                accept: ACCEPTED_UPLOAD_TYPES.into(),
                hint: prompts::UPLOAD_HINT.into(),
            }
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            if event.is_user_initiated() {
                debug!(event = event.name(), screen = model.screen.as_str(), "user action");
            }

            match event {
                Event::Configure {
                    api_key,
                    model: model_id,
                    base_url,
                } => {
                    match Self::build_config(api_key, model_id, base_url) {
                        Ok(config) => {
                            info!(model = config.model(), base_url = config.base_url(), "model client configured");
                            model.config = Some(config);
                        }
                        Err(e) => {
                            error!(error = %e, "rejected model client configuration");
                            model.config = None;
                        }
                    }
                    caps.render.render();
                }

                Event::GoHome => {
                    model.clear_session();
                    model.clear_error();
                    model.screen = Screen::Home;
                    caps.render.render();
                }

                Event::StartUpload => {
                    if model.screen == Screen::Home {
                        model.screen = Screen::Upload;
                        caps.render.render();
                    }
                }

                Event::ReportSelected { bytes, mime_type } => {
                    if !model.screen.accepts_report() {
                        warn!(screen = model.screen.as_str(), "ignoring report selected outside upload");
                        return;
                    }
                    let image = ReportImage::new(bytes, mime_type);
                    if image.is_empty() {
                        debug!("file picker returned no data");
                        return;
                    }
                    Self::start_analysis(model, caps, image);
                    caps.render.render();
                }

                Event::AnalysisCompleted { session, result } => {
                    Self::finish_analysis(model, &session, result);
                    caps.render.render();
                }

                Event::NewUpload => {
                    if model.screen == Screen::Results {
                        model.clear_session();
                        model.clear_error();
                        model.screen = Screen::Upload;
                        caps.render.render();
                    }
                }

                Event::DismissError => {
                    model.clear_error();
                    caps.render.render();
                }

                Event::SelectTab { tab } => {
                    if model.screen == Screen::Results {
                        model.active_tab = tab;
                        caps.render.render();
                    }
                }

                Event::ChatInputChanged { text } => {
                    model.chat_input = text;
                    caps.render.render();
                }

                Event::SendChatMessage => {
                    if Self::send_chat_message(model, caps) {
                        caps.render.render();
                    }
                }

                Event::ChatReplyReceived { session, result } => {
                    if !model.is_current_session(&session) {
                        debug!(session = %session, "discarding chat reply for a closed session");
                        return;
                    }
                    let answer = chat::answer_from(result);
                    model.transcript.push(ChatMessage::new(ChatRole::Model, answer));
                    model.chat_pending = false;
                    caps.render.render();
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            let (screen, state) = match model.screen {
                Screen::Home => (Screen::Home, ViewState::Home),

                Screen::Upload => (Screen::Upload, Self::upload_state()),

                Screen::Analyzing => (
                    Screen::Analyzing,
                    ViewState::Analyzing {
                        message: prompts::ANALYZING_MESSAGE.into(),
                        tip: prompts::ANALYZING_TIP.into(),
                    },
                ),

                Screen::Results => match model.analysis.as_ref() {
                    Some(record) => (
                        Screen::Results,
                        ViewState::Results {
                            active_tab: model.active_tab,
                            report: Self::build_report_view(record, model.analyzed_at),
                            chat: Self::build_chat_view(model),
                        },
                    ),
                    None => (Screen::Upload, Self::upload_state()),
                },
            };

            ViewModel {
                screen,
                state,
                error: model.active_error.as_ref().map(UserFacingError::from),
                is_configured: model.is_configured(),
                notice: prompts::SERVICE_NOTICE.into(),
            }
        }
    }
}
