use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chat::ChatTranscript;
use crate::config::ClientConfig;
use crate::AppError;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(MessageId);
typed_id!(SessionId);

/// Explicit timestamp unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        Self(crate::get_current_time_ms())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Home,
    Upload,
    Analyzing,
    Results,
}

impl Screen {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Upload => "upload",
            Self::Analyzing => "analyzing",
            Self::Results => "results",
        }
    }

    /// A file may be picked from the landing page as well as the upload page.
    #[must_use]
    pub const fn accepts_report(self) -> bool {
        matches!(self, Self::Home | Self::Upload)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResultsTab {
    #[default]
    Overview,
    Details,
    Chat,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ParameterStatus {
    Normal,
    Abnormal,
    Critical,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ParameterStatus {
    pub const ALL: [Self; 4] = [Self::Normal, Self::Abnormal, Self::Critical, Self::Unknown];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Abnormal => "Abnormal",
            Self::Critical => "Critical",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ParameterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One measured line item of a report.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub unit: String,
    pub status: ParameterStatus,
    #[serde(default)]
    pub reference_range: String,
    pub explanation: String,
    pub implication: String,
}

/// Structured explanation of one report, produced wholesale by the model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub report_type: String,
    pub summary: String,
    pub parameters: Vec<Parameter>,
    pub red_flags: Vec<String>,
    pub lifestyle_recommendations: Vec<String>,
    pub disclaimer: String,
}

impl AnalysisRecord {
    #[must_use]
    pub fn quick_stats(&self) -> QuickStats {
        QuickStats::from_parameters(&self.parameters)
    }

    #[must_use]
    pub fn has_red_flags(&self) -> bool {
        !self.red_flags.is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct QuickStats {
    pub total: usize,
    pub normal: usize,
    pub abnormal: usize,
    pub critical: usize,
}

impl QuickStats {
    #[must_use]
    pub fn from_parameters(parameters: &[Parameter]) -> Self {
        parameters.iter().fold(
            Self {
                total: parameters.len(),
                ..Self::default()
            },
            |mut stats, p| {
                match p.status {
                    ParameterStatus::Normal => stats.normal += 1,
                    ParameterStatus::Abnormal => stats.abnormal += 1,
                    ParameterStatus::Critical => stats.critical += 1,
                    ParameterStatus::Unknown => {}
                }
                stats
            },
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: UnixTimeMs,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            text: text.into(),
            timestamp: UnixTimeMs::now(),
        }
    }
}

// Message text stays out of Debug output.
impl fmt::Debug for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatMessage")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("text_len", &self.text.len())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

#[derive(Default)]
pub struct Model {
    pub screen: Screen,
    pub config: Option<ClientConfig>,
    pub analysis: Option<AnalysisRecord>,
    pub transcript: ChatTranscript,
    pub chat_input: String,
    pub chat_pending: bool,
    pub active_tab: ResultsTab,
    pub active_error: Option<AppError>,
    /// When the record on screen was received.
    pub analyzed_at: Option<UnixTimeMs>,
    /// Identifies the report currently being analysed or shown; responses
    /// tagged with another session are stale.
    pub session: Option<SessionId>,
}

impl Model {
    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    #[must_use]
    pub fn is_current_session(&self, session: &SessionId) -> bool {
        self.session.as_ref() == Some(session)
    }

    /// Drops everything tied to the report on screen.
    pub fn clear_session(&mut self) {
        self.analysis = None;
        self.analyzed_at = None;
        self.transcript.clear();
        self.chat_input.clear();
        self.chat_pending = false;
        self.active_tab = ResultsTab::default();
        self.session = None;
    }

    #[must_use]
    pub fn can_send_chat(&self) -> bool {
        self.screen == Screen::Results
            && self.analysis.is_some()
            && !self.chat_pending
            && !self.chat_input.trim().is_empty()
    }
}
