use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capabilities::HttpResult;
use crate::model::{ResultsTab, SessionId};

#[derive(Clone, Serialize, Deserialize)]
pub enum Event {
    /// Sent by the shell once at startup with the API credential.
    Configure {
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    },

    GoHome,
    StartUpload,
    ReportSelected {
        #[serde(with = "serde_bytes")]
        bytes: Vec<u8>,
        mime_type: String,
    },
    NewUpload,
    DismissError,

    SelectTab {
        tab: ResultsTab,
    },
    ChatInputChanged {
        text: String,
    },
    SendChatMessage,

    // Responses to effects; never sent by the shell.
    #[serde(skip)]
    AnalysisCompleted {
        session: SessionId,
        result: HttpResult,
    },
    #[serde(skip)]
    ChatReplyReceived {
        session: SessionId,
        result: HttpResult,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure { .. } => "configure",
            Self::GoHome => "go_home",
            Self::StartUpload => "start_upload",
            Self::ReportSelected { .. } => "report_selected",
            Self::NewUpload => "new_upload",
            Self::DismissError => "dismiss_error",
            Self::SelectTab { .. } => "select_tab",
            Self::ChatInputChanged { .. } => "chat_input_changed",
            Self::SendChatMessage => "send_chat_message",
            Self::AnalysisCompleted { .. } => "analysis_completed",
            Self::ChatReplyReceived { .. } => "chat_reply_received",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::Configure { .. } | Self::AnalysisCompleted { .. } | Self::ChatReplyReceived { .. }
        )
    }
}

// Keys, image bytes and typed questions stay out of logs.
impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure { model, base_url, .. } => f
                .debug_struct("Configure")
                .field("api_key", &"[REDACTED]")
                .field("model", model)
                .field("base_url", base_url)
                .finish(),
            Self::ReportSelected { bytes, mime_type } => f
                .debug_struct("ReportSelected")
                .field("bytes_len", &bytes.len())
                .field("mime_type", mime_type)
                .finish(),
            Self::SelectTab { tab } => f.debug_struct("SelectTab").field("tab", tab).finish(),
            Self::ChatInputChanged { text } => f
                .debug_struct("ChatInputChanged")
                .field("text_len", &text.len())
                .finish(),
            Self::AnalysisCompleted { session, result } | Self::ChatReplyReceived { session, result } => f
                .debug_struct(self.name())
                .field("session", session)
                .field("status", &result.as_ref().map(|r| r.status))
                .finish(),
            _ => f.write_str(self.name()),
        }
    }
}
