//! Follow-up questions about an analysed report.

use tracing::{debug, instrument, warn};

use crate::capabilities::HttpResult;
use crate::gemini::{parse_response, Content, GenerateContentRequest};
use crate::model::{AnalysisRecord, ChatMessage, ChatRole};
use crate::prompts::{
    chat_greeting, chat_system_instruction, CHAT_CONNECTION_FALLBACK, CHAT_EMPTY_ANSWER,
};

/// Append-only conversation for one analysis session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    /// Transcript opened with the model greeting for `record`.
    #[must_use]
    pub fn seeded(record: &AnalysisRecord) -> Self {
        Self {
            messages: vec![ChatMessage::new(
                ChatRole::Model,
                chat_greeting(&record.report_type),
            )],
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// `history` is the transcript as it stood before `question` was asked.
#[instrument(level = "debug", skip_all, fields(turns = history.len()))]
pub fn build_request(
    record: &AnalysisRecord,
    history: &[ChatMessage],
    question: &str,
) -> GenerateContentRequest {
    let contents = history
        .iter()
        .map(|m| Content::with_role(m.role, m.text.clone()))
        .chain(std::iter::once(Content::with_role(ChatRole::User, question)))
        .collect();

    GenerateContentRequest {
        contents,
        system_instruction: Some(Content::instruction(chat_system_instruction(record))),
        generation_config: None,
    }
}

/// Never fails: problems become one of the fallback answers.
pub fn answer_from(result: HttpResult) -> String {
    let raw = match result {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "chat request failed");
            return CHAT_CONNECTION_FALLBACK.to_string();
        }
    };

    match parse_response(&raw) {
        Ok(response) => response.text().unwrap_or_else(|| {
            debug!(finish_reason = ?response.finish_reason(), "chat reply had no text");
            CHAT_EMPTY_ANSWER.to_string()
        }),
        Err(e) => {
            warn!(error = %e, "chat response rejected");
            CHAT_CONNECTION_FALLBACK.to_string()
        }
    }
}
