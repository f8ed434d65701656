//! Prompt templates and fixed user-facing texts.

use crate::model::AnalysisRecord;

/// Instruction sent alongside the report image.
pub const ANALYSIS_INSTRUCTION: &str = "You are MediGuide AI, a helpful medical assistant.
Analyze this medical report image.
Extract the data and provide a simplified explanation for a patient who is not a doctor.
Identify the test type, key values, normal ranges, and status.
Highlight any red flags calmly.
Provide general lifestyle recommendations.
ALWAYS include a disclaimer that this is AI-generated and not a replacement for a doctor.";

pub const CHAT_GUIDELINES: &str = "You are MediGuide AI. You have analyzed a patient's medical report.
Answer their follow-up questions clearly, empathetically, and simply.
Do not give specific medical prescriptions (drug names/dosages).
Always advise consulting their doctor for specific treatment.";

pub const ANALYSIS_FAILED_MESSAGE: &str =
    "Failed to analyze the image. Please ensure it's a clear medical report and try again.";

/// Answer used when the model replied without any text.
pub const CHAT_EMPTY_ANSWER: &str = "I'm sorry, I couldn't process that question right now.";

/// Answer used when the chat request itself failed.
pub const CHAT_CONNECTION_FALLBACK: &str =
    "I'm sorry, I'm having trouble connecting right now. Please try again.";

pub const ANALYZING_MESSAGE: &str = "Reading values, checking ranges, and preparing your simplified explanation. This may take a moment.";

pub const ANALYZING_TIP: &str = "Tip: Medical terms are being translated to plain English";

pub const UPLOAD_HINT: &str =
    "Ensure the image is clear and well-lit. We don't store your personal data permanently.";

pub const SERVICE_NOTICE: &str = "MediGuide AI is an informational tool and does not provide medical diagnosis. Always consult a qualified healthcare professional for medical advice.";

/// First model turn shown when the results screen opens.
#[must_use]
pub fn chat_greeting(report_type: &str) -> String {
    format!("I've analyzed your {report_type}. Ask me anything about it!")
}

/// System instruction for follow-up questions, with the report folded in.
#[must_use]
pub fn chat_system_instruction(record: &AnalysisRecord) -> String {
    format!(
        "{CHAT_GUIDELINES}\nContext (Medical Report Analysis):\nReport Type: {}\nSummary: {}\nKey Abnormalities: {}",
        record.report_type,
        record.summary,
        record.red_flags.join(", "),
    )
}
