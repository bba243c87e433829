pub mod sonar;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppResult;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::AsRefStr,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

/// Message fields the model sees. Body is already stripped and
/// truncated by the caller.
#[derive(Debug, Clone, Default)]
pub struct ClassifyRequest {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Structured verdict for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageAnswer {
    pub needs_response: bool,
    pub priority: Priority,
    pub summary: String,
    pub proposed_labels: Vec<String>,
    pub draft_reply: Option<String>,
}

impl TriageAnswer {
    /// Verdict used when the model's answer cannot be parsed. Never
    /// drafts, so a bad answer cannot send words on the user's behalf.
    pub fn safe_default() -> Self {
        TriageAnswer {
            needs_response: false,
            priority: Priority::Normal,
            summary: "Could not classify this message".to_string(),
            proposed_labels: Vec::new(),
            draft_reply: None,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait Classifier {
    async fn classify(&self, request: &ClassifyRequest) -> AppResult<TriageAnswer>;
}

#[derive(Debug, Deserialize)]
struct RawAnswer {
    #[serde(default)]
    needs_response: bool,
    /// Kept as a string: an unknown priority must not sink the whole
    /// answer, it normalizes to `normal` instead
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    proposed_labels: Vec<String>,
    #[serde(default)]
    draft_reply: Option<String>,
}

/// Parse the model's JSON answer, tolerating markdown code fences.
/// Returns None when the content is not the expected object.
pub fn parse_triage_answer(content: &str) -> Option<TriageAnswer> {
    let stripped = strip_code_fences(content);
    let raw: RawAnswer = serde_json::from_str(stripped).ok()?;

    let draft_reply = raw
        .draft_reply
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let priority = raw
        .priority
        .as_deref()
        .and_then(|p| Priority::from_str(&p.trim().to_lowercase()).ok())
        .unwrap_or_default();

    Some(TriageAnswer {
        needs_response: raw.needs_response,
        priority,
        summary: raw.summary.unwrap_or_default(),
        proposed_labels: raw.proposed_labels,
        draft_reply,
    })
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence
    let rest = rest
        .split_once('\n')
        .map(|(_, body)| body)
        .unwrap_or(rest);

    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Debug, Deserialize)]
pub struct PromptUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub index: i32,
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatApiResponse {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<PromptUsage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatApiError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChatApiResponseOrError {
    Response(ChatApiResponse),
    Error { error: ChatApiError },
}
