use std::collections::HashMap;

pub mod client;
pub mod mime;
pub mod simplified_message;

use simplified_message::SimplifiedMessage;

/// Inputs for a reply draft placed on the original thread.
#[derive(Debug, Clone)]
pub struct ReplyDraft {
    pub thread_id: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    /// RFC 5322 Message-ID of the message being replied to
    pub in_reply_to: Option<String>,
    /// HTML signature appended below the body
    pub signature_html: Option<String>,
}

/// The mailbox operations triage needs. `EmailClient` is the Gmail
/// implementation; tests swap in a mock.
#[allow(async_fn_in_trait)]
pub trait Mailbox {
    /// Ids of recent inbox messages, newest first.
    async fn list_recent_inbox(
        &self,
        lookback_days: i64,
        max_results: u32,
    ) -> anyhow::Result<Vec<String>>;

    async fn fetch_message(&self, message_id: &str) -> anyhow::Result<SimplifiedMessage>;

    /// Creates any missing agent labels and returns name -> label id.
    async fn ensure_labels(&self, names: &[&str]) -> anyhow::Result<HashMap<String, String>>;

    async fn add_labels(&self, message_id: &str, label_ids: &[String]) -> anyhow::Result<()>;

    /// The account's default send-as signature, when one is set.
    async fn signature_html(&self) -> anyhow::Result<Option<String>>;

    /// Returns the created draft's id.
    async fn create_reply_draft(&self, draft: &ReplyDraft) -> anyhow::Result<String>;

    async fn send_message(&self, to: &str, subject: &str, html_body: &str)
        -> anyhow::Result<()>;
}
