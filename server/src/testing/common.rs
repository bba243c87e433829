use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use anyhow::anyhow;
use chrono::Utc;

use crate::{
    db_core::prelude::*,
    email::{simplified_message::SimplifiedMessage, Mailbox, ReplyDraft},
    error::AppResult,
    prompt::{Classifier, ClassifyRequest, TriageAnswer},
};

pub fn account(id: i32) -> gmail_account::Model {
    let now = Utc::now().fixed_offset();
    gmail_account::Model {
        id,
        email: format!("user{}@example.com", id),
        access_token: "token".to_string(),
        refresh_token: "refresh".to_string(),
        token_expires_at: now + chrono::Duration::hours(1),
        created_at: now,
        updated_at: now,
    }
}

pub fn skip_rule(id: i32, sender: &str) -> triage_rule::Model {
    triage_rule::Model {
        id,
        account_id: 1,
        kind: RuleKind::Sender,
        pattern: sender.to_string(),
        action: RuleAction::Skip,
        is_enabled: true,
        created_at: Utc::now().fixed_offset(),
    }
}

pub fn email_log_row(account_id: i32, message_id: &str) -> email_log::Model {
    email_log::Model {
        id: 1,
        account_id,
        message_id: message_id.to_string(),
        subject: "Quick question".to_string(),
        from_address: "jane@example.com".to_string(),
        summary: "Wants a reply".to_string(),
        needs_response: true,
        priority: "high".to_string(),
        draft_created: true,
        created_at: Utc::now().fixed_offset(),
    }
}

/// In-memory mailbox recording every side effect.
pub struct MockMailbox {
    messages: Vec<SimplifiedMessage>,
    drafts: AtomicUsize,
    sent: AtomicUsize,
    pub labels_applied: Mutex<Vec<(String, Vec<String>)>>,
}

impl MockMailbox {
    pub fn new(messages: Vec<SimplifiedMessage>) -> Self {
        Self {
            messages,
            drafts: AtomicUsize::new(0),
            sent: AtomicUsize::new(0),
            labels_applied: Mutex::new(Vec::new()),
        }
    }

    pub fn drafts_created(&self) -> usize {
        self.drafts.load(Ordering::SeqCst)
    }

    pub fn messages_sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

impl Mailbox for MockMailbox {
    async fn list_recent_inbox(
        &self,
        _lookback_days: i64,
        _max_results: u32,
    ) -> anyhow::Result<Vec<String>> {
        Ok(self.messages.iter().map(|m| m.id.clone()).collect())
    }

    async fn fetch_message(&self, message_id: &str) -> anyhow::Result<SimplifiedMessage> {
        self.messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| anyhow!("No such message {}", message_id))
    }

    async fn ensure_labels(&self, names: &[&str]) -> anyhow::Result<HashMap<String, String>> {
        Ok(names
            .iter()
            .map(|n| (n.to_string(), format!("id-{}", n)))
            .collect())
    }

    async fn add_labels(&self, message_id: &str, label_ids: &[String]) -> anyhow::Result<()> {
        self.labels_applied
            .lock()
            .unwrap()
            .push((message_id.to_string(), label_ids.to_vec()));
        Ok(())
    }

    async fn signature_html(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn create_reply_draft(&self, _draft: &ReplyDraft) -> anyhow::Result<String> {
        let n = self.drafts.fetch_add(1, Ordering::SeqCst);
        Ok(format!("draft-{}", n + 1))
    }

    async fn send_message(
        &self,
        _to: &str,
        _subject: &str,
        _html_body: &str,
    ) -> anyhow::Result<()> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Classifier returning a canned answer, with an optional one-shot
/// failure.
pub struct MockClassifier {
    answer: TriageAnswer,
    calls: AtomicUsize,
    fail_next: AtomicBool,
}

impl MockClassifier {
    pub fn new(answer: TriageAnswer) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn failing_once(answer: TriageAnswer) -> Self {
        let mock = Self::new(answer);
        mock.fail_next.store(true, Ordering::SeqCst);
        mock
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for MockClassifier {
    async fn classify(&self, _request: &ClassifyRequest) -> AppResult<TriageAnswer> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("classifier unavailable").into());
        }
        self.calls.fetch_add(1, Ordering::SeqCst);

        Ok(self.answer.clone())
    }
}
