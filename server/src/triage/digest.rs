use chrono::{Duration, Utc};
use minijinja::render;
use serde::Serialize;

use crate::{
    db_core::prelude::*,
    email::Mailbox,
    error::AppResult,
    model::email_log::EmailLogCtrl,
    server_config::DigestConfig,
};

const DIGEST_EMAIL_TEMPLATE: &str = r#"
<html>
<body>
<p>Hello {{ account_email }}, here is what your inbox assistant handled recently.</p>
<p>
  {{ total }} messages triaged,
  {{ needs_response }} waiting on a reply,
  {{ drafts }} drafts prepared.
</p>
<table>
  <tr><th>From</th><th>Subject</th><th>Priority</th><th>Summary</th><th>Draft</th></tr>
  {% for entry in entries %}
  <tr>
    <td>{{ entry.from_address }}</td>
    <td>{{ entry.subject }}</td>
    <td>{{ entry.priority }}</td>
    <td>{{ entry.summary }}</td>
    <td>{% if entry.draft_created %}yes{% else %}no{% endif %}</td>
  </tr>
  {% endfor %}
</table>
</body>
</html>
"#;

/// True when the subject carries one of the digest markers. Used both
/// to keep digest mail out of triage and out of the digest's own input.
pub fn is_digest_subject(subject: &str, markers: &[String]) -> bool {
    let subject = subject.to_lowercase();
    markers
        .iter()
        .any(|marker| subject.contains(&marker.to_lowercase()))
}

/// Drops rows that are themselves digest emails.
pub fn digest_input(
    rows: Vec<email_log::Model>,
    markers: &[String],
) -> Vec<email_log::Model> {
    rows.into_iter()
        .filter(|row| !is_digest_subject(&row.subject, markers))
        .collect()
}

#[derive(Debug, Serialize)]
struct DigestEntry {
    from_address: String,
    subject: String,
    priority: String,
    summary: String,
    draft_created: bool,
}

pub fn build_digest_html(account_email: &str, rows: &[email_log::Model]) -> String {
    let total = rows.len();
    let needs_response = rows.iter().filter(|r| r.needs_response).count();
    let drafts = rows.iter().filter(|r| r.draft_created).count();

    let entries = rows
        .iter()
        .map(|r| DigestEntry {
            from_address: r.from_address.clone(),
            subject: r.subject.clone(),
            priority: r.priority.clone(),
            summary: r.summary.clone(),
            draft_created: r.draft_created,
        })
        .collect::<Vec<_>>();

    render!(DIGEST_EMAIL_TEMPLATE, account_email, total, needs_response, drafts, entries)
}

pub struct DigestMailer<'a, M: Mailbox> {
    conn: &'a DatabaseConnection,
    mailbox: &'a M,
    config: &'a DigestConfig,
}

impl<'a, M: Mailbox> DigestMailer<'a, M> {
    pub fn new(conn: &'a DatabaseConnection, mailbox: &'a M, config: &'a DigestConfig) -> Self {
        Self {
            conn,
            mailbox,
            config,
        }
    }

    /// Sends one digest for the account's recent triage activity.
    /// Returns false when there was nothing to report.
    pub async fn send_for_account(
        &self,
        account: &gmail_account::Model,
    ) -> AppResult<bool> {
        let cutoff = (Utc::now() - Duration::hours(self.config.lookback_hours)).fixed_offset();
        let rows = EmailLogCtrl::since(self.conn, account.id, cutoff).await?;
        let rows = digest_input(rows, &self.config.subject_markers);

        if rows.is_empty() {
            tracing::info!("No digest to send for {}", account.email);
            return Ok(false);
        }

        let subject = self
            .config
            .subject_markers
            .first()
            .cloned()
            .unwrap_or_else(|| "Inbox Summary".to_string());
        let recipient = self
            .config
            .recipient_override
            .as_deref()
            .unwrap_or(&account.email);
        let html = build_digest_html(&account.email, &rows);

        self.mailbox.send_message(recipient, &subject, &html).await?;
        tracing::info!("Digest sent for {} ({} rows)", account.email, rows.len());

        Ok(true)
    }
}
