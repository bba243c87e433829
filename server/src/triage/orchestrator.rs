use serde::Serialize;
use strum::IntoEnumIterator;

use crate::{
    db_core::prelude::*,
    email::{simplified_message::SimplifiedMessage, Mailbox, ReplyDraft},
    error::AppResult,
    model::{
        email_log::{EmailLogCtrl, NewEmailLog},
        labels::TriageLabel,
        rule::TriageRuleCtrl,
    },
    prompt::{Classifier, ClassifyRequest, TriageAnswer},
    server_config::{DigestTrigger, ServerConfig},
    triage::{
        digest::{self, DigestMailer},
        rules::{self, RuleSet},
    },
};

/// What to do with one fetched message. Pure decision, no I/O.
#[derive(Debug, PartialEq)]
pub enum MessagePlan<'a> {
    /// One of our own digest emails; log it, never classify it
    DigestMail,
    /// A skip rule fired; no classification, no draft
    RuleSkip(&'a triage_rule::Model),
    Classify {
        /// Set when a no_draft rule fired; classification runs but any
        /// reply is suppressed
        suppress_draft: Option<&'a triage_rule::Model>,
    },
}

pub fn plan_message<'a>(
    message: &SimplifiedMessage,
    rules: &'a RuleSet,
    digest_markers: &[String],
) -> MessagePlan<'a> {
    if let Some(subject) = message.subject.as_deref() {
        if digest::is_digest_subject(subject, digest_markers) {
            return MessagePlan::DigestMail;
        }
    }

    match rules.match_first(message.from_address.as_deref(), message.subject.as_deref()) {
        Some(rule) if rule.action == RuleAction::Skip => MessagePlan::RuleSkip(rule),
        Some(rule) => MessagePlan::Classify {
            suppress_draft: Some(rule),
        },
        None => MessagePlan::Classify {
            suppress_draft: None,
        },
    }
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStats {
    pub account_id: i32,
    pub email: String,
    pub listed: usize,
    /// Rows written to the log this run
    pub processed: usize,
    pub duplicates: usize,
    pub skipped_by_rule: usize,
    pub skipped_digest_mail: usize,
    pub classified: usize,
    pub drafts_created: usize,
    pub failures: usize,
    pub digest_sent: bool,
}

pub struct TriageOrchestrator<'a, M: Mailbox, C: Classifier> {
    conn: &'a DatabaseConnection,
    mailbox: &'a M,
    classifier: &'a C,
    config: &'a ServerConfig,
    account: &'a gmail_account::Model,
}

impl<'a, M: Mailbox, C: Classifier> TriageOrchestrator<'a, M, C> {
    pub fn new(
        conn: &'a DatabaseConnection,
        mailbox: &'a M,
        classifier: &'a C,
        config: &'a ServerConfig,
        account: &'a gmail_account::Model,
    ) -> Self {
        Self {
            conn,
            mailbox,
            classifier,
            config,
            account,
        }
    }

    /// Runs one triage sweep over the account's recent inbox.
    pub async fn run(&self, lookback_days: i64) -> AppResult<AccountStats> {
        let mut stats = AccountStats {
            account_id: self.account.id,
            email: self.account.email.clone(),
            ..Default::default()
        };

        let rules = RuleSet::new(
            TriageRuleCtrl::active_for_account(self.conn, self.account.id).await?,
        );

        let base_names = TriageLabel::iter().map(|l| l.as_str()).collect::<Vec<_>>();
        let label_ids = self.mailbox.ensure_labels(&base_names).await?;

        let signature = match self.config.signature_override.clone() {
            Some(sig) => Some(sig),
            None => match self.mailbox.signature_html().await {
                Ok(sig) => sig,
                Err(e) => {
                    tracing::warn!("Could not fetch signature for {}: {:?}", self.account.email, e);
                    None
                }
            },
        };

        let message_ids = self
            .mailbox
            .list_recent_inbox(lookback_days, self.config.triage.max_messages)
            .await?;
        stats.listed = message_ids.len();

        for message_id in &message_ids {
            if EmailLogCtrl::exists(self.conn, self.account.id, message_id).await? {
                stats.duplicates += 1;
                continue;
            }

            let message = match self.mailbox.fetch_message(message_id).await {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("Could not fetch message {}: {:?}", message_id, e);
                    stats.failures += 1;
                    continue;
                }
            };

            match plan_message(&message, &rules, &self.config.digest.subject_markers) {
                MessagePlan::DigestMail => {
                    stats.skipped_digest_mail += 1;
                    if self
                        .log_message(&message, false, false, "Inbox digest email, not triaged")
                        .await?
                    {
                        stats.processed += 1;
                    } else {
                        stats.duplicates += 1;
                    }
                }
                MessagePlan::RuleSkip(rule) => {
                    stats.skipped_by_rule += 1;
                    self.apply_labels(
                        &message.id,
                        &label_ids,
                        &[TriageLabel::Triaged, TriageLabel::RuleSkipped],
                    )
                    .await;
                    if self
                        .log_message(&message, false, false, &rules::match_reason(rule))
                        .await?
                    {
                        stats.processed += 1;
                    } else {
                        stats.duplicates += 1;
                    }
                }
                MessagePlan::Classify { suppress_draft } => {
                    self.classify_and_log(&message, suppress_draft, &label_ids, &signature, &mut stats)
                        .await?;
                }
            }
        }

        stats.digest_sent = self.maybe_send_digest(&stats).await?;

        tracing::info!(
            "Triage run for {}: {} listed, {} processed, {} drafts",
            self.account.email,
            stats.listed,
            stats.processed,
            stats.drafts_created
        );

        Ok(stats)
    }

    async fn classify_and_log(
        &self,
        message: &SimplifiedMessage,
        suppress_draft: Option<&triage_rule::Model>,
        label_ids: &std::collections::HashMap<String, String>,
        signature: &Option<String>,
        stats: &mut AccountStats,
    ) -> AppResult<()> {
        let mut body = message.body.clone().unwrap_or_default();
        body.truncate(self.config.triage.body_char_limit);

        let request = ClassifyRequest {
            sender: message.from.clone().unwrap_or_default(),
            recipient: message
                .to
                .clone()
                .unwrap_or_else(|| self.account.email.clone()),
            subject: message.subject.clone().unwrap_or_default(),
            body,
        };

        let answer = match self.classifier.classify(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Classification failed for {}: {:?}", message.id, e);
                self.apply_labels(
                    &message.id,
                    label_ids,
                    &[TriageLabel::Triaged, TriageLabel::NoReply],
                )
                .await;
                self.log_message(message, false, false, "AI classification failed")
                    .await?;
                stats.failures += 1;
                stats.processed += 1;
                return Ok(());
            }
        };
        stats.classified += 1;

        let verdict_label = if answer.needs_response {
            TriageLabel::NeedsReply
        } else {
            TriageLabel::NoReply
        };

        let draft_created = if suppress_draft.is_some() {
            self.apply_labels(
                &message.id,
                label_ids,
                &[TriageLabel::Triaged, verdict_label, TriageLabel::NoDraft],
            )
            .await;
            false
        } else if answer.needs_response && answer.draft_reply.is_some() {
            let created = self.create_draft(message, &answer, signature).await;
            let outcome_label = if created {
                TriageLabel::AwaitingUser
            } else {
                TriageLabel::NoDraft
            };
            let mut labels = vec![TriageLabel::Triaged, verdict_label];
            if created {
                labels.push(TriageLabel::DraftCreated);
            }
            labels.push(outcome_label);
            self.apply_labels(&message.id, label_ids, &labels).await;
            created
        } else {
            self.apply_labels(&message.id, label_ids, &[TriageLabel::Triaged, verdict_label])
                .await;
            false
        };

        if draft_created {
            stats.drafts_created += 1;
        }

        self.apply_proposed_labels(&message.id, &answer).await;

        let log = NewEmailLog {
            account_id: self.account.id,
            message_id: message.id.clone(),
            subject: message.subject.clone().unwrap_or_default(),
            from_address: message.from_address.clone().unwrap_or_default(),
            summary: answer.summary.clone(),
            needs_response: answer.needs_response,
            priority: answer.priority.as_str().to_string(),
            draft_created,
        };
        if EmailLogCtrl::insert(self.conn, log).await? {
            stats.processed += 1;
        } else {
            // A concurrent run logged it first
            stats.duplicates += 1;
        }

        Ok(())
    }

    async fn create_draft(
        &self,
        message: &SimplifiedMessage,
        answer: &TriageAnswer,
        signature: &Option<String>,
    ) -> bool {
        let Some(to) = message.reply_address() else {
            tracing::warn!("No reply address for message {}, skipping draft", message.id);
            return false;
        };
        let Some(body) = answer.draft_reply.as_deref() else {
            return false;
        };

        let draft = ReplyDraft {
            thread_id: message.thread_id.clone(),
            to: to.to_string(),
            subject: message.subject.clone().unwrap_or_default(),
            body: body.to_string(),
            in_reply_to: message.rfc_message_id.clone(),
            signature_html: signature.clone(),
        };

        match self.mailbox.create_reply_draft(&draft).await {
            Ok(draft_id) => {
                tracing::info!("Draft {} created for message {}", draft_id, message.id);
                true
            }
            Err(e) => {
                tracing::warn!("Draft creation failed for {}: {:?}", message.id, e);
                false
            }
        }
    }

    /// Label failures are logged and swallowed; the log row still gets
    /// written.
    async fn apply_labels(
        &self,
        message_id: &str,
        label_ids: &std::collections::HashMap<String, String>,
        labels: &[TriageLabel],
    ) {
        let ids = labels
            .iter()
            .filter_map(|l| label_ids.get(l.as_str()).cloned())
            .collect::<Vec<_>>();

        if let Err(e) = self.mailbox.add_labels(message_id, &ids).await {
            tracing::warn!("Could not label message {}: {:?}", message_id, e);
        }
    }

    async fn apply_proposed_labels(&self, message_id: &str, answer: &TriageAnswer) {
        let names = answer
            .proposed_labels
            .iter()
            .map(|l| format!("ai/{}", l.trim().to_lowercase().replace(' ', "-")))
            .filter(|l| l.len() > 3)
            .take(self.config.triage.max_proposed_labels)
            .collect::<Vec<_>>();
        if names.is_empty() {
            return;
        }

        let name_refs = names.iter().map(|s| s.as_str()).collect::<Vec<_>>();
        let ids = match self.mailbox.ensure_labels(&name_refs).await {
            Ok(map) => names.iter().filter_map(|n| map.get(n).cloned()).collect::<Vec<_>>(),
            Err(e) => {
                tracing::warn!("Could not create proposed labels: {:?}", e);
                return;
            }
        };

        if let Err(e) = self.mailbox.add_labels(message_id, &ids).await {
            tracing::warn!("Could not apply proposed labels to {}: {:?}", message_id, e);
        }
    }

    async fn log_message(
        &self,
        message: &SimplifiedMessage,
        needs_response: bool,
        draft_created: bool,
        summary: &str,
    ) -> AppResult<bool> {
        let log = NewEmailLog {
            account_id: self.account.id,
            message_id: message.id.clone(),
            subject: message.subject.clone().unwrap_or_default(),
            from_address: message.from_address.clone().unwrap_or_default(),
            summary: summary.to_string(),
            needs_response,
            priority: crate::prompt::Priority::Normal.as_str().to_string(),
            draft_created,
        };

        EmailLogCtrl::insert(self.conn, log).await
    }

    async fn maybe_send_digest(&self, stats: &AccountStats) -> AppResult<bool> {
        let fire = match self.config.digest.trigger {
            DigestTrigger::DraftsCreated => stats.drafts_created > 0,
            DigestTrigger::AnyProcessed => stats.processed > 0,
            DigestTrigger::Disabled => false,
        };
        if !fire {
            return Ok(false);
        }

        DigestMailer::new(self.conn, self.mailbox, &self.config.digest)
            .send_for_account(self.account)
            .await
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;
    use crate::prompt::Priority;
    use crate::testing::common::{account, email_log_row, skip_rule, MockClassifier, MockMailbox};

    fn config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.digest.trigger = DigestTrigger::Disabled;
        config
    }

    fn message(id: &str, from: &str, subject: &str) -> SimplifiedMessage {
        SimplifiedMessage {
            id: id.to_string(),
            thread_id: format!("t-{}", id),
            from: Some(from.to_string()),
            from_address: Some(from.to_string()),
            to: None,
            reply_to: None,
            rfc_message_id: Some(format!("<{}@mail>", id)),
            subject: Some(subject.to_string()),
            body: Some("Hello there".to_string()),
        }
    }

    fn answer_with_draft() -> TriageAnswer {
        TriageAnswer {
            needs_response: true,
            priority: Priority::High,
            summary: "Wants a reply".to_string(),
            proposed_labels: vec![],
            draft_reply: Some("On it, thanks!".to_string()),
        }
    }

    #[tokio::test]
    async fn skip_rule_prevents_classification() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![skip_rule(1, "spam@x.com")]])
            .append_query_results([Vec::<email_log::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            .into_connection();

        let mailbox = MockMailbox::new(vec![message("m1", "spam@x.com", "Buy now")]);
        let classifier = MockClassifier::new(answer_with_draft());
        let config = config();
        let account = account(1);

        let orchestrator =
            TriageOrchestrator::new(&conn, &mailbox, &classifier, &config, &account);
        let stats = orchestrator.run(14).await.unwrap();

        assert_eq!(classifier.calls(), 0);
        assert_eq!(mailbox.drafts_created(), 0);
        assert_eq!(stats.skipped_by_rule, 1);
        assert_eq!(stats.processed, 1);
    }

    #[tokio::test]
    async fn no_draft_rule_classifies_but_suppresses_draft() {
        let mut rule = skip_rule(1, "boss@x.com");
        rule.action = RuleAction::NoDraft;

        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![rule]])
            .append_query_results([Vec::<email_log::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            .into_connection();

        let mailbox = MockMailbox::new(vec![message("m1", "boss@x.com", "Status?")]);
        let classifier = MockClassifier::new(answer_with_draft());
        let config = config();
        let account = account(1);

        let orchestrator =
            TriageOrchestrator::new(&conn, &mailbox, &classifier, &config, &account);
        let stats = orchestrator.run(14).await.unwrap();

        assert_eq!(classifier.calls(), 1);
        assert_eq!(mailbox.drafts_created(), 0);
        assert_eq!(stats.drafts_created, 0);
        assert_eq!(stats.classified, 1);
    }

    #[tokio::test]
    async fn needs_response_creates_one_draft() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<triage_rule::Model>::new()])
            .append_query_results([Vec::<email_log::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            .into_connection();

        let mailbox = MockMailbox::new(vec![message("m1", "jane@x.com", "Quick question")]);
        let classifier = MockClassifier::new(answer_with_draft());
        let config = config();
        let account = account(1);

        let orchestrator =
            TriageOrchestrator::new(&conn, &mailbox, &classifier, &config, &account);
        let stats = orchestrator.run(14).await.unwrap();

        assert_eq!(mailbox.drafts_created(), 1);
        assert_eq!(stats.drafts_created, 1);
    }

    #[tokio::test]
    async fn lost_dedup_race_counts_as_duplicate() {
        // The dedup lookup misses but a concurrent run wins the insert,
        // so the unique index reports zero rows written
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![skip_rule(1, "spam@x.com")]])
            .append_query_results([Vec::<email_log::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let mailbox = MockMailbox::new(vec![message("m1", "spam@x.com", "Buy now")]);
        let classifier = MockClassifier::new(answer_with_draft());
        let config = config();
        let account = account(1);

        let orchestrator =
            TriageOrchestrator::new(&conn, &mailbox, &classifier, &config, &account);
        let stats = orchestrator.run(14).await.unwrap();

        assert_eq!(stats.skipped_by_rule, 1);
        assert_eq!(stats.processed, 0);
        assert_eq!(stats.duplicates, 1);
    }

    #[tokio::test]
    async fn already_logged_message_is_not_reprocessed() {
        // Second sweep sees the row written by the first and stops at
        // the dedup check
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            // First run
            .append_query_results([Vec::<triage_rule::Model>::new()])
            .append_query_results([Vec::<email_log::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            // Second run
            .append_query_results([Vec::<triage_rule::Model>::new()])
            .append_query_results([vec![email_log_row(1, "m1")]])
            .into_connection();

        let mailbox = MockMailbox::new(vec![message("m1", "jane@x.com", "Quick question")]);
        let classifier = MockClassifier::new(answer_with_draft());
        let config = config();
        let account = account(1);

        let orchestrator =
            TriageOrchestrator::new(&conn, &mailbox, &classifier, &config, &account);
        let first = orchestrator.run(14).await.unwrap();
        let second = orchestrator.run(14).await.unwrap();

        assert_eq!(first.processed, 1);
        assert_eq!(second.processed, 0);
        assert_eq!(second.duplicates, 1);
        assert_eq!(mailbox.drafts_created(), 1);
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn digest_mail_is_logged_but_never_classified() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<triage_rule::Model>::new()])
            .append_query_results([Vec::<email_log::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            .into_connection();

        let mailbox = MockMailbox::new(vec![message("m1", "me@x.com", "AI Email Summary")]);
        let classifier = MockClassifier::new(answer_with_draft());
        let config = config();
        let account = account(1);

        let orchestrator =
            TriageOrchestrator::new(&conn, &mailbox, &classifier, &config, &account);
        let stats = orchestrator.run(14).await.unwrap();

        assert_eq!(classifier.calls(), 0);
        assert_eq!(stats.skipped_digest_mail, 1);
        assert_eq!(stats.processed, 1);
    }

    #[tokio::test]
    async fn digest_fires_after_a_draft_when_configured() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<triage_rule::Model>::new()])
            .append_query_results([Vec::<email_log::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            // Digest input query
            .append_query_results([vec![email_log_row(1, "m1")]])
            .into_connection();

        let mailbox = MockMailbox::new(vec![message("m1", "jane@x.com", "Quick question")]);
        let classifier = MockClassifier::new(answer_with_draft());
        let mut config = config();
        config.digest.trigger = DigestTrigger::DraftsCreated;
        let account = account(1);

        let orchestrator =
            TriageOrchestrator::new(&conn, &mailbox, &classifier, &config, &account);
        let stats = orchestrator.run(14).await.unwrap();

        assert!(stats.digest_sent);
        assert_eq!(mailbox.messages_sent(), 1);
    }

    #[tokio::test]
    async fn classifier_failure_is_per_message() {
        let conn = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<triage_rule::Model>::new()])
            .append_query_results([Vec::<email_log::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            .append_query_results([Vec::<email_log::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 2,
                rows_affected: 1,
            }])
            .into_connection();

        let mailbox = MockMailbox::new(vec![
            message("m1", "jane@x.com", "First"),
            message("m2", "joe@x.com", "Second"),
        ]);
        let classifier = MockClassifier::failing_once(answer_with_draft());
        let config = config();
        let account = account(1);

        let orchestrator =
            TriageOrchestrator::new(&conn, &mailbox, &classifier, &config, &account);
        let stats = orchestrator.run(14).await.unwrap();

        assert_eq!(stats.failures, 1);
        assert_eq!(stats.classified, 1);
        assert_eq!(stats.processed, 2);
    }

    #[test]
    fn plan_prefers_digest_marker_over_rules() {
        let config = ServerConfig::default();
        let rules = RuleSet::new(vec![skip_rule(1, "me@x.com")]);
        let msg = message("m1", "me@x.com", "Inbox Summary for today");

        let plan = plan_message(&msg, &rules, &config.digest.subject_markers);

        assert_eq!(plan, MessagePlan::DigestMail);
    }

    #[test]
    fn plan_falls_through_to_classify() {
        let config = ServerConfig::default();
        let rules = RuleSet::new(vec![]);
        let msg = message("m1", "jane@x.com", "Hello");

        let plan = plan_message(&msg, &rules, &config.digest.subject_markers);

        assert_eq!(
            plan,
            MessagePlan::Classify {
                suppress_draft: None
            }
        );
    }
}
