use crate::db_core::prelude::*;

/// An account's active rules in deterministic match order: creation
/// order, ties broken by id. First match wins.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<triage_rule::Model>,
}

impl RuleSet {
    pub fn new(mut rules: Vec<triage_rule::Model>) -> Self {
        rules.retain(|r| r.is_enabled);
        rules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        RuleSet { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn match_first(
        &self,
        from_address: Option<&str>,
        subject: Option<&str>,
    ) -> Option<&triage_rule::Model> {
        let sender = from_address.map(|s| s.trim().to_lowercase());
        let subject = subject.map(|s| s.to_lowercase());

        self.rules.iter().find(|rule| match rule.kind {
            RuleKind::Sender => sender
                .as_deref()
                .is_some_and(|s| s == rule.pattern.trim().to_lowercase()),
            RuleKind::SubjectContains => subject
                .as_deref()
                .is_some_and(|s| s.contains(&rule.pattern.to_lowercase())),
        })
    }
}

/// Human-readable reason recorded in the log when a rule fires.
pub fn match_reason(rule: &triage_rule::Model) -> String {
    match rule.kind {
        RuleKind::Sender => format!("Sender matched rule pattern '{}'", rule.pattern),
        RuleKind::SubjectContains => {
            format!("Subject matched rule pattern '{}'", rule.pattern)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn rule(
        id: i32,
        kind: RuleKind,
        pattern: &str,
        action: RuleAction,
        created_minutes_ago: i64,
    ) -> triage_rule::Model {
        triage_rule::Model {
            id,
            account_id: 1,
            kind,
            pattern: pattern.to_string(),
            action,
            is_enabled: true,
            created_at: (Utc::now() - Duration::minutes(created_minutes_ago)).fixed_offset(),
        }
    }

    #[test]
    fn sender_rule_is_exact_and_case_insensitive() {
        let set = RuleSet::new(vec![rule(
            1,
            RuleKind::Sender,
            "Spam@X.com",
            RuleAction::Skip,
            0,
        )]);

        assert!(set.match_first(Some("spam@x.com"), None).is_some());
        assert!(set.match_first(Some("  SPAM@X.COM "), None).is_some());
        assert!(set.match_first(Some("other-spam@x.com"), None).is_none());
        assert!(set.match_first(None, Some("spam@x.com")).is_none());
    }

    #[test]
    fn subject_rule_is_substring_match() {
        let set = RuleSet::new(vec![rule(
            1,
            RuleKind::SubjectContains,
            "Invoice",
            RuleAction::NoDraft,
            0,
        )]);

        assert!(set.match_first(None, Some("Your invoice is ready")).is_some());
        assert!(set.match_first(None, Some("INVOICE #42")).is_some());
        assert!(set.match_first(None, Some("Receipt #42")).is_none());
    }

    #[test]
    fn first_match_wins_by_creation_order() {
        // Older rule was created 10 minutes before the newer one, but
        // arrives last in the vec
        let newer = rule(5, RuleKind::Sender, "a@x.com", RuleAction::NoDraft, 1);
        let older = rule(9, RuleKind::Sender, "a@x.com", RuleAction::Skip, 10);
        let set = RuleSet::new(vec![newer, older]);

        let matched = set.match_first(Some("a@x.com"), None).unwrap();
        assert_eq!(matched.action, RuleAction::Skip);
    }

    #[test]
    fn disabled_rules_never_match() {
        let mut r = rule(1, RuleKind::Sender, "a@x.com", RuleAction::Skip, 0);
        r.is_enabled = false;
        let set = RuleSet::new(vec![r]);

        assert!(set.match_first(Some("a@x.com"), None).is_none());
        assert!(set.is_empty());
    }
}
