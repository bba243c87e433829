use strum::EnumIter;

/// Labels the agent manages in the user's mailbox. Created on demand,
/// never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum TriageLabel {
    Triaged,
    NeedsReply,
    NoReply,
    DraftCreated,
    NoDraft,
    RuleSkipped,
    AwaitingUser,
}

impl TriageLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriageLabel::Triaged => "ai/triaged",
            TriageLabel::NeedsReply => "ai/needs_reply",
            TriageLabel::NoReply => "ai/no_reply",
            TriageLabel::DraftCreated => "ai/draft_created",
            TriageLabel::NoDraft => "ai/no_draft",
            TriageLabel::RuleSkipped => "ai/rule_skipped",
            TriageLabel::AwaitingUser => "ai/awaiting_user",
        }
    }
}

impl std::fmt::Display for TriageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
