pub use super::agent_setting::Entity as AgentSetting;
pub use super::email_log::Entity as EmailLog;
pub use super::gmail_account::Entity as GmailAccount;
pub use super::run_history::Entity as RunHistory;
pub use super::triage_rule::Entity as TriageRule;
