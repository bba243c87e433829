pub mod prelude;

pub mod agent_setting;
pub mod email_log;
pub mod gmail_account;
pub mod run_history;
pub mod sea_orm_active_enums;
pub mod triage_rule;
