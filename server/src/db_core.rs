pub mod prelude {
    pub use entity::prelude::*;
    pub use entity::sea_orm_active_enums::{RuleAction, RuleKind, RunMode};
    pub use entity::{agent_setting, email_log, gmail_account, run_history, triage_rule};
    pub use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr};
}
