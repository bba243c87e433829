use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gmail_account")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::agent_setting::Entity")]
    AgentSetting,
    #[sea_orm(has_many = "super::triage_rule::Entity")]
    TriageRule,
    #[sea_orm(has_many = "super::email_log::Entity")]
    EmailLog,
    #[sea_orm(has_many = "super::run_history::Entity")]
    RunHistory,
}

impl Related<super::agent_setting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AgentSetting.def()
    }
}

impl Related<super::triage_rule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TriageRule.def()
    }
}

impl Related<super::email_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EmailLog.def()
    }
}

impl Related<super::run_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RunHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
