use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::RunMode;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "agent_setting")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: i32,
    pub enabled: bool,
    pub run_mode: RunMode,
    pub interval_minutes: i32,
    pub timezone: String,
    pub window_start: String,
    pub window_end: String,
    pub last_run_at: Option<DateTimeWithTimeZone>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::gmail_account::Entity",
        from = "Column::AccountId",
        to = "super::gmail_account::Column::Id"
    )]
    GmailAccount,
}

impl Related<super::gmail_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GmailAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
