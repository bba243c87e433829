use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "run_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub account_id: i32,
    pub status: String,
    pub duration_ms: i64,
    pub error: Option<String>,
    pub started_at: DateTimeWithTimeZone,
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
