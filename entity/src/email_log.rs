use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dedup ledger: unique on (account_id, message_id).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub account_id: i32,
    pub message_id: String,
    pub subject: String,
    pub from_address: String,
    pub summary: String,
    pub needs_response: bool,
    pub priority: String,
    pub draft_created: bool,
    pub created_at: DateTimeWithTimeZone,
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
