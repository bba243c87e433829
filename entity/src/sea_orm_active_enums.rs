use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[sea_orm(string_value = "periodic")]
    Periodic,
    #[sea_orm(string_value = "instant")]
    Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    #[sea_orm(string_value = "sender")]
    Sender,
    #[sea_orm(string_value = "subject_contains")]
    SubjectContains,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    #[sea_orm(string_value = "skip")]
    Skip,
    #[sea_orm(string_value = "no_draft")]
    NoDraft,
}
