use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    db_core::prelude::*,
    error::{AppError, AppJsonResult},
    model::{account::AccountCtrl, rule::TriageRuleCtrl},
    ServerState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRuleBody {
    pub account_id: i32,
    /// "sender" or "subject_contains"
    pub kind: String,
    pub pattern: String,
    /// "skip" or "no_draft"
    pub action: String,
}

pub async fn create_rule(
    State(state): State<ServerState>,
    Json(body): Json<CreateRuleBody>,
) -> AppJsonResult<triage_rule::Model> {
    let kind = RuleKind::try_from_value(&body.kind)
        .map_err(|_| AppError::BadRequest(format!("Unknown rule kind '{}'", body.kind)))?;
    let action = RuleAction::try_from_value(&body.action)
        .map_err(|_| AppError::BadRequest(format!("Unknown rule action '{}'", body.action)))?;

    let pattern = body.pattern.trim().to_string();
    if pattern.is_empty() {
        return Err(AppError::BadRequest("Rule pattern cannot be empty".to_string()));
    }

    // 404 on unknown account
    let account = AccountCtrl::by_id(&state.conn, body.account_id).await?;

    let rule = TriageRuleCtrl::insert(&state.conn, account.id, kind, pattern, action).await?;

    Ok(Json(rule))
}
