use chrono::Utc;

use crate::{db_core::prelude::*, error::AppResult};

pub struct TriageRuleCtrl;

impl TriageRuleCtrl {
    /// Enabled rules for one account, oldest first. Match order is
    /// creation order, ties broken by id.
    pub async fn active_for_account(
        conn: &DatabaseConnection,
        account_id: i32,
    ) -> AppResult<Vec<triage_rule::Model>> {
        let rules = TriageRule::find()
            .filter(triage_rule::Column::AccountId.eq(account_id))
            .filter(triage_rule::Column::IsEnabled.eq(true))
            .order_by(triage_rule::Column::CreatedAt, Order::Asc)
            .order_by(triage_rule::Column::Id, Order::Asc)
            .all(conn)
            .await?;

        Ok(rules)
    }

    pub async fn insert(
        conn: &DatabaseConnection,
        account_id: i32,
        kind: RuleKind,
        pattern: String,
        action: RuleAction,
    ) -> AppResult<triage_rule::Model> {
        let active_model = triage_rule::ActiveModel {
            account_id: ActiveValue::Set(account_id),
            kind: ActiveValue::Set(kind),
            pattern: ActiveValue::Set(pattern),
            action: ActiveValue::Set(action),
            is_enabled: ActiveValue::Set(true),
            created_at: ActiveValue::Set(Utc::now().fixed_offset()),
            ..Default::default()
        };

        let rule = active_model.insert(conn).await?;

        Ok(rule)
    }
}
