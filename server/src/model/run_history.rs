use chrono::{DateTime, FixedOffset};

use crate::{db_core::prelude::*, error::AppResult};

pub struct RunHistoryCtrl;

impl RunHistoryCtrl {
    pub async fn insert(
        conn: &DatabaseConnection,
        account_id: i32,
        status: &str,
        duration_ms: i64,
        error: Option<String>,
        started_at: DateTime<FixedOffset>,
    ) -> AppResult<()> {
        let active_model = run_history::ActiveModel {
            account_id: ActiveValue::Set(account_id),
            status: ActiveValue::Set(status.to_string()),
            duration_ms: ActiveValue::Set(duration_ms),
            error: ActiveValue::Set(error),
            started_at: ActiveValue::Set(started_at),
            ..Default::default()
        };

        RunHistory::insert(active_model)
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }
}
