use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::OnConflict;

use crate::{db_core::prelude::*, error::AppResult};

pub struct EmailLogCtrl;

/// Row data for one processed message. The (account_id, message_id)
/// pair is the dedup key.
pub struct NewEmailLog {
    pub account_id: i32,
    pub message_id: String,
    pub subject: String,
    pub from_address: String,
    pub summary: String,
    pub needs_response: bool,
    pub priority: String,
    pub draft_created: bool,
}

impl EmailLogCtrl {
    pub async fn exists(
        conn: &DatabaseConnection,
        account_id: i32,
        message_id: &str,
    ) -> AppResult<bool> {
        let found = EmailLog::find()
            .filter(email_log::Column::AccountId.eq(account_id))
            .filter(email_log::Column::MessageId.eq(message_id))
            .one(conn)
            .await?;

        Ok(found.is_some())
    }

    /// Inserts the row, returning false when the dedup key already
    /// exists. Concurrent sweeps race here; the unique index decides.
    pub async fn insert(conn: &DatabaseConnection, log: NewEmailLog) -> AppResult<bool> {
        let active_model = email_log::ActiveModel {
            account_id: ActiveValue::Set(log.account_id),
            message_id: ActiveValue::Set(log.message_id),
            subject: ActiveValue::Set(log.subject),
            from_address: ActiveValue::Set(log.from_address),
            summary: ActiveValue::Set(log.summary),
            needs_response: ActiveValue::Set(log.needs_response),
            priority: ActiveValue::Set(log.priority),
            draft_created: ActiveValue::Set(log.draft_created),
            created_at: ActiveValue::Set(Utc::now().fixed_offset()),
            ..Default::default()
        };

        let result = EmailLog::insert(active_model)
            .on_conflict(
                OnConflict::columns([
                    email_log::Column::AccountId,
                    email_log::Column::MessageId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Ok(result > 0)
    }

    /// Logs recorded since the cutoff, newest first. Digest input.
    pub async fn since(
        conn: &DatabaseConnection,
        account_id: i32,
        cutoff: DateTime<FixedOffset>,
    ) -> AppResult<Vec<email_log::Model>> {
        let logs = EmailLog::find()
            .filter(email_log::Column::AccountId.eq(account_id))
            .filter(email_log::Column::CreatedAt.gte(cutoff))
            .order_by(email_log::Column::CreatedAt, Order::Desc)
            .all(conn)
            .await?;

        Ok(logs)
    }
}
