use chrono::Utc;
use sea_orm::sea_query::OnConflict;

use crate::{db_core::prelude::*, error::AppResult, server_config::ScheduleConfig};

pub struct AgentSettingsCtrl;

/// Settings-endpoint fields. Schedule columns keep their stored (or
/// default) values on upsert.
pub struct SettingsUpdate {
    pub enabled: bool,
    pub run_mode: RunMode,
    pub interval_minutes: i32,
}

impl AgentSettingsCtrl {
    pub async fn all(conn: &DatabaseConnection) -> AppResult<Vec<agent_setting::Model>> {
        let settings = AgentSetting::find().all(conn).await?;

        Ok(settings)
    }

    pub async fn for_account(
        conn: &DatabaseConnection,
        account_id: i32,
    ) -> AppResult<Option<agent_setting::Model>> {
        let settings = AgentSetting::find_by_id(account_id).one(conn).await?;

        Ok(settings)
    }

    pub async fn upsert(
        conn: &DatabaseConnection,
        account_id: i32,
        update: SettingsUpdate,
        defaults: &ScheduleConfig,
    ) -> AppResult<()> {
        let active_model = Self::default_row(account_id, defaults, |am| {
            am.enabled = ActiveValue::Set(update.enabled);
            am.run_mode = ActiveValue::Set(update.run_mode.clone());
            am.interval_minutes = ActiveValue::Set(update.interval_minutes);
        });

        AgentSetting::insert(active_model)
            .on_conflict(
                OnConflict::column(agent_setting::Column::AccountId)
                    .update_columns([
                        agent_setting::Column::Enabled,
                        agent_setting::Column::RunMode,
                        agent_setting::Column::IntervalMinutes,
                        agent_setting::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }

    /// Stamps last_run_at = now, creating a default settings row when the
    /// account has none yet.
    pub async fn touch_last_run(
        conn: &DatabaseConnection,
        account_id: i32,
        defaults: &ScheduleConfig,
    ) -> AppResult<()> {
        let now = Utc::now().fixed_offset();
        let active_model = Self::default_row(account_id, defaults, |am| {
            am.last_run_at = ActiveValue::Set(Some(now));
        });

        AgentSetting::insert(active_model)
            .on_conflict(
                OnConflict::column(agent_setting::Column::AccountId)
                    .update_columns([
                        agent_setting::Column::LastRunAt,
                        agent_setting::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        Ok(())
    }

    fn default_row(
        account_id: i32,
        defaults: &ScheduleConfig,
        apply: impl FnOnce(&mut agent_setting::ActiveModel),
    ) -> agent_setting::ActiveModel {
        let now = Utc::now().fixed_offset();
        let mut active_model = agent_setting::ActiveModel {
            account_id: ActiveValue::Set(account_id),
            enabled: ActiveValue::Set(true),
            run_mode: ActiveValue::Set(RunMode::Periodic),
            interval_minutes: ActiveValue::Set(defaults.default_interval_minutes),
            timezone: ActiveValue::Set(defaults.default_timezone.clone()),
            window_start: ActiveValue::Set(defaults.default_window_start.clone()),
            window_end: ActiveValue::Set(defaults.default_window_end.clone()),
            last_run_at: ActiveValue::Set(None),
            updated_at: ActiveValue::Set(now),
        };
        apply(&mut active_model);

        active_model
    }
}
