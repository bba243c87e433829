use axum::{extract::State, Json};
use serde::Deserialize;

use crate::{
    db_core::prelude::*,
    error::{AppError, AppJsonResult},
    model::{
        account::AccountCtrl,
        settings::{AgentSettingsCtrl, SettingsUpdate},
    },
    ServerState,
};

const MIN_INTERVAL_MINUTES: i32 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsBody {
    pub account_id: i32,
    pub enabled: bool,
    /// "periodic" or "instant"
    pub run_mode: String,
    pub interval_minutes: i32,
}

pub async fn update_agent_settings(
    State(state): State<ServerState>,
    Json(body): Json<UpdateSettingsBody>,
) -> AppJsonResult<agent_setting::Model> {
    let run_mode = RunMode::try_from_value(&body.run_mode)
        .map_err(|_| AppError::BadRequest(format!("Unknown run mode '{}'", body.run_mode)))?;

    let account = AccountCtrl::by_id(&state.conn, body.account_id).await?;

    let update = SettingsUpdate {
        enabled: body.enabled,
        run_mode,
        interval_minutes: body.interval_minutes.max(MIN_INTERVAL_MINUTES),
    };
    AgentSettingsCtrl::upsert(&state.conn, account.id, update, &state.config.schedule).await?;

    let settings = AgentSettingsCtrl::for_account(&state.conn, account.id)
        .await?
        .ok_or(AppError::NotFound("Settings row missing after upsert".to_string()))?;

    Ok(Json(settings))
}
