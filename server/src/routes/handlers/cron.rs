use axum::{extract::State, Json};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    error::AppJsonResult,
    routes::handlers::common,
    triage::runner::{self, RunReport},
    ServerState,
};

/// The external cron's entry point: gate every account, dispatch
/// triage for the due ones.
pub async fn agent_runner(
    State(state): State<ServerState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> AppJsonResult<RunReport> {
    common::authorize_cron(&state.config, auth.as_deref())?;

    let report = runner::run_due_accounts(&state.http_client, &state.conn, &state.config).await?;

    Ok(Json(report))
}
