use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Deserialize;

use crate::{
    email::client::EmailClient,
    error::AppJsonResult,
    model::account::AccountCtrl,
    prompt::sonar::SonarClassifier,
    routes::handlers::common,
    triage::orchestrator::{AccountStats, TriageOrchestrator},
    ServerState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTriageParams {
    pub lookback_days: Option<i64>,
    pub account_id: Option<i32>,
}

pub async fn run_triage(
    State(state): State<ServerState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Query(params): Query<RunTriageParams>,
) -> AppJsonResult<Vec<AccountStats>> {
    common::authorize_cron(&state.config, auth.as_deref())?;

    let lookback_days = params
        .lookback_days
        .unwrap_or(state.config.triage.lookback_days);

    let accounts = match params.account_id {
        Some(id) => vec![AccountCtrl::by_id(&state.conn, id).await?],
        None => AccountCtrl::all(&state.conn).await?,
    };

    let classifier = SonarClassifier::new(
        state.http_client.clone(),
        state.config.sonar_api_key.as_deref(),
        state.config.model.clone(),
    )?;

    // One account's failure never aborts the rest of the batch
    let mut results = Vec::with_capacity(accounts.len());
    for account in &accounts {
        let stats = match triage_account(&state, &classifier, account, lookback_days).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!("Triage failed for {}: {:?}", account.email, e);
                AccountStats {
                    account_id: account.id,
                    email: account.email.clone(),
                    failures: 1,
                    ..Default::default()
                }
            }
        };
        results.push(stats);
    }

    Ok(Json(results))
}

async fn triage_account(
    state: &ServerState,
    classifier: &SonarClassifier,
    account: &entity::gmail_account::Model,
    lookback_days: i64,
) -> crate::error::AppResult<AccountStats> {
    let mailbox = EmailClient::for_account(
        state.http_client.clone(),
        &state.conn,
        &state.config,
        account,
    )
    .await?;

    TriageOrchestrator::new(&state.conn, &mailbox, classifier, &state.config, account)
        .run(lookback_days)
        .await
}
