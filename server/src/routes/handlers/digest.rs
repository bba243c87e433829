use axum::{extract::State, Json};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;

use crate::{
    email::client::EmailClient,
    error::AppJsonResult,
    model::account::AccountCtrl,
    routes::handlers::common,
    triage::digest::DigestMailer,
    ServerState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestOutcome {
    pub account_id: i32,
    pub email: String,
    pub sent: bool,
}

/// Sends a digest for every account with recent triage activity.
pub async fn send_summaries(
    State(state): State<ServerState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> AppJsonResult<Vec<DigestOutcome>> {
    common::authorize_cron(&state.config, auth.as_deref())?;

    let accounts = AccountCtrl::all(&state.conn).await?;

    let mut outcomes = Vec::with_capacity(accounts.len());
    for account in &accounts {
        let sent = match send_for_account(&state, account).await {
            Ok(sent) => sent,
            Err(e) => {
                tracing::error!("Digest failed for {}: {:?}", account.email, e);
                false
            }
        };
        outcomes.push(DigestOutcome {
            account_id: account.id,
            email: account.email.clone(),
            sent,
        });
    }

    Ok(Json(outcomes))
}

async fn send_for_account(
    state: &ServerState,
    account: &entity::gmail_account::Model,
) -> crate::error::AppResult<bool> {
    let mailbox = EmailClient::for_account(
        state.http_client.clone(),
        &state.conn,
        &state.config,
        account,
    )
    .await?;

    DigestMailer::new(&state.conn, &mailbox, &state.config.digest)
        .send_for_account(account)
        .await
}
