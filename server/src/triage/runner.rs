use chrono::Utc;
use serde::Serialize;

use crate::{
    db_core::prelude::*,
    error::{AppError, AppResult},
    model::{
        account::AccountCtrl, run_history::RunHistoryCtrl, settings::AgentSettingsCtrl,
    },
    server_config::ServerConfig,
    triage::schedule::{self, GateDecision, ScheduleView, SkipReason},
    HttpClient,
};

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReasons {
    pub disabled: usize,
    pub instant_mode: usize,
    pub not_in_window: usize,
    pub not_due: usize,
    pub triage_failed: usize,
}

#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub accounts: usize,
    pub ran: usize,
    pub skipped: usize,
    pub reasons: RunReasons,
}

/// Evaluates the scheduling gate for every account and dispatches
/// triage for the due ones. Account failures are recorded and do not
/// stop the sweep.
pub async fn run_due_accounts(
    http_client: &HttpClient,
    conn: &DatabaseConnection,
    config: &ServerConfig,
) -> AppResult<RunReport> {
    let cron_secret = config
        .cron_secret
        .as_deref()
        .ok_or(AppError::MissingConfig("CRON_SECRET"))?;
    let app_url = config
        .app_url
        .as_ref()
        .ok_or(AppError::MissingConfig("APP_URL"))?;

    let accounts = AccountCtrl::all(conn).await?;
    let mut report = RunReport {
        accounts: accounts.len(),
        ..Default::default()
    };

    let now = Utc::now();
    for account in &accounts {
        let settings = AgentSettingsCtrl::for_account(conn, account.id).await?;
        let view = ScheduleView::from_settings(settings.as_ref(), &config.schedule);

        match schedule::evaluate(&view, now) {
            GateDecision::Skip(reason) => {
                report.skipped += 1;
                match reason {
                    SkipReason::Disabled => report.reasons.disabled += 1,
                    SkipReason::InstantMode => report.reasons.instant_mode += 1,
                    SkipReason::NotInWindow => report.reasons.not_in_window += 1,
                    SkipReason::NotDue => report.reasons.not_due += 1,
                }
                tracing::debug!("Skipping {}: {}", account.email, reason.as_ref());
            }
            GateDecision::Run => {
                match dispatch_triage(http_client, config, cron_secret, app_url, account).await {
                    Ok(()) => {
                        report.ran += 1;
                        // The stamp is advisory; a failed write must not
                        // stop the remaining accounts
                        if let Err(e) =
                            AgentSettingsCtrl::touch_last_run(conn, account.id, &config.schedule)
                                .await
                        {
                            tracing::warn!(
                                "Could not stamp last run for {}: {:?}",
                                account.email,
                                e
                            );
                        }
                    }
                    Err(e) => {
                        report.skipped += 1;
                        report.reasons.triage_failed += 1;
                        tracing::error!("Triage dispatch failed for {}: {:?}", account.email, e);
                        record_run(conn, account.id, now, Some(format!("{:?}", e))).await;
                        continue;
                    }
                }
                record_run(conn, account.id, now, None).await;
            }
        }
    }

    tracing::info!(
        "Agent sweep: {} accounts, {} ran, {} skipped",
        report.accounts,
        report.ran,
        report.skipped
    );

    Ok(report)
}

/// Triage runs through the HTTP entry point so the sweep and the
/// per-account work share one deployment surface.
async fn dispatch_triage(
    http_client: &HttpClient,
    config: &ServerConfig,
    cron_secret: &str,
    app_url: &url::Url,
    account: &gmail_account::Model,
) -> anyhow::Result<()> {
    let mut url = app_url.join("/api/jobs/run-triage")?;
    url.query_pairs_mut()
        .append_pair("lookbackDays", &config.triage.lookback_days.to_string())
        .append_pair("accountId", &account.id.to_string());

    let resp = http_client
        .get(url)
        .bearer_auth(cron_secret)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Triage endpoint returned {}: {}", status, body);
    }

    Ok(())
}

/// Audit trail only; a failed write is logged and ignored.
async fn record_run(
    conn: &DatabaseConnection,
    account_id: i32,
    started_at: chrono::DateTime<Utc>,
    error: Option<String>,
) {
    let status = if error.is_some() { "error" } else { "ok" };
    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    if let Err(e) = RunHistoryCtrl::insert(
        conn,
        account_id,
        status,
        duration_ms,
        error,
        started_at.fixed_offset(),
    )
    .await
    {
        tracing::warn!("Could not record run history: {:?}", e);
    }
}
