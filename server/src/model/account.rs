use anyhow::Context;
use chrono::{Duration, Utc};

use crate::{
    db_core::prelude::*,
    error::{AppError, AppResult},
    model::response::GmailApiRefreshTokenResponse,
    server_config::GmailConfig,
    util, HttpClient,
};

pub struct AccountCtrl;

impl AccountCtrl {
    pub async fn all(conn: &DatabaseConnection) -> AppResult<Vec<gmail_account::Model>> {
        let accounts = GmailAccount::find()
            .order_by(gmail_account::Column::UpdatedAt, Order::Desc)
            .all(conn)
            .await?;

        Ok(accounts)
    }

    pub async fn by_id(conn: &DatabaseConnection, id: i32) -> AppResult<gmail_account::Model> {
        GmailAccount::find_by_id(id)
            .one(conn)
            .await?
            .ok_or(AppError::NotFound(format!("No account with id {}", id)))
    }

    /// Returns a usable access token for the account, refreshing and
    /// persisting it when the stored one is at or past expiry.
    pub async fn get_refreshed_token(
        http_client: &HttpClient,
        conn: &DatabaseConnection,
        gmail_config: &GmailConfig,
        account: &gmail_account::Model,
    ) -> AppResult<String> {
        if !util::check_expired(account.token_expires_at) {
            return Ok(account.access_token.clone());
        }

        let resp =
            exchange_refresh_token(http_client, gmail_config, &account.refresh_token).await?;

        let now = Utc::now().fixed_offset();
        let expires_at = now + Duration::seconds(resp.expires_in as i64);

        let active_model = gmail_account::ActiveModel {
            id: ActiveValue::Unchanged(account.id),
            access_token: ActiveValue::Set(resp.access_token.clone()),
            token_expires_at: ActiveValue::Set(expires_at),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        active_model
            .update(conn)
            .await
            .context("Error persisting refreshed access token")?;

        Ok(resp.access_token)
    }
}

async fn exchange_refresh_token(
    http_client: &HttpClient,
    gmail_config: &GmailConfig,
    refresh_token: &str,
) -> AppResult<GmailApiRefreshTokenResponse> {
    let params = [
        ("client_id", gmail_config.client_id.as_str()),
        ("client_secret", gmail_config.client_secret.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];

    let resp = http_client
        .post(&gmail_config.token_uri)
        .form(&params)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(AppError::Unauthorized(format!(
            "Token refresh failed with {}: {}",
            status, body
        )));
    }

    let token = resp
        .json::<GmailApiRefreshTokenResponse>()
        .await
        .context("Could not parse token refresh response")?;

    Ok(token)
}
