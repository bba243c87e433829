extern crate google_gmail1 as gmail1;

use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::{anyhow, Context};
use gmail1::api::{Label, ListLabelsResponse, ListMessagesResponse, Message};
use leaky_bucket::RateLimiter;
use serde::Deserialize;
use serde_json::json;

use crate::{
    db_core::prelude::*,
    email::{mime, simplified_message::SimplifiedMessage, Mailbox, ReplyDraft},
    model::account::AccountCtrl,
    server_config::ServerConfig,
    HttpClient,
};

/// Gmail API quota units per request type. The per-user budget is 250
/// units per second.
struct GmailApiQuota {
    messages_list: usize,
    messages_get: usize,
    messages_modify: usize,
    messages_send: usize,
    labels_list: usize,
    labels_create: usize,
    drafts_create: usize,
    settings_get: usize,
}

const GMAIL_API_QUOTA: GmailApiQuota = GmailApiQuota {
    messages_list: 5,
    messages_get: 5,
    messages_modify: 5,
    messages_send: 100,
    labels_list: 1,
    labels_create: 5,
    drafts_create: 10,
    settings_get: 1,
};

const GMAIL_QUOTA_PER_SECOND: usize = 250;

macro_rules! gmail_url {
    ($($params:expr),*) => {
        {
            const GMAIL_ENDPOINT: &str = "https://www.googleapis.com/gmail/v1/users/me";
            let list_params = vec![$($params),*];
            let path = list_params.join("/");
            format!("{}/{}", GMAIL_ENDPOINT, path)
        }
    };
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendAsAddress {
    send_as_email: String,
    #[serde(default)]
    is_default: bool,
    #[serde(default)]
    signature: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListSendAsResponse {
    #[serde(default)]
    send_as: Vec<SendAsAddress>,
}

#[derive(Debug, Deserialize)]
struct DraftResponse {
    id: String,
}

#[derive(Debug, Clone)]
pub struct EmailClient {
    http_client: HttpClient,
    access_token: String,
    rate_limiter: Arc<RateLimiter>,
    pub email_address: String,
}

impl EmailClient {
    pub async fn for_account(
        http_client: HttpClient,
        conn: &DatabaseConnection,
        config: &ServerConfig,
        account: &gmail_account::Model,
    ) -> anyhow::Result<EmailClient> {
        let access_token =
            AccountCtrl::get_refreshed_token(&http_client, conn, &config.gmail, account)
                .await
                .map_err(|e| anyhow!("Error getting access token: {:?}", e))?;

        Ok(EmailClient {
            http_client,
            access_token,
            rate_limiter: Arc::new(
                RateLimiter::builder()
                    .initial(GMAIL_QUOTA_PER_SECOND)
                    .interval(Duration::from_secs(1))
                    .refill(GMAIL_QUOTA_PER_SECOND)
                    .build(),
            ),
            email_address: account.email.clone(),
        })
    }

    async fn get_message_list(
        &self,
        query: &str,
        max_results: u32,
    ) -> anyhow::Result<ListMessagesResponse> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.messages_list)
            .await;

        let resp = self
            .http_client
            .get(gmail_url!("messages"))
            .query(&[
                ("q", query.to_string()),
                ("maxResults", max_results.to_string()),
            ])
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let data = resp.json::<ListMessagesResponse>().await?;

        Ok(data)
    }

    async fn get_message_by_id(&self, message_id: &str) -> anyhow::Result<Message> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.messages_get)
            .await;

        let resp = self
            .http_client
            .get(gmail_url!("messages", message_id))
            .query(&[("format", "RAW")])
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        resp.json::<Message>().await.context("Error getting message")
    }

    async fn get_labels(&self) -> anyhow::Result<Vec<Label>> {
        self.rate_limiter.acquire(GMAIL_API_QUOTA.labels_list).await;

        let resp = self
            .http_client
            .get(gmail_url!("labels"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let data = resp.json::<ListLabelsResponse>().await?;

        Ok(data.labels.unwrap_or_default())
    }

    async fn create_label(&self, name: &str) -> anyhow::Result<Option<Label>> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.labels_create)
            .await;

        let label = Label {
            name: Some(name.to_string()),
            type_: Some("user".to_string()),
            message_list_visibility: Some("show".to_string()),
            label_list_visibility: Some("labelShowIfUnread".to_string()),
            ..Default::default()
        };

        let resp = self
            .http_client
            .post(gmail_url!("labels"))
            .bearer_auth(&self.access_token)
            .json(&label)
            .send()
            .await?;
        let data = resp.json::<serde_json::Value>().await?;

        if let Some(error) = data.get("error") {
            // A concurrent sweep created the label first; caller re-lists
            if error.get("code").is_some_and(|x| x.as_i64() == Some(409)) {
                return Ok(None);
            }
            return Err(anyhow!("Error creating label {}: {:?}", name, data));
        }

        Ok(Some(serde_json::from_value(data)?))
    }
}

impl Mailbox for EmailClient {
    async fn list_recent_inbox(
        &self,
        lookback_days: i64,
        max_results: u32,
    ) -> anyhow::Result<Vec<String>> {
        let query = format!("in:inbox newer_than:{}d -category:chats", lookback_days);
        let resp = self.get_message_list(&query, max_results).await?;

        let ids = resp
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.id)
            .collect();

        Ok(ids)
    }

    async fn fetch_message(&self, message_id: &str) -> anyhow::Result<SimplifiedMessage> {
        let message = self.get_message_by_id(message_id).await?;
        SimplifiedMessage::from_gmail_message(&message)
    }

    async fn ensure_labels(&self, names: &[&str]) -> anyhow::Result<HashMap<String, String>> {
        let mut by_name: HashMap<String, String> = self
            .get_labels()
            .await?
            .into_iter()
            .filter_map(|l| Some((l.name?, l.id?)))
            .collect();

        let mut lost_creation_race = false;
        for name in names {
            if by_name.contains_key(*name) {
                continue;
            }
            match self.create_label(name).await? {
                Some(label) => {
                    if let (Some(name), Some(id)) = (label.name, label.id) {
                        by_name.insert(name, id);
                    }
                }
                None => lost_creation_race = true,
            }
        }

        if lost_creation_race {
            by_name = self
                .get_labels()
                .await?
                .into_iter()
                .filter_map(|l| Some((l.name?, l.id?)))
                .collect();
        }

        Ok(by_name)
    }

    async fn add_labels(&self, message_id: &str, label_ids: &[String]) -> anyhow::Result<()> {
        if label_ids.is_empty() {
            return Ok(());
        }

        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.messages_modify)
            .await;

        let resp = self
            .http_client
            .post(gmail_url!("messages", message_id, "modify"))
            .bearer_auth(&self.access_token)
            .json(&json!({
                "addLabelIds": label_ids,
                "removeLabelIds": []
            }))
            .send()
            .await?;
        let data = resp.json::<serde_json::Value>().await?;

        if data.get("error").is_some() {
            return Err(anyhow!("Error labelling message {}: {:?}", message_id, data));
        }

        Ok(())
    }

    async fn signature_html(&self) -> anyhow::Result<Option<String>> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.settings_get)
            .await;

        let resp = self
            .http_client
            .get(gmail_url!("settings", "sendAs"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let data = resp.json::<ListSendAsResponse>().await?;

        let signature = data
            .send_as
            .iter()
            .find(|s| s.is_default || s.send_as_email == self.email_address)
            .and_then(|s| s.signature.clone())
            .filter(|s| !s.trim().is_empty());

        Ok(signature)
    }

    async fn create_reply_draft(&self, draft: &ReplyDraft) -> anyhow::Result<String> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.drafts_create)
            .await;

        let raw = mime::build_reply_mime(&self.email_address, draft)?;

        let resp = self
            .http_client
            .post(gmail_url!("drafts"))
            .bearer_auth(&self.access_token)
            .json(&json!({
                "message": {
                    "raw": raw,
                    "threadId": draft.thread_id,
                }
            }))
            .send()
            .await?;
        let data = resp.json::<serde_json::Value>().await?;

        if let Some(error) = data.get("error") {
            return Err(anyhow!("Error creating draft: {:?}", error));
        }

        let draft = serde_json::from_value::<DraftResponse>(data)
            .context("Failed to parse draft response")?;

        Ok(draft.id)
    }

    async fn send_message(
        &self,
        to: &str,
        subject: &str,
        html_body: &str,
    ) -> anyhow::Result<()> {
        self.rate_limiter
            .acquire(GMAIL_API_QUOTA.messages_send)
            .await;

        let raw = mime::build_message_mime(&self.email_address, to, subject, html_body)?;

        let resp = self
            .http_client
            .post(gmail_url!("messages", "send"))
            .bearer_auth(&self.access_token)
            .json(&json!({ "raw": raw }))
            .send()
            .await?;
        let data = resp.json::<serde_json::Value>().await?;

        if let Some(error) = data.get("error") {
            return Err(anyhow!("Error sending message: {:?}", error));
        }

        Ok(())
    }
}
