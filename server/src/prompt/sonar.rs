use anyhow::{anyhow, Context};
use indoc::{formatdoc, indoc};
use reqwest::StatusCode;
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    server_config::ModelConfig,
    HttpClient,
};

use super::{
    parse_triage_answer, ChatApiResponseOrError, Classifier, ClassifyRequest, TriageAnswer,
};

const AI_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";

const SYSTEM_PROMPT: &str = indoc! {r#"
    You are an email triage engine for a busy professional.
    Read the email and decide whether it needs a reply from the user.

    Instructions:
    Judge the sender's intent, not the user's reaction.
    Mark needs_response true only when a human reply is expected.
    Automated mail, receipts, and newsletters never need a response.
    Keep the summary to one sentence.
    Propose at most four short lowercase labels describing the email.
    When needs_response is true, write a brief, polite draft reply in
    the user's voice. Otherwise set draft_reply to null.

    You will only respond with a JSON object with the keys
    needs_response, priority, summary, proposed_labels, and draft_reply.
    "priority" is one of "low", "normal", "high", "urgent".
    Do not provide explanations."#
};

pub struct SonarClassifier {
    http_client: HttpClient,
    api_key: String,
    model: ModelConfig,
}

impl SonarClassifier {
    pub fn new(
        http_client: HttpClient,
        api_key: Option<&str>,
        model: ModelConfig,
    ) -> AppResult<Self> {
        let api_key = api_key.ok_or(AppError::MissingConfig("SONAR_API_KEY"))?;

        Ok(SonarClassifier {
            http_client,
            api_key: api_key.to_string(),
            model,
        })
    }
}

impl Classifier for SonarClassifier {
    async fn classify(&self, request: &ClassifyRequest) -> AppResult<TriageAnswer> {
        let user_content = triage_user_prompt(request);

        let resp = self
            .http_client
            .post(AI_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&json!(
              {
                "model": &self.model.id,
                "temperature": self.model.temperature,
                "max_tokens": self.model.max_tokens,
                "messages": [
                  {
                    "role": "system",
                    "content": SYSTEM_PROMPT
                  },
                  {
                    "role": "user",
                    "content": user_content
                  }
                ]
              }
            ))
            .send()
            .await?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| {
                if let Some(status) = e.status() {
                    match status {
                        StatusCode::BAD_REQUEST => AppError::BadRequest(e.to_string()),
                        StatusCode::REQUEST_TIMEOUT => AppError::RequestTimeout,
                        StatusCode::TOO_MANY_REQUESTS => AppError::TooManyRequests,
                        _ => AppError::Internal(e.into()),
                    }
                } else {
                    AppError::Internal(e.into())
                }
            })?;

        let parsed = serde_json::from_value::<ChatApiResponseOrError>(resp.clone())
            .context(format!("Could not parse chat response: {}", resp))?;

        let parsed = match parsed {
            ChatApiResponseOrError::Error { error } => {
                return Err(anyhow!("Chat API error: {}", error.message).into());
            }
            ChatApiResponseOrError::Response(parsed) => parsed,
        };

        let choice = parsed.choices.first().context("No choices in response")?;

        let answer = match parse_triage_answer(&choice.message.content) {
            Some(answer) => answer,
            None => {
                tracing::warn!(
                    "Unparseable triage answer, using safe default: {}",
                    choice.message.content
                );
                TriageAnswer::safe_default()
            }
        };

        Ok(answer)
    }
}

fn triage_user_prompt(request: &ClassifyRequest) -> String {
    formatdoc!(
        r#"Triage the following email based on subject, sender, and body.

            <subject>{}</subject>
            <sender>{}</sender>
            <to>{}</to>
            <body>{}</body>"#,
        request.subject,
        request.sender,
        request.recipient,
        request.body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_carries_all_fields() {
        let prompt = triage_user_prompt(&ClassifyRequest {
            sender: "jane@example.com".to_string(),
            recipient: "me@example.com".to_string(),
            subject: "Lunch?".to_string(),
            body: "Free at noon?".to_string(),
        });

        assert!(prompt.contains("<subject>Lunch?</subject>"));
        assert!(prompt.contains("<sender>jane@example.com</sender>"));
        assert!(prompt.contains("<to>me@example.com</to>"));
        assert!(prompt.contains("<body>Free at noon?</body>"));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let result = SonarClassifier::new(HttpClient::new(), None, ModelConfig::default());

        assert!(matches!(result, Err(AppError::MissingConfig("SONAR_API_KEY"))));
    }
}
