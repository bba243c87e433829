use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct GmailApiRefreshTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub scope: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GmailError {
    pub code: u32,
    pub message: String,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GmailErrorResponse {
    pub error: GmailError,
}
