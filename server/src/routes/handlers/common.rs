use axum_extra::headers::{authorization::Bearer, Authorization};

use crate::{
    error::{AppError, AppResult},
    server_config::ServerConfig,
};

/// Shared-secret gate for the cron and job endpoints. A deployment
/// without the secret is a config error, not an auth failure.
pub fn authorize_cron(
    config: &ServerConfig,
    auth: Option<&Authorization<Bearer>>,
) -> AppResult<()> {
    let secret = config
        .cron_secret
        .as_deref()
        .ok_or(AppError::MissingConfig("CRON_SECRET"))?;

    let Some(auth) = auth else {
        return Err(AppError::Unauthorized("Missing bearer token".to_string()));
    };
    if auth.token() != secret {
        return Err(AppError::Unauthorized("Invalid bearer token".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_secret(secret: Option<&str>) -> ServerConfig {
        ServerConfig {
            cron_secret: secret.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    fn bearer(token: &str) -> Authorization<Bearer> {
        Authorization::bearer(token).unwrap()
    }

    #[test]
    fn missing_secret_is_a_config_error() {
        let result = authorize_cron(&config_with_secret(None), Some(&bearer("x")));

        assert!(matches!(result, Err(AppError::MissingConfig("CRON_SECRET"))));
    }

    #[test]
    fn missing_token_is_unauthorized() {
        let result = authorize_cron(&config_with_secret(Some("s3cret")), None);

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn wrong_token_is_unauthorized() {
        let result = authorize_cron(&config_with_secret(Some("s3cret")), Some(&bearer("nope")));

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn matching_token_passes() {
        let result = authorize_cron(&config_with_secret(Some("s3cret")), Some(&bearer("s3cret")));

        assert!(result.is_ok());
    }
}
