use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = AuthError> = std::result::Result<T, E>;

/// Everything that can go wrong between reading the token cache and listing the drive
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("redirect did not contain an authorization code")]
    MissingCode,

    #[error("authorization was denied: {error}{}", describe(.description))]
    Denied {
        error: String,
        description: Option<String>,
    },

    #[error("redirect state does not match the authorization request")]
    StateMismatch,

    #[error("no redirect received within {0:?}")]
    RedirectTimeout(Duration),

    #[error("token endpoint returned {status}: {error}{}", describe(.description))]
    Provider {
        status: u16,
        error: String,
        description: Option<String>,
    },

    #[error("GET {path} returned {status}: {body}")]
    Api {
        path: String,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn describe(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl AuthError {
    /// Build a provider error from a token endpoint failure body.
    /// Falls back to the raw body when it isn't an RFC 6749 error document.
    pub fn from_token_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<OAuthErrorBody>(body) {
            Ok(parsed) => AuthError::Provider {
                status,
                error: parsed.error,
                description: parsed.error_description,
            },
            Err(_) => AuthError::Provider {
                status,
                error: if body.trim().is_empty() {
                    "empty response".to_string()
                } else {
                    body.trim().to_string()
                },
                description: None,
            },
        }
    }

    /// Provider verdicts are recoverable on the refresh path; transport failures are not
    pub fn is_provider_error(&self) -> bool {
        matches!(self, AuthError::Provider { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_error_body_is_parsed() {
        let body = r#"{"error":"invalid_grant","error_description":"AADSTS70000: token expired"}"#;
        let err = AuthError::from_token_response(400, body);

        match &err {
            AuthError::Provider { status, error, description } => {
                assert_eq!(*status, 400);
                assert_eq!(error, "invalid_grant");
                assert_eq!(description.as_deref(), Some("AADSTS70000: token expired"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_provider_error());
        assert_eq!(
            err.to_string(),
            "token endpoint returned 400: invalid_grant (AADSTS70000: token expired)"
        );
    }

    #[test]
    fn test_token_error_falls_back_to_raw_body() {
        let err = AuthError::from_token_response(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "token endpoint returned 502: Bad Gateway");

        let err = AuthError::from_token_response(500, "");
        assert_eq!(err.to_string(), "token endpoint returned 500: empty response");
    }

    #[test]
    fn test_non_provider_errors() {
        assert!(!AuthError::MissingCode.is_provider_error());
        assert!(!AuthError::RedirectTimeout(Duration::from_secs(1)).is_provider_error());
    }
}
