//! Client for the account endpoints (`/api/auth/login`, `/api/auth/signup`).

use flipshelf_core::{Credentials, Session};
use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum AuthError {
    /// The server refused the request; carries its message when it sent one.
    #[error("{0}")]
    Rejected(String),
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response from server")]
    MalformedResponse,
}

impl AuthError {
    /// Text for the toast shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Rejected(message) if !message.trim().is_empty() => message.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Login,
    Signup,
}

impl AuthAction {
    pub fn path(&self) -> &'static str {
        match self {
            AuthAction::Login => "/api/auth/login",
            AuthAction::Signup => "/api/auth/signup",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl AuthClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("flipshelf/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn endpoint(&self, action: AuthAction) -> String {
        format!("{}{}", self.base_url, action.path())
    }

    pub fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.send(AuthAction::Login, credentials)
    }

    pub fn signup(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        self.send(AuthAction::Signup, credentials)
    }

    fn send(&self, action: AuthAction, credentials: &Credentials) -> Result<Session, AuthError> {
        let url = self.endpoint(action);
        tracing::info!(%url, email = %credentials.email_id, "auth request");
        let response = self.client.post(&url).json(credentials).send()?;
        let status = response.status();
        let body = response.text()?;
        let result = parse_response(status.is_success(), &body);
        match &result {
            Ok(_) => tracing::info!(?action, "auth succeeded"),
            Err(err) => tracing::warn!(?action, status = status.as_u16(), error = %err, "auth failed"),
        }
        result
    }
}

/// Interprets an auth response body. Success needs a `user` object; any
/// failure surfaces the server's `message` when present.
pub fn parse_response(success: bool, body: &str) -> Result<Session, AuthError> {
    let value: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let message = value
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(|m| m.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    if success {
        if let Some(session) = value
            .as_ref()
            .and_then(|v| v.get("user"))
            .cloned()
            .and_then(Session::from_user)
        {
            return Ok(session);
        }
        return match message {
            Some(message) => Err(AuthError::Rejected(message)),
            None => Err(AuthError::MalformedResponse),
        };
    }

    Err(AuthError::Rejected(
        message.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
    ))
}
