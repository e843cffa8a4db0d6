//! Bearer token verification.
//!
//! Tokens are either checked against a Supabase-compatible auth endpoint
//! (`GET {url}/auth/v1/user`) or looked up in a fixed token table from the
//! configuration.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::AuthError;
use crate::storage::AuthConfig;

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
}

/// Resolves a bearer token to a user id.
#[derive(Debug, Clone)]
pub enum Authenticator {
    Remote {
        client: Client,
        user_endpoint: Url,
        anon_key: String,
    },
    Static(HashMap<String, String>),
}

impl Authenticator {
    pub fn remote(base_url: &str, anon_key: impl Into<String>) -> Result<Self, AuthError> {
        let user_endpoint = Url::parse(&format!(
            "{}/auth/v1/user",
            base_url.trim_end_matches('/')
        ))
        .map_err(|_| AuthError::NotConfigured)?;
        Ok(Authenticator::Remote {
            client: Client::new(),
            user_endpoint,
            anon_key: anon_key.into(),
        })
    }

    pub fn from_tokens(tokens: HashMap<String, String>) -> Self {
        Authenticator::Static(tokens)
    }

    /// Remote when a provider URL is configured, otherwise the static table.
    /// Fails if neither is usable.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        match &config.provider_url {
            Some(url) if !url.is_empty() => {
                Self::remote(url, config.anon_key.clone().unwrap_or_default())
            }
            _ if !config.static_tokens.is_empty() => {
                Ok(Self::from_tokens(config.static_tokens.clone()))
            }
            _ => Err(AuthError::NotConfigured),
        }
    }

    pub async fn user_for_token(&self, token: &str) -> Result<String, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        match self {
            Authenticator::Static(tokens) => {
                tokens.get(token).cloned().ok_or(AuthError::InvalidToken)
            }
            Authenticator::Remote {
                client,
                user_endpoint,
                anon_key,
            } => {
                let resp = client
                    .get(user_endpoint.clone())
                    .bearer_auth(token)
                    .header("apikey", anon_key)
                    .send()
                    .await?;
                if !resp.status().is_success() {
                    tracing::debug!(status = %resp.status(), "auth provider rejected token");
                    return Err(AuthError::InvalidToken);
                }
                let user: ProviderUser = resp.json().await.map_err(|_| AuthError::InvalidToken)?;
                if user.id.is_empty() {
                    return Err(AuthError::InvalidToken);
                }
                Ok(user.id)
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let token = header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}
