//! Identity token providers.
//!
//! A token is fetched fresh before every backend request; nothing is cached.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cora_core::config::{join_url, AuthConfig, AuthProvider};
use serde::Deserialize;

use crate::error::AuthError;

/// Environment variable consulted by [`StaticTokenProvider`] when no token is
/// configured.
pub const TOKEN_ENV_VAR: &str = "CORA_ID_TOKEN";

const METADATA_ACCOUNT_PATH: &str = "computeMetadata/v1/instance/service-accounts/default";

/// A bearer token. `Debug` does not print the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token, rejecting empty strings.
    pub fn new(raw: impl Into<String>) -> Result<Self, AuthError> {
        let raw = raw.into().trim().to_string();
        if raw.is_empty() {
            return Err(AuthError::Empty);
        }
        Ok(Self(raw))
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(***)")
    }
}

/// Source of bearer tokens for authenticated calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Obtain a token valid for `audience`.
    async fn fetch_token(&self, audience: &str) -> Result<Token, AuthError>;
}

// =============================================================================
// Metadata server
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetadataTokenKind {
    Identity,
    Access,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Tokens minted by the GCE / Cloud Run metadata server for the default
/// service account.
pub struct MetadataTokenProvider {
    http: reqwest::Client,
    base_url: String,
    kind: MetadataTokenKind,
}

impl MetadataTokenProvider {
    /// OIDC identity tokens for calling the backend.
    pub fn identity(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            kind: MetadataTokenKind::Identity,
        }
    }

    /// OAuth access tokens for calling Google APIs. The audience is ignored.
    pub fn access(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            kind: MetadataTokenKind::Access,
        }
    }
}

#[async_trait]
impl TokenProvider for MetadataTokenProvider {
    fn name(&self) -> &'static str {
        match self.kind {
            MetadataTokenKind::Identity => "metadata-identity",
            MetadataTokenKind::Access => "metadata-access",
        }
    }

    async fn fetch_token(&self, audience: &str) -> Result<Token, AuthError> {
        let request = match self.kind {
            MetadataTokenKind::Identity => self
                .http
                .get(join_url(
                    &self.base_url,
                    &format!("{}/identity", METADATA_ACCOUNT_PATH),
                ))
                .query(&[("audience", audience), ("format", "full")]),
            MetadataTokenKind::Access => self.http.get(join_url(
                &self.base_url,
                &format!("{}/token", METADATA_ACCOUNT_PATH),
            )),
        };

        let response = request
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(AuthError::Rejected { status, body });
        }

        match self.kind {
            MetadataTokenKind::Identity => Token::new(body),
            MetadataTokenKind::Access => {
                let parsed: AccessTokenResponse = serde_json::from_str(&body)
                    .map_err(|e| AuthError::Transport(format!("invalid token response: {}", e)))?;
                Token::new(parsed.access_token)
            }
        }
    }
}

// =============================================================================
// Shell command
// =============================================================================

/// Tokens printed to stdout by a shell command, for local development.
pub struct CommandTokenProvider {
    command: String,
}

impl CommandTokenProvider {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for CommandTokenProvider {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn fetch_token(&self, _audience: &str) -> Result<Token, AuthError> {
        #[cfg(target_os = "windows")]
        let mut cmd = {
            let mut c = tokio::process::Command::new("cmd");
            c.arg("/C").arg(&self.command);
            c
        };
        #[cfg(not(target_os = "windows"))]
        let mut cmd = {
            let mut c = tokio::process::Command::new("sh");
            c.arg("-c").arg(&self.command);
            c
        };

        let output = cmd
            .output()
            .await
            .map_err(|e| AuthError::Command(format!("{}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuthError::Command(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Token::new(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// =============================================================================
// Static
// =============================================================================

/// A fixed token, or the value of `CORA_ID_TOKEN` read at each call.
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_token(&self, _audience: &str) -> Result<Token, AuthError> {
        let raw = match self.token.as_deref() {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => std::env::var(TOKEN_ENV_VAR).map_err(|_| {
                AuthError::Missing(format!("set [auth] token or {}", TOKEN_ENV_VAR))
            })?,
        };
        Token::new(raw)
    }
}

/// Build the backend identity provider selected by `[auth] provider`.
pub fn token_provider_from_config(
    config: &AuthConfig,
    http: reqwest::Client,
) -> Arc<dyn TokenProvider> {
    match config.provider {
        AuthProvider::Metadata => Arc::new(MetadataTokenProvider::identity(
            http,
            config.metadata_url.clone(),
        )),
        AuthProvider::Command => Arc::new(CommandTokenProvider::new(
            config.command.clone().unwrap_or_default(),
        )),
        AuthProvider::Static => Arc::new(StaticTokenProvider::new(config.token.clone())),
    }
}
