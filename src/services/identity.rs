use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::session::{AccessCredential, Identity};

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider answered with a non-success status.
    #[error("identity provider rejected the credential ({0})")]
    Rejected(u16),

    /// The provider could not be reached.
    #[error("identity provider unreachable: {0}")]
    Network(reqwest::Error),

    /// The provider answered with something that is not a usable profile.
    #[error("invalid profile response: {0}")]
    InvalidProfile(String),
}

impl From<reqwest::Error> for IdentityError {
    fn from(e: reqwest::Error) -> Self {
        IdentityError::Network(e.without_url())
    }
}

/// Whether a stored credential still proves who the user is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Valid,
    Invalid,
}

/// The boundary to the service that issues and verifies access credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchanges a credential for the profile of the user it belongs to.
    async fn fetch_profile(&self, credential: &AccessCredential) -> Result<Identity, IdentityError>;

    /// Checks a credential with a single round trip.
    ///
    /// Fails closed: any error, including an unreachable provider, counts as
    /// `Invalid`.
    async fn validate(&self, credential: &AccessCredential) -> CredentialStatus {
        match self.fetch_profile(credential).await {
            Ok(_) => CredentialStatus::Valid,
            Err(e) => {
                tracing::warn!("🔐 Credential check failed: {}", e);
                CredentialStatus::Invalid
            }
        }
    }
}

/// The subset of the OAuth2 userinfo payload we keep.
#[derive(Deserialize)]
struct UserInfo {
    id: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

impl UserInfo {
    fn into_identity(self) -> Result<Identity, IdentityError> {
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| IdentityError::InvalidProfile("profile has no email".to_string()))?;

        Ok(Identity {
            display_name: self.name.unwrap_or_else(|| email.clone()),
            email,
            picture: self.picture,
            provider_id: self.id,
        })
    }
}

/// Google's OAuth2 userinfo endpoint.
pub struct GoogleIdentityProvider {
    http: Client,
    userinfo_url: String,
}

impl GoogleIdentityProvider {
    /// Creates a new `GoogleIdentityProvider`.
    ///
    /// # Arguments
    ///
    /// * `userinfo_url` - The userinfo endpoint.
    /// * `timeout` - The request timeout.
    ///
    /// # Returns
    ///
    /// A `Result` containing the provider.
    pub fn new(userinfo_url: String, timeout: Duration) -> Result<Self, IdentityError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, userinfo_url })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    async fn fetch_profile(&self, credential: &AccessCredential) -> Result<Identity, IdentityError> {
        if credential.is_empty() {
            return Err(IdentityError::InvalidProfile("empty access token".to_string()));
        }

        tracing::debug!("🔑 Fetching user profile from identity provider");

        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(credential.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Rejected(status.as_u16()));
        }

        let body = response.text().await?;
        let info: UserInfo = sonic_rs::from_str(&body)
            .map_err(|e| IdentityError::InvalidProfile(e.to_string()))?;

        let identity = info.into_identity()?;
        tracing::debug!("✅ Profile fetched for {}", identity.email);
        Ok(identity)
    }
}
