use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The profile fields returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The user's email address. Trip records are owned by this value.
    pub email: String,
    /// The name shown to the user.
    pub display_name: String,
    /// The avatar URL, if the provider has one.
    pub picture: Option<String>,
    /// The provider's own identifier for the user.
    pub provider_id: Option<String>,
}

/// An OAuth access token issued by the identity provider.
///
/// ⚠️ The token is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct AccessCredential(String);

impl AccessCredential {
    /// Wraps a raw access token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in an outbound request.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the token is blank.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessCredential(<redacted>)")
    }
}

/// Represents a signed-in user.
///
/// Created when login completes and deleted as soon as the credential is found
/// to be stale. Only the trip workflow writes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Who is signed in.
    pub identity: Identity,
    /// The credential that proved it.
    pub access_credential: AccessCredential,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session for a freshly verified identity.
    pub fn new(identity: Identity, access_credential: AccessCredential) -> Self {
        Self {
            identity,
            access_credential,
            created_at: Utc::now(),
        }
    }
}
