use super::BASE_ASSET_URI;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The signed in user as reported by the backend.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    /// The avatar image hash, if the user has a custom avatar.
    pub avatar: Option<String>,
    /// Filled in once the profile has been fetched.
    #[serde(default, skip_deserializing)]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    pub fn avatar_url_as(&self, format: &str, size: u32) -> Option<String> {
        self.avatar.as_ref().map(|hash| {
            format!(
                "{}/avatars/{}/{}.{}?size={}",
                BASE_ASSET_URI, self.id, hash, format, size
            )
        })
    }

    pub fn display_name(&self) -> String {
        format!("{}#{}", self.username, self.discriminator)
    }
}

/// An OAuth token pair. Persisted as JSON under the `token` storage key.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub scope: String,
}

impl SessionToken {
    /// Reads a persisted token. Anything unreadable counts as no token at all.
    pub fn from_stored(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(token) => Some(token),
            Err(err) => {
                tracing::warn!("Ignoring unreadable stored token: {}", err);
                None
            }
        }
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}
