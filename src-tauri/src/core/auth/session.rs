use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Client id the game expects when no identity service issued one.
pub const OFFLINE_CLIENT_ID: &str = "00000000402B5328";

/// Opaque bundle handed to the game process. Only the spawner reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaunchCredential {
    pub access_token: String,
    pub xuid: String,
    pub user_type: String,
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub display_name: String,
    pub account_id: String,
    pub credential: LaunchCredential,
    /// Provider token used for silent refresh, when the provider issues one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub acquired_at: DateTime<Utc>,
}

impl AuthSession {
    /// Offline account with the deterministic UUID the game derives itself
    /// from `OfflinePlayer:<name>`.
    pub fn offline(username: &str) -> Self {
        let username = match username.trim() {
            "" => "Player",
            trimmed => trimmed,
        };
        Self {
            display_name: username.to_string(),
            account_id: offline_uuid(username),
            credential: LaunchCredential {
                access_token: "offline_access_token".into(),
                xuid: "0".into(),
                user_type: "legacy".into(),
                client_id: OFFLINE_CLIENT_ID.into(),
            },
            refresh_token: None,
            acquired_at: Utc::now(),
        }
    }

    pub fn identity(&self, verified: bool) -> SessionIdentity {
        SessionIdentity {
            name: self.display_name.clone(),
            uuid: self.account_id.clone(),
            verified,
        }
    }
}

/// What the presentation layer is allowed to see of a session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionIdentity {
    pub name: String,
    pub uuid: String,
    /// False when the session came from the persisted cache after a failed refresh.
    pub verified: bool,
}

pub fn offline_uuid(username: &str) -> String {
    let digest = Md5::digest(format!("OfflinePlayer:{username}").as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    uuid::Builder::from_md5_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}
