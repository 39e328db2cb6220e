use async_trait::async_trait;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

use super::session::AuthSession;

/// Black-box identity provider. The launcher never looks inside the
/// protocol, it only asks for a fresh session.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Silent refresh. `previous` is the last persisted session, if any.
    async fn refresh(&self, previous: Option<&AuthSession>) -> LauncherResult<AuthSession>;

    /// Interactive sign-in. `Ok(None)` means the user cancelled.
    async fn login(&self) -> LauncherResult<Option<AuthSession>>;
}

/// Offline accounts: no tokens, the name is the identity.
pub struct OfflineIdentityProvider {
    username: String,
}

impl OfflineIdentityProvider {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("ARCEND_USERNAME").unwrap_or_else(|_| "Player".into()))
    }
}

#[async_trait]
impl IdentityProvider for OfflineIdentityProvider {
    async fn refresh(&self, previous: Option<&AuthSession>) -> LauncherResult<AuthSession> {
        match previous {
            Some(session) => {
                debug!("Re-issuing offline session for {}", session.display_name);
                Ok(AuthSession::offline(&session.display_name))
            }
            None => Err(LauncherError::Auth("no stored account to refresh".into())),
        }
    }

    async fn login(&self) -> LauncherResult<Option<AuthSession>> {
        Ok(Some(AuthSession::offline(&self.username)))
    }
}
