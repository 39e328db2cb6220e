use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{info, warn};

use crate::core::config::ConfigStore;
use crate::core::error::{LauncherError, LauncherResult};

use super::provider::IdentityProvider;
use super::session::{AuthSession, SessionIdentity};

/// What the account control may display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    LoggedOut,
    LoggedIn,
    /// First click on "log out"; a second click confirms.
    ConfirmLogout,
}

struct ActiveSession {
    session: AuthSession,
    verified: bool,
}

struct Inner {
    state: AuthState,
    active: Option<ActiveSession>,
}

pub struct AuthSessionManager {
    provider: Arc<dyn IdentityProvider>,
    config: Arc<ConfigStore>,
    inner: Mutex<Inner>,
    /// Held for the duration of a refresh or interactive login.
    in_flight: tokio::sync::Mutex<()>,
}

impl AuthSessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>, config: Arc<ConfigStore>) -> Self {
        Self {
            provider,
            config,
            inner: Mutex::new(Inner {
                state: AuthState::LoggedOut,
                active: None,
            }),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> AuthState {
        self.lock().state
    }

    pub fn active_session(&self) -> Option<AuthSession> {
        self.lock().active.as_ref().map(|a| a.session.clone())
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        self.lock()
            .active
            .as_ref()
            .map(|a| a.session.identity(a.verified))
    }

    /// Silent refresh, then the persisted session as an unverified fallback.
    pub async fn check_session(&self) -> LauncherResult<Option<SessionIdentity>> {
        let _flight = self
            .in_flight
            .try_lock()
            .map_err(|_| LauncherError::AuthBusy)?;

        let saved = self.config.load().await.saved_session;
        match self.provider.refresh(saved.as_ref()).await {
            Ok(session) => {
                info!("Silent refresh succeeded for {}", session.display_name);
                self.persist(Some(session.clone())).await;
                Ok(Some(self.activate(session, true)))
            }
            Err(e) => {
                warn!("Silent refresh failed: {}", e);
                match saved {
                    Some(session) => {
                        info!(
                            "Using persisted session for {} without revalidation",
                            session.display_name
                        );
                        Ok(Some(self.activate(session, false)))
                    }
                    None => {
                        self.clear_memory();
                        Ok(None)
                    }
                }
            }
        }
    }

    /// The in-memory session, or whatever `check_session` can produce.
    pub async fn ensure_session(&self) -> LauncherResult<Option<AuthSession>> {
        if let Some(session) = self.active_session() {
            return Ok(Some(session));
        }
        self.check_session().await?;
        Ok(self.active_session())
    }

    /// Interactive sign-in. Cancellation or failure keeps the prior session.
    pub async fn login(&self) -> LauncherResult<Option<SessionIdentity>> {
        let _flight = self
            .in_flight
            .try_lock()
            .map_err(|_| LauncherError::AuthBusy)?;

        match self.provider.login().await {
            Ok(Some(session)) => {
                info!("Signed in as {}", session.display_name);
                self.persist(Some(session.clone())).await;
                Ok(Some(self.activate(session, true)))
            }
            Ok(None) => {
                info!("Sign-in cancelled by user");
                Ok(None)
            }
            Err(e) => {
                warn!("Sign-in failed: {}", e);
                Ok(None)
            }
        }
    }

    /// Rejected with `AuthBusy` while a sign-in or refresh is pending.
    pub async fn logout(&self) -> LauncherResult<()> {
        let _flight = self
            .in_flight
            .try_lock()
            .map_err(|_| LauncherError::AuthBusy)?;

        self.clear_memory();
        self.persist(None).await;
        info!("Signed out");
        Ok(())
    }

    /// First press arms the confirmation, the second one logs out.
    pub async fn request_logout(&self) -> LauncherResult<AuthState> {
        let confirmed = {
            let mut inner = self.lock();
            match inner.state {
                AuthState::LoggedIn => {
                    inner.state = AuthState::ConfirmLogout;
                    false
                }
                AuthState::ConfirmLogout => true,
                AuthState::LoggedOut => false,
            }
        };

        if confirmed {
            self.logout().await?;
        }
        Ok(self.state())
    }

    pub fn cancel_logout(&self) -> AuthState {
        let mut inner = self.lock();
        if inner.state == AuthState::ConfirmLogout {
            inner.state = AuthState::LoggedIn;
        }
        inner.state
    }

    fn activate(&self, session: AuthSession, verified: bool) -> SessionIdentity {
        let identity = session.identity(verified);
        let mut inner = self.lock();
        inner.active = Some(ActiveSession { session, verified });
        inner.state = AuthState::LoggedIn;
        identity
    }

    fn clear_memory(&self) {
        let mut inner = self.lock();
        inner.active = None;
        inner.state = AuthState::LoggedOut;
    }

    async fn persist(&self, session: Option<AuthSession>) {
        let result = self
            .config
            .update(move |mut config| {
                config.saved_session = session;
                config
            })
            .await;
        if let Err(e) = result {
            warn!("Cannot persist session: {}", e);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
