pub mod manager;
pub mod provider;
pub mod session;

pub use manager::{AuthSessionManager, AuthState};
pub use provider::{IdentityProvider, OfflineIdentityProvider};
pub use session::{AuthSession, LaunchCredential, SessionIdentity};
