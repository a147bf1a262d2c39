use crate::config::Settings;
use crate::domain::{Role, User};
use crate::store::Store;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub mod demo;
pub mod remote;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("auth backend unavailable: {0}")]
    Unavailable(String),
    #[error("auth backend rejected the request: {0}")]
    Rejected(String),
}

/// The auth/data collaborator boundary. Exactly one implementation is
/// selected at startup; call sites never ask which one they got.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
    ) -> Result<User, AuthError>;

    /// Completed OAuth sign-in for the named provider.
    async fn oauth_sign_in(&self, provider: &str) -> Result<User, AuthError>;
}

/// Capability resolution: a configured backend endpoint yields the remote
/// implementation, anything else (missing keys, placeholder keys, forced
/// demo flag) yields the seeded in-memory one. Demo resolution also seeds
/// the store so dashboards have data on first login.
pub async fn resolve(settings: &Settings, store: &Store) -> Arc<dyn AuthBackend> {
    if settings.backend_configured() {
        // both are present when backend_configured() holds
        let url = settings.backend_url.clone().unwrap_or_default();
        let key = settings.backend_key.clone().unwrap_or_default();
        tracing::info!("auth backend: remote at {url}");
        Arc::new(remote::RemoteBackend::new(url, key))
    } else {
        tracing::info!("auth backend: in-memory demo identities");
        let seeds = demo::seed_users();
        store.seed_demo(&seeds).await;
        Arc::new(demo::DemoBackend::new(store.clone(), seeds))
    }
}
