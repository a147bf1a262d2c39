use super::{AuthBackend, AuthError};
use crate::domain::{Role, User};
use crate::store::Store;
use async_trait::async_trait;
use once_cell::sync::Lazy;

/// The three identities every demo deployment starts with, stamped once so
/// their ids stay stable for the lifetime of the process.
static SEED_USERS: Lazy<Vec<User>> = Lazy::new(|| {
    vec![
        User::new("admin@qgenius.com", "Admin User", Role::Admin),
        User::new("faculty@qgenius.com", "Dr. Smith", Role::Faculty),
        User::new("super@qgenius.com", "Super Admin", Role::SuperAdmin),
    ]
});

/// The store is seeded from this list, and sign-in for the admin and
/// super-admin addresses keeps working even if those rows are later
/// edited away.
pub fn seed_users() -> Vec<User> {
    SEED_USERS.clone()
}

/// In-memory backend used when no remote collaborator is configured.
/// Passwords are accepted but never checked; any unknown address signs
/// in as a throwaway faculty identity so the demo is never locked out.
pub struct DemoBackend {
    store: Store,
    seeds: Vec<User>,
    oauth_user: User,
}

impl DemoBackend {
    pub fn new(store: Store, seeds: Vec<User>) -> Self {
        Self {
            store,
            seeds,
            oauth_user: User::new("demo-google@qgenius.com", "Google Demo User", Role::Faculty),
        }
    }

    fn seed_by_role(&self, role: Role) -> Option<User> {
        self.seeds.iter().find(|u| u.role == role).cloned()
    }
}

#[async_trait]
impl AuthBackend for DemoBackend {
    async fn sign_in(&self, email: &str, _password: &str) -> Result<User, AuthError> {
        let email = email.trim();
        if email.eq_ignore_ascii_case("admin@qgenius.com") {
            if let Some(user) = self.seed_by_role(Role::Admin) {
                return Ok(user);
            }
        }
        if email.eq_ignore_ascii_case("super@qgenius.com") {
            if let Some(user) = self.seed_by_role(Role::SuperAdmin) {
                return Ok(user);
            }
        }
        if let Some(user) = self.store.user_by_email(email).await {
            return Ok(user);
        }
        Ok(User::new(email, "Demo Faculty", Role::Faculty))
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        name: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        Ok(User::new(email.trim(), name, role))
    }

    async fn oauth_sign_in(&self, provider: &str) -> Result<User, AuthError> {
        tracing::debug!("demo oauth sign-in via {provider}");
        Ok(self.oauth_user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> DemoBackend {
        DemoBackend::new(Store::new(), seed_users())
    }

    #[tokio::test]
    async fn admin_address_maps_to_admin_seed() {
        let demo = backend();
        let user = demo.sign_in("admin@qgenius.com", "anything").await.unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.name, "Admin User");
    }

    #[tokio::test]
    async fn super_address_maps_to_super_seed() {
        let demo = backend();
        let user = demo.sign_in("super@qgenius.com", "").await.unwrap();
        assert_eq!(user.role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn known_store_user_signs_in_as_themselves() {
        let store = Store::new();
        let seeds = seed_users();
        store.seed_demo(&seeds).await;
        let demo = DemoBackend::new(store, seeds);
        let user = demo.sign_in("faculty@qgenius.com", "pw").await.unwrap();
        assert_eq!(user.name, "Dr. Smith");
        assert_eq!(user.role, Role::Faculty);
    }

    #[tokio::test]
    async fn unknown_address_becomes_demo_faculty() {
        let demo = backend();
        let user = demo.sign_in("someone@else.edu", "pw").await.unwrap();
        assert_eq!(user.name, "Demo Faculty");
        assert_eq!(user.role, Role::Faculty);
        assert_eq!(user.email, "someone@else.edu");
    }

    #[tokio::test]
    async fn oauth_identity_is_stable_across_calls() {
        let demo = backend();
        let a = demo.oauth_sign_in("google").await.unwrap();
        let b = demo.oauth_sign_in("google").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.email, "demo-google@qgenius.com");
    }

    #[test]
    fn seed_ids_are_stable_across_calls() {
        let first = seed_users();
        let second = seed_users();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn sign_up_uses_submitted_profile() {
        let demo = backend();
        let user = demo
            .sign_up("new@uni.edu", "pw", "New Person", Role::Faculty)
            .await
            .unwrap();
        assert_eq!(user.name, "New Person");
        assert_eq!(user.email, "new@uni.edu");
    }
}
