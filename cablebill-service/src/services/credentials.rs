use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::error::ServiceError;
use super::store::{LedgerStore, StoreError};
use crate::models::Admin;
use crate::utils::{Password, PasswordHasherConfig};

pub const MIN_PASSWORD_LENGTH: usize = 6;

const DUMMY_PASSWORD: &str = "cablebill-unknown-admin";

/// Admin identity records and password handling. Argon2 runs on the
/// blocking pool.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn LedgerStore>,
    hasher: PasswordHasherConfig,
    /// Verified against when the email is unknown, so both login failures cost one Argon2 run.
    dummy_hash: Arc<OnceCell<String>>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn LedgerStore>, hasher: PasswordHasherConfig) -> Self {
        Self {
            store,
            hasher,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    async fn hash(&self, password: Password) -> Result<String, ServiceError> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash_password(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))??;
        Ok(hash)
    }

    pub async fn verify_password(
        &self,
        admin: &Admin,
        password: &Password,
    ) -> Result<bool, ServiceError> {
        self.verify_hash(password, admin.password_hash.clone()).await
    }

    async fn verify_hash(&self, password: &Password, hash: String) -> Result<bool, ServiceError> {
        let hasher = self.hasher.clone();
        let password = password.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify_password(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))??;
        Ok(matches)
    }

    pub async fn create_admin(
        &self,
        email: &str,
        password: Password,
        name: Option<String>,
    ) -> Result<Admin, ServiceError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ServiceError::Validation(
                "Email and password are required".to_string(),
            ));
        }
        ensure_length(&password)?;

        if self.store.find_admin_by_email(email).await?.is_some() {
            return Err(ServiceError::DuplicateEmail);
        }

        let admin = Admin::new(email.to_string(), self.hash(password).await?, name);
        match self.store.insert_admin(&admin).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(ServiceError::DuplicateEmail),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(admin_id = %admin.id, "Admin created");
        Ok(admin)
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &Password,
    ) -> Result<Admin, ServiceError> {
        let Some(admin) = self.store.find_admin_by_email(email.trim()).await? else {
            let dummy = self
                .dummy_hash
                .get_or_try_init(|| self.hash(Password::new(DUMMY_PASSWORD.to_string())))
                .await?
                .clone();
            self.verify_hash(password, dummy).await?;
            return Err(ServiceError::InvalidCredential);
        };

        if !self.verify_password(&admin, password).await? {
            return Err(ServiceError::InvalidCredential);
        }
        Ok(admin)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Admin>, ServiceError> {
        Ok(self.store.find_admin_by_email(email.trim()).await?)
    }

    pub async fn change_password(
        &self,
        admin_id: ObjectId,
        current: &Password,
        new_password: Password,
    ) -> Result<(), ServiceError> {
        ensure_length(&new_password)?;

        let admin = self
            .store
            .find_admin(admin_id)
            .await?
            .ok_or(ServiceError::NotFound("Admin"))?;

        if !self.verify_password(&admin, current).await? {
            return Err(ServiceError::InvalidCredential);
        }

        self.store_password(admin_id, new_password).await?;
        tracing::info!(admin_id = %admin_id, "Admin password changed");
        Ok(())
    }

    pub async fn reset_password(
        &self,
        admin_id: ObjectId,
        new_password: Password,
    ) -> Result<(), ServiceError> {
        ensure_length(&new_password)?;

        if self.store.find_admin(admin_id).await?.is_none() {
            return Err(ServiceError::NotFound("Admin"));
        }

        self.store_password(admin_id, new_password).await?;
        tracing::info!(admin_id = %admin_id, "Admin password reset");
        Ok(())
    }

    async fn store_password(
        &self,
        admin_id: ObjectId,
        new_password: Password,
    ) -> Result<(), ServiceError> {
        let hash = self.hash(new_password).await?;
        if !self.store.update_admin_password(admin_id, &hash).await? {
            return Err(ServiceError::NotFound("Admin"));
        }
        Ok(())
    }
}

fn ensure_length(password: &Password) -> Result<(), ServiceError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordConfig;
    use crate::services::memory::InMemoryStore;

    fn credentials() -> CredentialStore {
        let hasher = PasswordHasherConfig::new(&PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        CredentialStore::new(Arc::new(InMemoryStore::new()), hasher)
    }

    fn pw(s: &str) -> Password {
        Password::new(s.to_string())
    }

    #[tokio::test]
    async fn test_create_then_authenticate() {
        let creds = credentials();
        let admin = creds
            .create_admin("owner@example.com", pw("secret1"), None)
            .await
            .unwrap();
        assert_eq!(admin.name, "Admin");
        assert_ne!(admin.password_hash, "secret1");

        let found = creds
            .authenticate("owner@example.com", &pw("secret1"))
            .await
            .unwrap();
        assert_eq!(found.id, admin.id);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let creds = credentials();
        creds
            .create_admin("owner@example.com", pw("secret1"), None)
            .await
            .unwrap();

        let err = creds
            .create_admin("owner@example.com", pw("secret2"), Some("Other".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_the_same() {
        let creds = credentials();
        creds
            .create_admin("owner@example.com", pw("secret1"), None)
            .await
            .unwrap();

        let unknown = creds.authenticate("nobody@example.com", &pw("secret1")).await;
        let wrong = creds.authenticate("owner@example.com", &pw("nope123")).await;
        assert!(matches!(unknown, Err(ServiceError::InvalidCredential)));
        assert!(matches!(wrong, Err(ServiceError::InvalidCredential)));
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let creds = credentials();
        let admin = creds
            .create_admin("owner@example.com", pw("secret1"), None)
            .await
            .unwrap();

        let err = creds
            .change_password(admin.id, &pw("wrong!!"), pw("newpass1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredential));

        let err = creds
            .change_password(admin.id, &pw("secret1"), pw("short"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        creds
            .change_password(admin.id, &pw("secret1"), pw("newpass1"))
            .await
            .unwrap();
        assert!(creds
            .authenticate("owner@example.com", &pw("newpass1"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_reset_password_unknown_admin() {
        let err = credentials()
            .reset_password(ObjectId::new(), pw("newpass1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Admin")));
    }

    #[tokio::test]
    async fn test_unknown_email_still_runs_verification() {
        let creds = credentials();
        assert!(creds.dummy_hash.get().is_none());

        let err = creds
            .authenticate("nobody@example.com", &pw(DUMMY_PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCredential));
        let dummy = creds.dummy_hash.get().cloned().unwrap();
        assert!(dummy.starts_with("$argon2id$"));

        creds
            .authenticate("other@example.com", &pw("secret1"))
            .await
            .unwrap_err();
        assert_eq!(creds.dummy_hash.get(), Some(&dummy));
    }
}
