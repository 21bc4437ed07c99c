// =============================================================================
// ADMIN REPOSITORY
// =============================================================================
// Back-office accounts. Usernames and emails are unique; passwords are only
// ever stored as Argon2 hashes.
// =============================================================================

use std::sync::Arc;

use chrono::Utc;

use crate::auth::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::models::{Admin, AdminPatch, AdminRole, NewAdmin};
use crate::store::{to_patch, Filter, RecordStore};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_ADMIN_EMAIL: &str = "admin@mk-local.com";

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct AdminRepository {
    store: Arc<dyn RecordStore<Admin>>,
}

impl AdminRepository {
    pub fn new(store: Arc<dyn RecordStore<Admin>>) -> Self {
        Self { store }
    }

    pub async fn find_by_username(&self, username: &str) -> Option<Admin> {
        find_by_username(self.store.as_ref(), username).await
    }

    pub async fn create(&self, input: NewAdmin) -> AppResult<Admin> {
        create_admin(self.store.as_ref(), input).await
    }

    /// Patch an admin addressed by record ID or by username.
    pub async fn update(&self, id_or_username: &str, patch: AdminPatch) -> AppResult<Admin> {
        let admin = match self.store.get(id_or_username).await {
            Some(admin) => admin,
            None => self
                .find_by_username(id_or_username)
                .await
                .ok_or_else(|| AppError::not_found("Admin"))?,
        };

        self.store
            .update(&admin.id, to_patch(&patch)?)
            .await?
            .ok_or_else(|| AppError::not_found("Admin"))
    }

    /// Verify a username/password pair. Unknown user and wrong password are
    /// indistinguishable to the caller.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Admin> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        match self.find_by_username(username.trim()).await {
            Some(admin) if verify_password(password, &admin.password) => {
                tracing::info!(username = %admin.username, "Admin logged in");
                Ok(admin)
            }
            _ => {
                tracing::warn!(username = %username, "Failed admin login");
                Err(AppError::Unauthorized("Invalid credentials".to_string()))
            }
        }
    }

    pub async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "New password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let admin = self
            .find_by_username(username)
            .await
            .ok_or_else(|| AppError::not_found("Admin"))?;
        if !verify_password(current_password, &admin.password) {
            return Err(AppError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        let patch = AdminPatch {
            password: Some(hash_password(new_password)?),
            ..Default::default()
        };
        self.update(&admin.id, patch).await?;
        tracing::info!(username = %admin.username, "Admin password changed");
        Ok(())
    }
}

async fn find_by_username(store: &dyn RecordStore<Admin>, username: &str) -> Option<Admin> {
    store
        .list(&Filter::all().eq("username", username))
        .await
        .into_iter()
        .next()
}

async fn create_admin(store: &dyn RecordStore<Admin>, input: NewAdmin) -> AppResult<Admin> {
    let username = input.username.trim().to_string();
    let email = input.email.trim().to_lowercase();

    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if find_by_username(store, &username).await.is_some() {
        return Err(AppError::Validation(format!(
            "Username '{username}' is already taken"
        )));
    }
    if store.count(&Filter::all().eq("email", email.as_str())).await > 0 {
        return Err(AppError::Validation(format!(
            "Email '{email}' is already registered"
        )));
    }

    let admin = Admin {
        id: String::new(),
        username,
        password: hash_password(&input.password)?,
        email,
        role: input.role,
        created_at: Utc::now(),
    };
    Ok(store.create(admin).await?)
}

/// Make sure the bootstrap `admin` account exists in `store`.
///
/// Runs against the file store at startup and against the database store
/// each time it (re)connects.
pub async fn ensure_default_admin(store: &dyn RecordStore<Admin>) -> AppResult<()> {
    if find_by_username(store, DEFAULT_ADMIN_USERNAME).await.is_some() {
        return Ok(());
    }

    let admin = create_admin(
        store,
        NewAdmin {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            role: AdminRole::SuperAdmin,
        },
    )
    .await?;

    tracing::warn!(
        username = %admin.username,
        backend = %store.backend(),
        "Created default admin account; change its password"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::file::FileStore;
    use tempfile::TempDir;

    fn repo(dir: &TempDir) -> AdminRepository {
        AdminRepository::new(Arc::new(FileStore::<Admin>::new(dir.path())))
    }

    fn new_admin(username: &str, email: &str) -> NewAdmin {
        NewAdmin {
            username: username.into(),
            password: "secret1".into(),
            email: email.into(),
            role: AdminRole::Admin,
        }
    }

    #[tokio::test]
    async fn test_default_admin_is_seeded_once() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::<Admin>::new(dir.path());

        ensure_default_admin(&store).await.unwrap();
        ensure_default_admin(&store).await.unwrap();

        let admins = store.list(&Filter::all()).await;
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].role, AdminRole::SuperAdmin);
        assert_ne!(admins[0].password, DEFAULT_ADMIN_PASSWORD);

        let repo = AdminRepository::new(Arc::new(store));
        assert!(repo.authenticate("admin", "admin123").await.is_ok());
    }

    #[tokio::test]
    async fn test_usernames_and_emails_are_unique() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);

        repo.create(new_admin("sara", "sara@example.com")).await.unwrap();
        assert!(matches!(
            repo.create(new_admin("sara", "other@example.com")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            repo.create(new_admin("omar", "SARA@example.com")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_credentials() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        repo.create(new_admin("sara", "sara@example.com")).await.unwrap();

        assert!(matches!(
            repo.authenticate("sara", "wrong!").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            repo.authenticate("nobody", "secret1").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            repo.authenticate("", "").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_change_password() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        repo.create(new_admin("sara", "sara@example.com")).await.unwrap();

        assert!(matches!(
            repo.change_password("sara", "secret1", "short").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            repo.change_password("sara", "wrong", "longenough").await,
            Err(AppError::Validation(_))
        ));

        repo.change_password("sara", "secret1", "longenough").await.unwrap();
        assert!(repo.authenticate("sara", "longenough").await.is_ok());
        assert!(repo.authenticate("sara", "secret1").await.is_err());
    }

    #[tokio::test]
    async fn test_update_by_id_or_username() {
        let dir = TempDir::new().unwrap();
        let repo = repo(&dir);
        let admin = repo.create(new_admin("sara", "sara@example.com")).await.unwrap();

        let by_name = repo
            .update(
                "sara",
                AdminPatch {
                    role: Some(AdminRole::SuperAdmin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_name.role, AdminRole::SuperAdmin);

        let by_id = repo
            .update(
                &admin.id,
                AdminPatch {
                    email: Some("new@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_id.email, "new@example.com");
        assert_eq!(by_id.role, AdminRole::SuperAdmin);

        assert!(matches!(
            repo.update("ghost", AdminPatch::default()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
