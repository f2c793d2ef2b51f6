//! User service.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use scribe_common::{AppError, AppResult, IdGenerator};
use scribe_db::{entities::user, repositories::UserRepository};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::auth::TokenService;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    tokens: TokenService,
    id_gen: IdGenerator,
}

/// Input for registering a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 50))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

/// Input for logging in.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1))]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// Input for an admin updating a user.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    #[validate(length(min = 3, max = 50))]
    pub name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    pub is_admin: Option<bool>,
}

/// Input for changing one's own password.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordInput {
    #[validate(length(min = 1))]
    pub current_password: String,

    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
}

/// A user together with a freshly issued access token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: user::Model,
    pub token: String,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, tokens: TokenService) -> Self {
        Self {
            user_repo,
            tokens,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account and sign it in.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AuthSession> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::BadRequest("Email already exists".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let now = Utc::now();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            is_admin: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let user = self.user_repo.create(model).await?;
        let token = self.tokens.issue(&user.id)?;

        tracing::info!(user_id = %user.id, "Registered user");

        Ok(AuthSession { user, token })
    }

    /// Check credentials and issue a token.
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthSession> {
        input.validate()?;

        let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

        let user = self
            .user_repo
            .find_by_email(input.email.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(invalid());
        }

        let token = self.tokens.issue(&user.id)?;
        Ok(AuthSession { user, token })
    }

    /// Resolve the user behind an access token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        let claims = self.tokens.verify(token)?;
        self.user_repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("user no longer exists".to_string()))
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Every user, oldest first.
    pub async fn list_users(&self) -> AppResult<Vec<user::Model>> {
        self.user_repo.find_all().await
    }

    /// Users with the given IDs, in no particular order.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        self.user_repo.find_by_ids(ids).await
    }

    /// Update a user's name, email or admin flag. Absent fields are kept.
    pub async fn update_user(&self, id: &str, input: UpdateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.user_repo.get_by_id(id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(email) = input.email {
            active.email = Set(email.trim().to_lowercase());
        }
        if let Some(is_admin) = input.is_admin {
            active.is_admin = Set(is_admin);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = self.user_repo.update(active).await?;
        tracing::info!(user_id = %updated.id, is_admin = updated.is_admin, "Updated user");
        Ok(updated)
    }

    /// Delete a user account.
    ///
    /// Posts, comments and votes by the user are kept.
    pub async fn delete_user(&self, id: &str) -> AppResult<()> {
        if !self.user_repo.delete(id).await? {
            return Err(AppError::UserNotFound(id.to_string()));
        }
        tracing::info!(user_id = %id, "Deleted user");
        Ok(())
    }

    /// Change the caller's password after checking the current one.
    pub async fn update_password(
        &self,
        user: &user::Model,
        input: UpdatePasswordInput,
    ) -> AppResult<()> {
        input.validate()?;

        let user = self.user_repo.get_by_id(&user.id).await?;

        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(AppError::Unauthorized(
                "Invalid current password".to_string(),
            ));
        }

        if input.current_password == input.new_password {
            return Err(AppError::BadRequest(
                "Current password and new password are the same".to_string(),
            ));
        }

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(&input.new_password)?);
        active.updated_at = Set(Utc::now().into());
        let updated = self.user_repo.update(active).await?;

        tracing::info!(user_id = %updated.id, "Password changed");
        Ok(())
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use scribe_common::config::AuthConfig;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn tokens() -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_lifetime_secs: 3600,
        })
    }

    fn create_test_user(id: &str, email: &str, password: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Ada".to_string(),
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
            is_admin: false,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn service(db: Arc<DatabaseConnection>) -> UserService {
        UserService::new(UserRepository::new(db), tokens())
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("test", "invalid_hash").is_err());
    }

    #[test]
    fn test_register_input_validation() {
        let short_name = RegisterInput {
            name: "Al".to_string(),
            email: "al@example.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(short_name.validate().is_err());

        let bad_email = RegisterInput {
            name: "Alan".to_string(),
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let short_password = RegisterInput {
            name: "Alan".to_string(),
            email: "al@example.com".to_string(),
            password: "12345".to_string(),
        };
        assert!(short_password.validate().is_err());
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let existing = create_test_user("u1", "ada@example.com", "secret1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let result = service(db)
            .register(RegisterInput {
                name: "Ada".to_string(),
                email: "Ada@Example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == "Email already exists"));
    }

    #[tokio::test]
    async fn test_register_issues_token() {
        let created = create_test_user("u1", "ada@example.com", "secret1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created]])
                .into_connection(),
        );

        let session = service(db)
            .register(RegisterInput {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(tokens().verify(&session.token).unwrap().sub, "u1");
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let result = service(db)
            .login(LoginInput {
                email: "nobody@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(msg)) if msg == "Invalid credentials"));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let user = create_test_user("u1", "ada@example.com", "secret1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let result = service(db)
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_login_success() {
        let user = create_test_user("u1", "ada@example.com", "secret1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .into_connection(),
        );

        let session = service(db)
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.user.id, "u1");
        assert!(!session.token.is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_by_token_for_deleted_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let token = tokens().issue("gone").unwrap();

        let result = service(db).authenticate_by_token(&token).await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_update_password_wrong_current() {
        let user = create_test_user("u1", "ada@example.com", "secret1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let result = service(db)
            .update_password(
                &user,
                UpdatePasswordInput {
                    current_password: "nope".to_string(),
                    new_password: "secret2".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_update_password_same_as_current() {
        let user = create_test_user("u1", "ada@example.com", "secret1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let result = service(db)
            .update_password(
                &user,
                UpdatePasswordInput {
                    current_password: "secret1".to_string(),
                    new_password: "secret1".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_user_keeps_absent_fields() {
        let user = create_test_user("u1", "ada@example.com", "secret1");
        let updated = user::Model {
            is_admin: true,
            ..user.clone()
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_query_results([[updated]])
                .into_connection(),
        );

        let result = service(db)
            .update_user(
                "u1",
                UpdateUserInput {
                    is_admin: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(result.is_admin);
        assert_eq!(result.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_delete_missing_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let result = service(db).delete_user("ghost").await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }
}
