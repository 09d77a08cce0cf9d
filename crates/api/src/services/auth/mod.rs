//! Authentication service.
//!
//! Password accounts with argon2id hashes, and bearer tokens for every
//! authenticated route.

mod error;
pub mod jwt;

pub use error::AuthError;
pub use jwt::{AuthUser, Claims, JwtError, JwtService};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use marketstall_core::{Email, Role, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// A user together with a freshly issued token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserRepository,
    jwt: &'a JwtService,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserRepository, jwt: &'a JwtService) -> Self {
        Self { users, jwt }
    }

    /// Create an account with the given role.
    ///
    /// # Errors
    ///
    /// See [`create_account`].
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        create_account(self.users, email, password, role).await
    }

    /// Self-service registration. New accounts always get [`Role::User`].
    ///
    /// # Errors
    ///
    /// See [`create_user`](Self::create_user); also `AuthError::Token` if the
    /// token cannot be issued.
    pub async fn register(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.create_user(email, password, Role::User).await?;
        tracing::info!(user_id = %user.id, "User registered");
        self.session(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .find_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;
        self.session(user)
    }

    /// The account behind a verified token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the account was removed.
    pub async fn current_user(&self, id: UserId) -> Result<User, AuthError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    fn session(&self, user: User) -> Result<Session, AuthError> {
        let token = self.jwt.issue(&user)?;
        Ok(Session { user, token })
    }
}

/// Create an account without issuing a token. Used by registration and by
/// operator tooling that provisions admins.
///
/// # Errors
///
/// Returns `AuthError::InvalidEmail` if the email format is invalid.
/// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
/// Returns `AuthError::UserAlreadyExists` if the email is already registered.
pub async fn create_account(
    users: &dyn UserRepository,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, AuthError> {
    let email = Email::parse(email)?;
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    users
        .create(NewUser {
            email,
            password_hash,
            role,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::JwtSettings;
    use crate::db::memory::MemoryUserRepository;

    fn jwt() -> JwtService {
        JwtService::new(&JwtSettings {
            secret: SecretString::from("k3Yq8$zP1!wLm4@tR7#vN2&xC9*bH5^d"),
            ttl_minutes: 60,
            issuer: "http://localhost:5000".to_string(),
        })
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let users = MemoryUserRepository::default();
        let jwt = jwt();
        let auth = AuthService::new(&users, &jwt);

        let registered = auth.register(" Jo@Shop.Test ", "hunter2hunter2").await.unwrap();
        assert_eq!(registered.user.email.as_str(), "jo@shop.test");
        assert_eq!(registered.user.role, Role::User);
        assert_eq!(jwt.verify(&registered.token).unwrap().id, registered.user.id);

        let session = auth.login("jo@shop.test", "hunter2hunter2").await.unwrap();
        assert_eq!(session.user.id, registered.user.id);

        assert!(matches!(
            auth.login("jo@shop.test", "nope-nope").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@shop.test", "hunter2hunter2").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_weak_passwords() {
        let users = MemoryUserRepository::default();
        let jwt = jwt();
        let auth = AuthService::new(&users, &jwt);

        assert!(matches!(
            auth.register("jo@shop.test", "short").await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            auth.register("not-an-email", "long-enough").await,
            Err(AuthError::InvalidEmail(_))
        ));

        auth.register("jo@shop.test", "long-enough").await.unwrap();
        assert!(matches!(
            auth.register("JO@shop.test", "long-enough").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }
}
