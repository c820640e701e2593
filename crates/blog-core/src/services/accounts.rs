//! Signup, login and profile management.

use std::sync::Arc;

use super::duplicate;
use crate::domain::{Profile, User, normalize_email};
use crate::error::{DomainError, FieldError};
use crate::ports::{AuthError, PasswordService, TokenService, UserRepository};
use crate::validate::{self, COUNTRY_MAX, Errors, USERNAME_MAX};

/// Signup payload.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// A freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
    tokens: Arc<dyn TokenService>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    /// Creates a regular user.
    pub async fn create_user(&self, registration: Registration) -> Result<User, DomainError> {
        let (email, username) = self.validate_registration(&registration).await?;
        let hash = self.passwords.hash(&registration.password)?;
        let user = self
            .users
            .save(User::new(email, username, hash))
            .await
            .map_err(duplicate)?;
        tracing::info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Creates a user with staff and superuser flags.
    pub async fn create_superuser(&self, registration: Registration) -> Result<User, DomainError> {
        let (email, username) = self.validate_registration(&registration).await?;
        let hash = self.passwords.hash(&registration.password)?;
        let user = self
            .users
            .save(User::new_superuser(email, username, hash))
            .await
            .map_err(duplicate)?;
        tracing::info!(user_id = user.id, "superuser created");
        Ok(user)
    }

    /// Creates the superuser unless a user with that email already exists.
    pub async fn ensure_superuser(
        &self,
        registration: Registration,
    ) -> Result<Option<User>, DomainError> {
        let email = normalize_email(&registration.email);
        if self.users.find_by_email(&email).await?.is_some() {
            tracing::debug!("superuser already present");
            return Ok(None);
        }
        self.create_superuser(registration).await.map(Some)
    }

    /// Exchanges credentials for a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, DomainError> {
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.passwords.verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = self
            .tokens
            .generate_token(user.id, &user.email, user.roles())?;
        Ok(IssuedToken {
            token,
            expires_in: self.tokens.expiration_seconds(),
        })
    }

    /// The user and their profile, if one was created.
    pub async fn me(&self, user_id: i32) -> Result<(User, Option<Profile>), DomainError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "user",
                id: user_id,
            })?;
        let profile = self.users.find_profile(user_id).await?;
        Ok((user, profile))
    }

    /// Creates or replaces the profile of `user_id`.
    pub async fn save_profile(
        &self,
        user_id: i32,
        pic: Option<String>,
        country: Option<String>,
    ) -> Result<Profile, DomainError> {
        let mut errors = Errors::new();
        let pic = match pic {
            Some(pic) => errors.check(validate::http_url("pic", &pic)),
            None => {
                errors.push(FieldError::required("pic"));
                None
            }
        };
        let country = errors.check(validate::required_text(
            "country",
            country.as_deref(),
            Some(COUNTRY_MAX),
        ));
        errors.finish()?;

        let id = self
            .users
            .find_profile(user_id)
            .await?
            .map(|p| p.id)
            .unwrap_or_default();
        let profile = self
            .users
            .save_profile(Profile {
                id,
                user_id,
                pic: pic.unwrap_or_default(),
                country: country.unwrap_or_default(),
            })
            .await?;
        Ok(profile)
    }

    async fn validate_registration(
        &self,
        registration: &Registration,
    ) -> Result<(String, String), DomainError> {
        let mut errors = Errors::new();
        let email = errors
            .check(validate::email(&registration.email))
            .map(|e| normalize_email(&e));
        let username = errors.check(validate::text(
            "username",
            &registration.username,
            Some(USERNAME_MAX),
        ));
        errors.check(validate::password(&registration.password));

        if let Some(email) = &email {
            if self.users.find_by_email(email).await?.is_some() {
                errors.push(FieldError::new("email", "user with this email already exists."));
            }
        }
        if let Some(username) = &username {
            if self.users.find_by_username(username).await?.is_some() {
                errors.push(FieldError::new(
                    "username",
                    "user with this username already exists.",
                ));
            }
        }
        errors.finish()?;

        Ok((email.unwrap_or_default(), username.unwrap_or_default()))
    }
}
