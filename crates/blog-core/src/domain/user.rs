use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity - represents a user in the system.
///
/// The email address is the login key. An `id` of zero marks a user that has
/// not been persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new, unsaved regular user.
    pub fn new(email: String, username: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            email,
            username,
            password_hash,
            is_staff: false,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new, unsaved user with staff and superuser flags set.
    pub fn new_superuser(email: String, username: String, password_hash: String) -> Self {
        Self {
            is_staff: true,
            is_superuser: true,
            ..Self::new(email, username, password_hash)
        }
    }

    /// Roles carried in issued tokens.
    pub fn roles(&self) -> Vec<String> {
        let mut roles = vec!["user".to_string()];
        if self.is_staff {
            roles.push("staff".to_string());
        }
        if self.is_superuser {
            roles.push("superuser".to_string());
        }
        roles
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public projection of a user, nested in post representations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub email: String,
}

/// Optional one-to-one profile attached to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i32,
    pub user_id: i32,
    pub pic: String,
    pub country: String,
}

/// Lower-cases the domain part of an email address, leaving the local part
/// untouched.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}
