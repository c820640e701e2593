//! Data Transfer Objects - request/response types for the API.

use blog_core::domain::{
    Category, PostDetails, PostInput, Profile, RawPostFilter, Tag, User, UserSummary,
};
use blog_core::error::FieldError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Credential exchange. The login key is the email; `username` is accepted
/// as an alias for clients that post the conventional token-login form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
}

/// Response containing an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Create or replace the caller's profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub pic: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub pic: String,
    pub country: String,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            pic: profile.pic,
            country: profile.country,
        }
    }
}

/// Response containing a user's account information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
    pub profile: Option<ProfileResponse>,
}

impl UserResponse {
    pub fn new(user: User, profile: Option<Profile>) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            is_staff: user.is_staff,
            created_at: user.created_at,
            profile: profile.map(Into::into),
        }
    }
}

/// Author as nested in a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
}

impl From<UserSummary> for AuthorResponse {
    fn from(user: UserSummary) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// Category or tag representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyResponse {
    pub id: i32,
    pub name: String,
}

impl From<Category> for TaxonomyResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

impl From<Tag> for TaxonomyResponse {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name,
        }
    }
}

/// Category or tag write payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomyRequest {
    pub name: Option<String>,
}

/// Post write payload. Categories and tags are referenced by id; any author
/// field sent by the client is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i32>,
    pub tag_ids: Option<Vec<i32>>,
}

impl From<PostRequest> for PostInput {
    fn from(req: PostRequest) -> Self {
        Self {
            title: req.title,
            content: req.content,
            category_id: req.category_id,
            tag_ids: req.tag_ids,
        }
    }
}

/// Post read representation with nested author, category and tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: AuthorResponse,
    pub category: Option<TaxonomyResponse>,
    pub tags: Vec<TaxonomyResponse>,
}

impl From<PostDetails> for PostResponse {
    fn from(details: PostDetails) -> Self {
        Self {
            id: details.post.id,
            title: details.post.title,
            content: details.post.content,
            created_at: details.post.created_at,
            updated_at: details.post.updated_at,
            author: details.author.into(),
            category: details.category.map(Into::into),
            tags: details.tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// Query string accepted by `GET /posts/`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostListQuery {
    pub category: Option<String>,
    /// Comma-separated tag ids.
    pub tags: Option<String>,
    pub author: Option<String>,
    pub created_at: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl PostListQuery {
    /// Reads the parameters from a raw query string. `tags` may repeat
    /// (`?tags=1&tags=2`) and each occurrence may hold a comma list; for any
    /// other repeated key the last value wins.
    pub fn from_query(query: &str) -> Result<Self, Vec<FieldError>> {
        let mut parsed = Self::default();
        let mut tags = Vec::new();
        let mut errors = Vec::new();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "tags" => tags.push(value),
                "category" => parsed.category = Some(value),
                "author" => parsed.author = Some(value),
                "created_at" => parsed.created_at = Some(value),
                "start_date" => parsed.start_date = Some(value),
                "end_date" => parsed.end_date = Some(value),
                "search" => parsed.search = Some(value),
                "ordering" => parsed.ordering = Some(value),
                "page" => parsed.page = number("page", &value, &mut errors),
                "page_size" => parsed.page_size = number("page_size", &value, &mut errors),
                _ => {}
            }
        }

        if !tags.is_empty() {
            parsed.tags = Some(tags.join(","));
        }
        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(errors)
        }
    }

    pub fn filter(&self) -> RawPostFilter {
        RawPostFilter {
            category: self.category.clone(),
            tags: self.tags.clone(),
            author: self.author.clone(),
            created_at: self.created_at.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            search: self.search.clone(),
        }
    }
}

fn number(field: &str, value: &str, errors: &mut Vec<FieldError>) -> Option<u64> {
    match value.trim() {
        "" => None,
        v => v.parse().map_or_else(
            |_| {
                errors.push(FieldError::new(field, "A valid integer is required."));
                None
            },
            Some,
        ),
    }
}

/// Query string accepted by the category and tag list endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}
