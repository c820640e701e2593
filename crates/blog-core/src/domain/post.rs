use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::taxonomy::{Category, Tag};
use super::user::UserSummary;
use crate::policy::Authored;

/// Post entity - represents a blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i32,
    pub author_id: i32,
    pub category_id: Option<i32>,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post together with the records it references, as rendered to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetails {
    pub post: Post,
    pub author: UserSummary,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

impl PostDetails {
    pub fn id(&self) -> i32 {
        self.post.id
    }

    pub fn tag_ids(&self) -> Vec<i32> {
        self.tags.iter().map(|t| t.id).collect()
    }
}

impl Authored for Post {
    fn author_id(&self) -> i32 {
        self.author_id
    }
}

impl Authored for PostDetails {
    fn author_id(&self) -> i32 {
        self.post.author_id
    }
}

/// Validated data for inserting a post with its associations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: i32,
    pub title: String,
    pub content: String,
    pub category_id: Option<i32>,
    pub tag_ids: Vec<i32>,
}

/// Validated changes to an existing post. `None` leaves a field untouched;
/// `tag_ids: Some(vec![])` removes every tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i32>,
    pub tag_ids: Option<Vec<i32>>,
}

/// Unvalidated write payload for a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<i32>,
    pub tag_ids: Option<Vec<i32>>,
}

/// How a write payload is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// POST: required fields must be present.
    Create,
    /// PUT: required fields must be present, associations follow update rules.
    Replace,
    /// PATCH: only supplied fields change.
    Partial,
}

impl WriteMode {
    pub fn requires_all(self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}
