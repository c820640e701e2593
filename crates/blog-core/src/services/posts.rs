//! Post operations: the five CRUD actions plus the by-author listing.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::{
    Category, NewPost, Page, PageRequest, PostChanges, PostDetails, PostFilter, PostInput,
    PostOrdering, Tag, WriteMode,
};
use crate::error::{DomainError, FieldError, RepoError};
use crate::policy::{self, Principal, WriteAction};
use crate::ports::{PostRepository, TaxonomyRepository};
use crate::validate::{self, Errors, TITLE_MAX};

const KIND: &str = "post";

/// Message returned when an author has no posts.
pub const NO_POSTS_FOR_AUTHOR: &str = "No posts found for this author.";

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn TaxonomyRepository<Category>>,
    tags: Arc<dyn TaxonomyRepository<Tag>>,
    anonymous_reads: bool,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        categories: Arc<dyn TaxonomyRepository<Category>>,
        tags: Arc<dyn TaxonomyRepository<Tag>>,
        anonymous_reads: bool,
    ) -> Self {
        Self {
            posts,
            categories,
            tags,
            anonymous_reads,
        }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filter: &PostFilter,
        ordering: &PostOrdering,
        page: PageRequest,
    ) -> Result<Page<PostDetails>, DomainError> {
        policy::ensure_can_read(principal, self.anonymous_reads)?;
        Ok(self.posts.list(filter, ordering, page).await?)
    }

    pub async fn retrieve(&self, principal: &Principal, id: i32) -> Result<PostDetails, DomainError> {
        policy::ensure_can_read(principal, self.anonymous_reads)?;
        self.load(id).await
    }

    /// Every post by `author_id`. An empty result is reported as not found.
    pub async fn by_author(
        &self,
        principal: &Principal,
        author_id: i32,
    ) -> Result<Vec<PostDetails>, DomainError> {
        policy::ensure_can_read(principal, self.anonymous_reads)?;
        let posts = self.posts.find_by_author(author_id).await?;
        if posts.is_empty() {
            return Err(DomainError::NotFoundMessage(NO_POSTS_FOR_AUTHOR.to_string()));
        }
        Ok(posts)
    }

    /// Creates a post authored by `principal`. Any author in the payload is
    /// never consulted.
    pub async fn create(
        &self,
        principal: &Principal,
        input: PostInput,
    ) -> Result<PostDetails, DomainError> {
        let author_id = principal.user_id().ok_or(DomainError::Unauthorized)?;

        let mut errors = Errors::new();
        let title = errors.check(validate::required_text(
            "title",
            input.title.as_deref(),
            Some(TITLE_MAX),
        ));
        let content = errors.check(validate::required_text(
            "content",
            input.content.as_deref(),
            None,
        ));
        let tag_ids = input.tag_ids.map(dedupe).unwrap_or_default();
        self.check_references(input.category_id, Some(&tag_ids), &mut errors)
            .await?;
        errors.finish()?;

        let post = self
            .posts
            .create(NewPost {
                author_id,
                title: title.unwrap_or_default(),
                content: content.unwrap_or_default(),
                category_id: input.category_id,
                tag_ids,
            })
            .await?;

        tracing::info!(post_id = post.id(), author_id, "post created");
        Ok(post)
    }

    /// Updates a post owned by `principal`. Omitted associations are kept;
    /// an explicit empty `tag_ids` clears the tags.
    pub async fn update(
        &self,
        principal: &Principal,
        id: i32,
        input: PostInput,
        mode: WriteMode,
    ) -> Result<PostDetails, DomainError> {
        principal.user_id().ok_or(DomainError::Unauthorized)?;
        let existing = self.load(id).await?;
        policy::ensure_can_write(principal, &existing, KIND, WriteAction::Edit)?;

        let mut errors = Errors::new();
        let title = text_change(&mut errors, "title", input.title, Some(TITLE_MAX), mode);
        let content = text_change(&mut errors, "content", input.content, None, mode);
        let tag_ids = input.tag_ids.map(dedupe);
        self.check_references(input.category_id, tag_ids.as_deref(), &mut errors)
            .await?;
        errors.finish()?;

        let changes = PostChanges {
            title,
            content,
            category_id: input.category_id,
            tag_ids,
        };
        let post = self.posts.update(id, changes).await.map_err(|e| match e {
            RepoError::NotFound => not_found(id),
            other => other.into(),
        })?;

        tracing::info!(post_id = id, "post updated");
        Ok(post)
    }

    pub async fn delete(&self, principal: &Principal, id: i32) -> Result<(), DomainError> {
        principal.user_id().ok_or(DomainError::Unauthorized)?;
        let existing = self.load(id).await?;
        policy::ensure_can_write(principal, &existing, KIND, WriteAction::Delete)?;

        self.posts.delete(id).await.map_err(|e| match e {
            RepoError::NotFound => not_found(id),
            other => other.into(),
        })?;

        tracing::info!(post_id = id, "post deleted");
        Ok(())
    }

    async fn load(&self, id: i32) -> Result<PostDetails, DomainError> {
        self.posts.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    /// Records a field error for each identifier that does not resolve.
    async fn check_references(
        &self,
        category_id: Option<i32>,
        tag_ids: Option<&[i32]>,
        errors: &mut Errors,
    ) -> Result<(), DomainError> {
        if let Some(id) = category_id {
            if self.categories.find_by_id(id).await?.is_none() {
                errors.push(FieldError::unknown_pk("category_id", id));
            }
        }

        if let Some(ids) = tag_ids.filter(|ids| !ids.is_empty()) {
            let found: BTreeSet<i32> = self
                .tags
                .find_by_ids(ids)
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect();
            for id in ids.iter().filter(|id| !found.contains(id)) {
                errors.push(FieldError::unknown_pk("tag_ids", *id));
            }
        }

        Ok(())
    }
}

fn text_change(
    errors: &mut Errors,
    field: &str,
    value: Option<String>,
    max: Option<usize>,
    mode: WriteMode,
) -> Option<String> {
    match value {
        Some(v) => errors.check(validate::text(field, &v, max)),
        None if mode.requires_all() => {
            errors.push(FieldError::required(field));
            None
        }
        None => None,
    }
}

/// Removes duplicate ids, keeping first-seen order.
fn dedupe(ids: Vec<i32>) -> Vec<i32> {
    let mut seen = BTreeSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn not_found(id: i32) -> DomainError {
    DomainError::NotFound {
        entity_type: KIND,
        id,
    }
}
