use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    NewPost, Page, PageRequest, PostChanges, PostDetails, PostFilter, PostOrdering, Profile,
    Taxonomy, User,
};
use crate::error::RepoError;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Save an entity. Unsaved entities (id 0) are inserted and returned with
    /// their assigned id; others are updated in place.
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, i32> {
    /// Find a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    async fn find_profile(&self, user_id: i32) -> Result<Option<Profile>, RepoError>;

    /// Insert or replace the profile of `profile.user_id`.
    async fn save_profile(&self, profile: Profile) -> Result<Profile, RepoError>;
}

/// Category and tag repository.
#[async_trait]
pub trait TaxonomyRepository<T: Taxonomy>: BaseRepository<T, i32> {
    async fn find_by_name(&self, name: &str) -> Result<Option<T>, RepoError>;

    /// Every stored entity whose id is in `ids`. Missing ids are skipped.
    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<T>, RepoError>;

    /// Name-ordered page, optionally narrowed by a case-insensitive name
    /// substring.
    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<T>, RepoError>;
}

/// Post repository. Every method returns posts with their author, category
/// and tags resolved.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<PostDetails>, RepoError>;

    /// All posts passing `filter`, sorted by `ordering`.
    async fn find_all(
        &self,
        filter: &PostFilter,
        ordering: &PostOrdering,
    ) -> Result<Vec<PostDetails>, RepoError>;

    /// One page of the posts passing `filter`.
    async fn list(
        &self,
        filter: &PostFilter,
        ordering: &PostOrdering,
        page: PageRequest,
    ) -> Result<Page<PostDetails>, RepoError>;

    /// Insert the post and its tag associations atomically.
    async fn create(&self, post: NewPost) -> Result<PostDetails, RepoError>;

    /// Apply `changes` atomically. Fails with [`RepoError::NotFound`] when the
    /// post does not exist.
    async fn update(&self, id: i32, changes: PostChanges) -> Result<PostDetails, RepoError>;

    async fn delete(&self, id: i32) -> Result<(), RepoError>;

    // Typed single-predicate queries over `find_all`, in default order. The
    // HTTP list composes all predicates through `list` instead; only
    // `find_by_author` backs a route.

    async fn find_by_author(&self, author_id: i32) -> Result<Vec<PostDetails>, RepoError> {
        self.find_all(&PostFilter::by_author(author_id), &PostOrdering::default())
            .await
    }

    /// Posts created between the two UTC days, both inclusive.
    async fn find_by_date_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PostDetails>, RepoError> {
        self.find_all(&PostFilter::by_date_range(start, end), &PostOrdering::default())
            .await
    }

    /// Posts matching `query` as in the `search` list parameter.
    async fn search_text(&self, query: &str) -> Result<Vec<PostDetails>, RepoError> {
        self.find_all(&PostFilter::by_text(query), &PostOrdering::default())
            .await
    }
}
