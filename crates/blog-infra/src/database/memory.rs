//! In-memory repositories - used when no `DATABASE_URL` is configured and in
//! tests.
//!
//! All repositories handed out by one [`InMemoryDatabase`] share the same
//! tables, and enforce the same unique and referential rules as the SQL
//! schema. Data is lost on process restart.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use blog_core::domain::{
    Category, NewPost, Page, PageRequest, Post, PostChanges, PostDetails, PostFilter,
    PostOrdering, Profile, Tag, Taxonomy, User,
};
use blog_core::error::RepoError;
use blog_core::ports::{BaseRepository, PostRepository, TaxonomyRepository, UserRepository};

#[derive(Default)]
pub struct Tables {
    sequences: HashMap<&'static str, i32>,
    users: BTreeMap<i32, User>,
    profiles: BTreeMap<i32, Profile>,
    categories: BTreeMap<i32, Category>,
    tags: BTreeMap<i32, Tag>,
    posts: BTreeMap<i32, Post>,
    /// Post id to its tag ids.
    post_tags: BTreeMap<i32, Vec<i32>>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i32 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }

    fn details(&self, post: &Post) -> Result<PostDetails, RepoError> {
        let author = self
            .users
            .get(&post.author_id)
            .map(User::summary)
            .ok_or_else(|| RepoError::Query(format!("post {} has no author", post.id)))?;
        let category = post
            .category_id
            .and_then(|id| self.categories.get(&id).cloned());
        let mut tags: Vec<Tag> = self
            .post_tags
            .get(&post.id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tags.get(id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(PostDetails {
            post: post.clone(),
            author,
            category,
            tags,
        })
    }

    fn check_references(&self, category_id: Option<i32>, tag_ids: &[i32]) -> Result<(), RepoError> {
        let category_ok = category_id.is_none_or(|id| self.categories.contains_key(&id));
        let tags_ok = tag_ids.iter().all(|id| self.tags.contains_key(id));
        if category_ok && tags_ok {
            Ok(())
        } else {
            Err(RepoError::Constraint(
                "Referenced entity does not exist".to_string(),
            ))
        }
    }

    fn remove_post(&mut self, id: i32) -> Option<Post> {
        self.post_tags.remove(&id);
        self.posts.remove(&id)
    }
}

fn already_exists() -> RepoError {
    RepoError::Constraint("Entity already exists".to_string())
}

fn dedupe(ids: &[i32]) -> Vec<i32> {
    let mut out: Vec<i32> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

/// Shared in-memory tables.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository {
            tables: Arc::clone(&self.tables),
        }
    }

    pub fn categories(&self) -> InMemoryTaxonomyRepository<Category> {
        InMemoryTaxonomyRepository::new(Arc::clone(&self.tables))
    }

    pub fn tags(&self) -> InMemoryTaxonomyRepository<Tag> {
        InMemoryTaxonomyRepository::new(Arc::clone(&self.tables))
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository {
            tables: Arc::clone(&self.tables),
        }
    }
}

pub struct InMemoryUserRepository {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl BaseRepository<User, i32> for InMemoryUserRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn save(&self, mut user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;

        let clash = tables.users.values().any(|u| {
            u.id != user.id && (u.email == user.email || u.username == user.username)
        });
        if clash {
            return Err(already_exists());
        }

        if user.id == 0 {
            user.id = tables.next_id("users");
        } else if !tables.users.contains_key(&user.id) {
            return Err(RepoError::NotFound);
        } else {
            user.updated_at = Utc::now();
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }

        // Mirror ON DELETE CASCADE on everything the user authored.
        tables.profiles.retain(|_, p| p.user_id != id);
        let posts: Vec<i32> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in posts {
            tables.remove_post(post_id);
        }
        let categories: Vec<i32> = tables
            .categories
            .values()
            .filter(|c| c.author_id == id)
            .map(|c| c.id)
            .collect();
        for category_id in categories {
            Category::detach(&mut tables, category_id);
        }
        let tags: Vec<i32> = tables
            .tags
            .values()
            .filter(|t| t.author_id == id)
            .map(|t| t.id)
            .collect();
        for tag_id in tags {
            Tag::detach(&mut tables, tag_id);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_profile(&self, user_id: i32) -> Result<Option<Profile>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn save_profile(&self, mut profile: Profile) -> Result<Profile, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&profile.user_id) {
            return Err(RepoError::Constraint(
                "Referenced entity does not exist".to_string(),
            ));
        }

        let existing = tables
            .profiles
            .values()
            .find(|p| p.user_id == profile.user_id)
            .map(|p| p.id);
        profile.id = match existing {
            Some(id) => id,
            None => tables.next_id("profiles"),
        };
        tables.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }
}

/// Access to the table backing one taxonomy kind.
pub trait MemoryTable: Taxonomy {
    fn table(tables: &Tables) -> &BTreeMap<i32, Self>;

    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<i32, Self>;

    fn with_id(self, id: i32) -> Self;

    /// Removes the row and whatever references it.
    fn detach(tables: &mut Tables, id: i32) -> Option<Self>;
}

impl MemoryTable for Category {
    fn table(tables: &Tables) -> &BTreeMap<i32, Self> {
        &tables.categories
    }

    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<i32, Self> {
        &mut tables.categories
    }

    fn with_id(self, id: i32) -> Self {
        Self { id, ..self }
    }

    fn detach(tables: &mut Tables, id: i32) -> Option<Self> {
        // ON DELETE SET NULL
        for post in tables.posts.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
        tables.categories.remove(&id)
    }
}

impl MemoryTable for Tag {
    fn table(tables: &Tables) -> &BTreeMap<i32, Self> {
        &tables.tags
    }

    fn table_mut(tables: &mut Tables) -> &mut BTreeMap<i32, Self> {
        &mut tables.tags
    }

    fn with_id(self, id: i32) -> Self {
        Self { id, ..self }
    }

    fn detach(tables: &mut Tables, id: i32) -> Option<Self> {
        for tag_ids in tables.post_tags.values_mut() {
            tag_ids.retain(|t| *t != id);
        }
        tables.tags.remove(&id)
    }
}

pub struct InMemoryTaxonomyRepository<T> {
    tables: Arc<RwLock<Tables>>,
    _kind: PhantomData<T>,
}

impl<T> InMemoryTaxonomyRepository<T> {
    fn new(tables: Arc<RwLock<Tables>>) -> Self {
        Self {
            tables,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<T: MemoryTable> BaseRepository<T, i32> for InMemoryTaxonomyRepository<T> {
    async fn find_by_id(&self, id: i32) -> Result<Option<T>, RepoError> {
        let tables = self.tables.read().await;
        Ok(T::table(&tables).get(&id).cloned())
    }

    async fn save(&self, mut entity: T) -> Result<T, RepoError> {
        let mut tables = self.tables.write().await;

        let clash = T::table(&tables)
            .values()
            .any(|e| e.id() != entity.id() && e.name() == entity.name());
        if clash {
            return Err(already_exists());
        }

        if entity.id() == 0 {
            let id = tables.next_id(T::KIND);
            entity = entity.with_id(id);
        } else if !T::table(&tables).contains_key(&entity.id()) {
            return Err(RepoError::NotFound);
        }
        T::table_mut(&mut tables).insert(entity.id(), entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        T::detach(&mut tables, id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl<T: MemoryTable> TaxonomyRepository<T> for InMemoryTaxonomyRepository<T> {
    async fn find_by_name(&self, name: &str) -> Result<Option<T>, RepoError> {
        let tables = self.tables.read().await;
        Ok(T::table(&tables).values().find(|e| e.name() == name).cloned())
    }

    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<T>, RepoError> {
        let tables = self.tables.read().await;
        let table = T::table(&tables);
        Ok(ids.iter().filter_map(|id| table.get(id).cloned()).collect())
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<T>, RepoError> {
        let tables = self.tables.read().await;
        let needle = search.map(str::to_lowercase);
        let mut items: Vec<T> = T::table(&tables)
            .values()
            .filter(|e| {
                needle
                    .as_deref()
                    .is_none_or(|n| e.name().to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
        Ok(page.slice(items))
    }
}

pub struct InMemoryPostRepository {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<PostDetails>, RepoError> {
        let tables = self.tables.read().await;
        tables.posts.get(&id).map(|p| tables.details(p)).transpose()
    }

    async fn find_all(
        &self,
        filter: &PostFilter,
        ordering: &PostOrdering,
    ) -> Result<Vec<PostDetails>, RepoError> {
        let tables = self.tables.read().await;
        let mut posts = Vec::new();
        for post in tables.posts.values() {
            let details = tables.details(post)?;
            if filter.matches(&details) {
                posts.push(details);
            }
        }
        ordering.sort(&mut posts);
        Ok(posts)
    }

    async fn list(
        &self,
        filter: &PostFilter,
        ordering: &PostOrdering,
        page: PageRequest,
    ) -> Result<Page<PostDetails>, RepoError> {
        let posts = self.find_all(filter, ordering).await?;
        Ok(page.slice(posts))
    }

    async fn create(&self, new_post: NewPost) -> Result<PostDetails, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new_post.author_id) {
            return Err(RepoError::Constraint(
                "Referenced entity does not exist".to_string(),
            ));
        }
        let tag_ids = dedupe(&new_post.tag_ids);
        tables.check_references(new_post.category_id, &tag_ids)?;

        let now = Utc::now();
        let post = Post {
            id: tables.next_id("posts"),
            author_id: new_post.author_id,
            category_id: new_post.category_id,
            title: new_post.title,
            content: new_post.content,
            created_at: now,
            updated_at: now,
        };
        tables.post_tags.insert(post.id, tag_ids);
        tables.posts.insert(post.id, post.clone());
        tables.details(&post)
    }

    async fn update(&self, id: i32, changes: PostChanges) -> Result<PostDetails, RepoError> {
        let mut tables = self.tables.write().await;
        let mut post = tables.posts.get(&id).cloned().ok_or(RepoError::NotFound)?;

        let tag_ids = changes.tag_ids.as_deref().map(dedupe);
        tables.check_references(changes.category_id, tag_ids.as_deref().unwrap_or_default())?;

        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(category_id) = changes.category_id {
            post.category_id = Some(category_id);
        }
        post.updated_at = Utc::now();

        if let Some(tag_ids) = tag_ids {
            tables.post_tags.insert(id, tag_ids);
        }
        tables.posts.insert(id, post.clone());
        tables.details(&post)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables
            .remove_post(id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}
