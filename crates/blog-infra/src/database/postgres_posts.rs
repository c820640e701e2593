//! PostgreSQL post repository.
//!
//! Filters are compiled into a single `SELECT` over `posts`; relations are
//! then loaded in bulk for the selected page, so a page costs four queries
//! regardless of its size.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbConn, DbErr, EntityTrait,
    IntoActiveModel, NotSet, Order, PaginatorTrait, QueryFilter, QueryOrder, Select, Set,
    TransactionTrait,
};

use blog_core::domain::{
    Category, NewPost, OrderField, Page, PageRequest, Post, PostChanges, PostDetails,
    PostFilter, PostOrdering, Tag, UserSummary,
};
use blog_core::error::RepoError;
use blog_core::ports::PostRepository;

use super::entity::{category, post, post_tag, tag, user};
use super::postgres_base::map_db_err;
use super::postgres_repo::{contains_pattern, lower};

/// Posts with their tag associations.
#[derive(Clone)]
pub struct PostgresPostRepository {
    db: DbConn,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

fn apply_filter(mut select: Select<post::Entity>, filter: &PostFilter) -> Select<post::Entity> {
    if let Some(name) = &filter.category {
        select = select.filter(
            post::Column::CategoryId.in_subquery(
                Query::select()
                    .column(category::Column::Id)
                    .from(category::Entity)
                    .and_where(category::Column::Name.eq(name.as_str()))
                    .to_owned(),
            ),
        );
    }

    if !filter.tags.is_empty() {
        select = select.filter(
            post::Column::Id.in_subquery(
                Query::select()
                    .column(post_tag::Column::PostId)
                    .from(post_tag::Entity)
                    .and_where(post_tag::Column::TagId.is_in(filter.tags.iter().copied()))
                    .to_owned(),
            ),
        );
    }

    if let Some(author) = filter.author {
        select = select.filter(post::Column::AuthorId.eq(author));
    }
    if let Some(from) = filter.created_from() {
        select = select.filter(post::Column::CreatedAt.gte(from));
    }
    if let Some(before) = filter.created_before() {
        select = select.filter(post::Column::CreatedAt.lt(before));
    }

    if let Some(needle) = filter.search_needle() {
        let tagged = Query::select()
            .column((post_tag::Entity, post_tag::Column::PostId))
            .from(post_tag::Entity)
            .inner_join(
                tag::Entity,
                Expr::col((tag::Entity, tag::Column::Id))
                    .equals((post_tag::Entity, post_tag::Column::TagId)),
            )
            .and_where(lower((tag::Entity, tag::Column::Name)).like(contains_pattern(&needle)))
            .to_owned();
        let authored = Query::select()
            .column(user::Column::Id)
            .from(user::Entity)
            .and_where(
                lower((user::Entity, user::Column::Username)).like(contains_pattern(&needle)),
            )
            .to_owned();

        select = select.filter(
            Condition::any()
                .add(lower((post::Entity, post::Column::Title)).like(contains_pattern(&needle)))
                .add(lower((post::Entity, post::Column::Content)).like(contains_pattern(&needle)))
                .add(post::Column::Id.in_subquery(tagged))
                .add(post::Column::AuthorId.in_subquery(authored)),
        );
    }

    select
}

fn apply_ordering(mut select: Select<post::Entity>, ordering: &PostOrdering) -> Select<post::Entity> {
    let direction = |descending: bool| if descending { Order::Desc } else { Order::Asc };

    for key in ordering.keys() {
        let column = match key.field {
            OrderField::CreatedAt => post::Column::CreatedAt,
            OrderField::Title => post::Column::Title,
        };
        select = select.order_by(column, direction(key.descending));
    }
    select.order_by(post::Column::Id, direction(ordering.id_descending()))
}

/// Resolves authors, categories and tags for `posts`, preserving order.
async fn hydrate<C>(db: &C, posts: Vec<post::Model>) -> Result<Vec<PostDetails>, DbErr>
where
    C: ConnectionTrait,
{
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let post_ids: Vec<i32> = posts.iter().map(|p| p.id).collect();
    let author_ids: BTreeSet<i32> = posts.iter().map(|p| p.author_id).collect();
    let category_ids: BTreeSet<i32> = posts.iter().filter_map(|p| p.category_id).collect();

    let authors: HashMap<i32, UserSummary> = user::Entity::find()
        .filter(user::Column::Id.is_in(author_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.id, UserSummary::from(m)))
        .collect();

    let categories: HashMap<i32, Category> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        category::Entity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, Category::from(m)))
            .collect()
    };

    let mut tags: HashMap<i32, Vec<Tag>> = HashMap::new();
    let links = post_tag::Entity::find()
        .filter(post_tag::Column::PostId.is_in(post_ids))
        .find_also_related(tag::Entity)
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?;
    for (link, tag) in links {
        if let Some(tag) = tag {
            tags.entry(link.post_id).or_default().push(tag.into());
        }
    }

    posts
        .into_iter()
        .map(|model| {
            let author = authors.get(&model.author_id).cloned().ok_or_else(|| {
                DbErr::RecordNotFound(format!("author {} of post {}", model.author_id, model.id))
            })?;
            let category = model
                .category_id
                .and_then(|id| categories.get(&id).cloned());
            let tags = tags.remove(&model.id).unwrap_or_default();
            Ok(PostDetails {
                post: Post::from(model),
                author,
                category,
                tags,
            })
        })
        .collect()
}

async fn hydrate_one<C>(db: &C, model: post::Model) -> Result<PostDetails, DbErr>
where
    C: ConnectionTrait,
{
    let id = model.id;
    hydrate(db, vec![model])
        .await?
        .pop()
        .ok_or_else(|| DbErr::RecordNotFound(format!("post {id}")))
}

/// Replaces the tag set of `post_id`.
async fn replace_tags<C>(db: &C, post_id: i32, tag_ids: &[i32]) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    post_tag::Entity::delete_many()
        .filter(post_tag::Column::PostId.eq(post_id))
        .exec(db)
        .await?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    let links = tag_ids.iter().map(|&tag_id| post_tag::ActiveModel {
        post_id: Set(post_id),
        tag_id: Set(tag_id),
    });
    post_tag::Entity::insert_many(links).exec(db).await?;
    Ok(())
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<PostDetails>, RepoError> {
        let Some(model) = post::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        hydrate_one(&self.db, model)
            .await
            .map(Some)
            .map_err(map_db_err)
    }

    async fn find_all(
        &self,
        filter: &PostFilter,
        ordering: &PostOrdering,
    ) -> Result<Vec<PostDetails>, RepoError> {
        let models = apply_ordering(apply_filter(post::Entity::find(), filter), ordering)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        hydrate(&self.db, models).await.map_err(map_db_err)
    }

    async fn list(
        &self,
        filter: &PostFilter,
        ordering: &PostOrdering,
        page: PageRequest,
    ) -> Result<Page<PostDetails>, RepoError> {
        let paginator = apply_ordering(apply_filter(post::Entity::find(), filter), ordering)
            .paginate(&self.db, page.page_size);
        let total = paginator.num_items().await.map_err(map_db_err)?;
        let models = paginator
            .fetch_page(page.page - 1)
            .await
            .map_err(map_db_err)?;
        let items = hydrate(&self.db, models).await.map_err(map_db_err)?;

        Ok(Page {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn create(&self, new_post: NewPost) -> Result<PostDetails, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let now = Utc::now();

        let model = post::ActiveModel {
            id: NotSet,
            author_id: Set(new_post.author_id),
            category_id: Set(new_post.category_id),
            title: Set(new_post.title),
            content: Set(new_post.content),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(map_db_err)?;

        replace_tags(&txn, model.id, &new_post.tag_ids)
            .await
            .map_err(map_db_err)?;
        let details = hydrate_one(&txn, model).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        tracing::debug!(post_id = details.id(), tags = details.tags.len(), "post inserted");
        Ok(details)
    }

    async fn update(&self, id: i32, changes: PostChanges) -> Result<PostDetails, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let existing = post::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or(RepoError::NotFound)?;

        let mut active = existing.into_active_model();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(content) = changes.content {
            active.content = Set(content);
        }
        if let Some(category_id) = changes.category_id {
            active.category_id = Set(Some(category_id));
        }
        active.updated_at = Set(Utc::now().into());
        let model = active.update(&txn).await.map_err(map_db_err)?;

        if let Some(tag_ids) = &changes.tag_ids {
            replace_tags(&txn, id, tag_ids).await.map_err(map_db_err)?;
        }
        let details = hydrate_one(&txn, model).await.map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(details)
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        // post_tags rows go with the post through ON DELETE CASCADE.
        let result = post::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
