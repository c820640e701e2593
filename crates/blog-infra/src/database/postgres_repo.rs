//! PostgreSQL user, category and tag repositories.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, IntoColumnRef, LikeExpr};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel,
    PaginatorTrait, PrimaryKeyTrait, QueryFilter, QueryOrder, TryIntoModel,
};

use blog_core::domain::{Page, PageRequest, Profile, Taxonomy, User};
use blog_core::error::RepoError;
use blog_core::ports::{TaxonomyRepository, UserRepository};

use super::entity::category::{self, Entity as CategoryEntity};
use super::entity::profile::{self, Entity as ProfileEntity};
use super::entity::tag::{self, Entity as TagEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL category repository.
pub type PostgresCategoryRepository = PostgresBaseRepository<CategoryEntity>;

/// PostgreSQL tag repository.
pub type PostgresTagRepository = PostgresBaseRepository<TagEntity>;

/// Masks the local part of an email address so it can be logged.
pub(crate) fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let (local, domain) = email.split_at(at_pos);
        let masked_local = match local.chars().next() {
            Some(first) if local.chars().count() > 1 => format!("{first}***"),
            _ => "***".to_string(),
        };
        format!("{}{}", masked_local, domain)
    } else {
        "***".to_string()
    }
}

/// `LOWER(column)`, for case-insensitive matching.
pub(crate) fn lower<C: IntoColumnRef>(col: C) -> Expr {
    Expr::expr(Func::lower(Expr::col(col)))
}

/// `%needle%` with LIKE wildcards in the needle escaped. The needle is
/// expected to be lower-cased already.
pub(crate) fn contains_pattern(needle: &str) -> LikeExpr {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    LikeExpr::new(format!("%{escaped}%")).escape('\\')
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_profile(&self, user_id: i32) -> Result<Option<Profile>, RepoError> {
        let result = ProfileEntity::find()
            .filter(profile::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn save_profile(&self, profile: Profile) -> Result<Profile, RepoError> {
        let active_model: profile::ActiveModel = profile.into();
        let saved = active_model.save(&self.db).await.map_err(map_db_err)?;
        let model = saved.try_into_model().map_err(map_db_err)?;

        Ok(model.into())
    }
}

/// Tables holding named labels.
pub trait NamedTable: EntityTrait {
    fn id_column() -> Self::Column;

    fn name_column() -> Self::Column;
}

impl NamedTable for CategoryEntity {
    fn id_column() -> Self::Column {
        category::Column::Id
    }

    fn name_column() -> Self::Column {
        category::Column::Name
    }
}

impl NamedTable for TagEntity {
    fn id_column() -> Self::Column {
        tag::Column::Id
    }

    fn name_column() -> Self::Column {
        tag::Column::Name
    }
}

#[async_trait]
impl<E, T> TaxonomyRepository<T> for PostgresBaseRepository<E>
where
    E: NamedTable,
    E::Model: IntoActiveModel<E::ActiveModel> + Sync + Send,
    E::ActiveModel: ActiveModelTrait<Entity = E>
        + ActiveModelBehavior
        + TryIntoModel<E::Model>
        + Send
        + Sync,
    E::PrimaryKey: PrimaryKeyTrait<ValueType = i32>,
    T: Taxonomy + From<E::Model> + Into<E::ActiveModel>,
{
    async fn find_by_name(&self, name: &str) -> Result<Option<T>, RepoError> {
        let result = E::find()
            .filter(E::name_column().eq(name))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<T>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = E::find()
            .filter(E::id_column().is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn list(&self, search: Option<&str>, page: PageRequest) -> Result<Page<T>, RepoError> {
        let mut select = E::find();
        if let Some(q) = search {
            select = select.filter(lower(E::name_column()).like(contains_pattern(&q.to_lowercase())));
        }

        let paginator = select
            .order_by_asc(E::name_column())
            .order_by_asc(E::id_column())
            .paginate(&self.db, page.page_size);
        let total = paginator.num_items().await.map_err(map_db_err)?;
        let models = paginator
            .fetch_page(page.page - 1)
            .await
            .map_err(map_db_err)?;

        tracing::debug!(kind = T::KIND, total, page = page.page, "listed");
        Ok(Page {
            items: models.into_iter().map(Into::into).collect(),
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }
}
