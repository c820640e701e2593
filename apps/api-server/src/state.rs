//! Application state - shared across all handlers.

use std::sync::Arc;

use blog_core::domain::{Category, Tag};
use blog_core::ports::{
    PasswordService, PostRepository, TaxonomyRepository, TokenService, UserRepository,
};
use blog_core::services::{AccountService, PostService, TaxonomyService};
use blog_core::DomainError;
use blog_infra::{Argon2PasswordService, InMemoryDatabase, JwtTokenService};

use crate::config::AppConfig;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("database unavailable: {0}")]
    Database(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("superuser bootstrap failed: {0}")]
    Bootstrap(#[from] DomainError),
}

/// The repositories backing one storage engine.
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn TaxonomyRepository<Category>>,
    pub tags: Arc<dyn TaxonomyRepository<Tag>>,
    pub posts: Arc<dyn PostRepository>,
    /// Reported by the health endpoint.
    pub storage: &'static str,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let db = InMemoryDatabase::new();
        Self {
            users: Arc::new(db.users()),
            categories: Arc::new(db.categories()),
            tags: Arc::new(db.tags()),
            posts: Arc::new(db.posts()),
            storage: "memory",
        }
    }

    #[cfg(feature = "postgres")]
    pub fn postgres(connections: &blog_infra::DatabaseConnections) -> Self {
        use blog_infra::{
            PostgresCategoryRepository, PostgresPostRepository, PostgresTagRepository,
            PostgresUserRepository,
        };

        let db = &connections.main;
        Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            categories: Arc::new(PostgresCategoryRepository::new(db.clone())),
            tags: Arc::new(PostgresTagRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            storage: "postgres",
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub posts: PostService,
    pub categories: TaxonomyService<Category>,
    pub tags: TaxonomyService<Tag>,
    pub tokens: Arc<dyn TokenService>,
    pub default_page_size: u64,
    pub storage: &'static str,
}

impl AppState {
    /// Wires the services over `repos`.
    pub fn assemble(
        repos: Repositories,
        passwords: Arc<dyn PasswordService>,
        tokens: Arc<dyn TokenService>,
        anonymous_reads: bool,
        default_page_size: u64,
    ) -> Self {
        Self {
            accounts: AccountService::new(repos.users, passwords, Arc::clone(&tokens)),
            posts: PostService::new(
                repos.posts,
                Arc::clone(&repos.categories),
                Arc::clone(&repos.tags),
                anonymous_reads,
            ),
            categories: TaxonomyService::new(repos.categories, anonymous_reads),
            tags: TaxonomyService::new(repos.tags, anonymous_reads),
            tokens,
            default_page_size,
            storage: repos.storage,
        }
    }

    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Result<Self, StartupError> {
        let repos = Self::repositories(config).await?;
        let state = Self::assemble(
            repos,
            Arc::new(Argon2PasswordService::new()),
            Arc::new(JwtTokenService::new(config.jwt.clone())),
            config.anonymous_reads,
            config.default_page_size,
        );

        if let Some(admin) = &config.admin {
            if let Some(user) = state.accounts.ensure_superuser(admin.clone()).await? {
                tracing::info!(user_id = user.id, "superuser bootstrapped");
            }
        }

        tracing::info!(storage = state.storage, "Application state initialized");
        Ok(state)
    }

    #[cfg(feature = "postgres")]
    async fn repositories(config: &AppConfig) -> Result<Repositories, StartupError> {
        use blog_infra::DatabaseConnections;
        use migration::MigratorTrait;

        let Some(db_config) = &config.database else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Ok(Repositories::in_memory());
        };

        let connections = DatabaseConnections::init(db_config)
            .await
            .map_err(|e| StartupError::Database(e.to_string()))?;

        if config.auto_migrate {
            tracing::info!("Applying pending migrations");
            migration::Migrator::up(&connections.main, None)
                .await
                .map_err(|e| StartupError::Migration(e.to_string()))?;
        }

        Ok(Repositories::postgres(&connections))
    }

    #[cfg(not(feature = "postgres"))]
    async fn repositories(config: &AppConfig) -> Result<Repositories, StartupError> {
        if config.database.is_some() {
            tracing::warn!("DATABASE_URL ignored: built without the postgres feature");
        }
        Ok(Repositories::in_memory())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use blog_infra::JwtConfig;

    /// In-memory state with cheap password hashing.
    pub fn state(anonymous_reads: bool) -> AppState {
        let passwords = Argon2PasswordService::with_cost(1024, 1)
            .expect("valid argon2 parameters");
        AppState::assemble(
            Repositories::in_memory(),
            Arc::new(passwords),
            Arc::new(JwtTokenService::new(JwtConfig::default())),
            anonymous_reads,
            10,
        )
    }
}
