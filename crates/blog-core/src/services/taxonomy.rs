//! Category and tag operations.

use std::sync::Arc;

use super::duplicate;
use crate::domain::{Page, PageRequest, Taxonomy, WriteMode};
use crate::error::{DomainError, FieldError, RepoError};
use crate::policy::{self, Principal, WriteAction};
use crate::ports::TaxonomyRepository;
use crate::validate::{self, NAME_MAX};

/// CRUD over one kind of named label, generic over categories and tags.
pub struct TaxonomyService<T: Taxonomy> {
    repo: Arc<dyn TaxonomyRepository<T>>,
    anonymous_reads: bool,
}

impl<T: Taxonomy> Clone for TaxonomyService<T> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            anonymous_reads: self.anonymous_reads,
        }
    }
}

impl<T: Taxonomy> TaxonomyService<T> {
    pub fn new(repo: Arc<dyn TaxonomyRepository<T>>, anonymous_reads: bool) -> Self {
        Self {
            repo,
            anonymous_reads,
        }
    }

    pub async fn list(
        &self,
        principal: &Principal,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<T>, DomainError> {
        policy::ensure_can_read(principal, self.anonymous_reads)?;
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.repo.list(search, page).await?)
    }

    pub async fn retrieve(&self, principal: &Principal, id: i32) -> Result<T, DomainError> {
        policy::ensure_can_read(principal, self.anonymous_reads)?;
        self.load(id).await
    }

    pub async fn create(&self, principal: &Principal, name: Option<String>) -> Result<T, DomainError> {
        let author_id = principal.user_id().ok_or(DomainError::Unauthorized)?;
        let name = validate::required_text("name", name.as_deref(), Some(NAME_MAX))
            .map_err(|e| DomainError::Validation(vec![e]))?;
        self.ensure_unique(&name, None).await?;

        let saved = self.repo.save(T::new(name, author_id)).await.map_err(duplicate)?;
        tracing::info!(kind = T::KIND, id = saved.id(), author_id, "created");
        Ok(saved)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: i32,
        name: Option<String>,
        mode: WriteMode,
    ) -> Result<T, DomainError> {
        principal.user_id().ok_or(DomainError::Unauthorized)?;
        let mut existing = self.load(id).await?;
        policy::ensure_can_write(principal, &existing, T::KIND, WriteAction::Edit)?;

        let name = match name {
            Some(name) => validate::text("name", &name, Some(NAME_MAX)),
            None if mode.requires_all() => Err(FieldError::required("name")),
            None => return Ok(existing),
        }
        .map_err(|e| DomainError::Validation(vec![e]))?;
        self.ensure_unique(&name, Some(id)).await?;

        existing.rename(name);
        let saved = self.repo.save(existing).await.map_err(duplicate)?;
        tracing::info!(kind = T::KIND, id, "updated");
        Ok(saved)
    }

    pub async fn delete(&self, principal: &Principal, id: i32) -> Result<(), DomainError> {
        principal.user_id().ok_or(DomainError::Unauthorized)?;
        let existing = self.load(id).await?;
        policy::ensure_can_write(principal, &existing, T::KIND, WriteAction::Delete)?;

        self.repo.delete(id).await.map_err(|e| match e {
            RepoError::NotFound => not_found::<T>(id),
            other => other.into(),
        })?;
        tracing::info!(kind = T::KIND, id, "deleted");
        Ok(())
    }

    async fn load(&self, id: i32) -> Result<T, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<T>(id))
    }

    async fn ensure_unique(&self, name: &str, current: Option<i32>) -> Result<(), DomainError> {
        match self.repo.find_by_name(name).await? {
            Some(other) if Some(other.id()) != current => Err(DomainError::field(
                "name",
                format!("{} with this name already exists.", T::KIND),
            )),
            _ => Ok(()),
        }
    }
}

fn not_found<T: Taxonomy>(id: i32) -> DomainError {
    DomainError::NotFound {
        entity_type: T::KIND,
        id,
    }
}
