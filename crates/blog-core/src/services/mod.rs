//! Domain services. Each one bundles the operations behind one resource's
//! HTTP endpoints: validation, authorization and repository calls.

mod accounts;
mod posts;
mod taxonomy;

pub use accounts::{AccountService, IssuedToken, Registration};
pub use posts::{NO_POSTS_FOR_AUTHOR, PostService};
pub use taxonomy::TaxonomyService;

use crate::error::{DomainError, RepoError};

/// Maps a unique-index violation raised on write to [`DomainError::Duplicate`].
pub(crate) fn duplicate(err: RepoError) -> DomainError {
    match err {
        RepoError::Constraint(msg) => DomainError::Duplicate(msg),
        other => other.into(),
    }
}
