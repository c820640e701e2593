//! # Blog Core
//!
//! The domain layer of the blog API.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! entities, the authorization policy, post filtering, repository ports and the
//! services the HTTP handlers delegate to.

pub mod domain;
pub mod error;
pub mod policy;
pub mod ports;
pub mod services;
pub mod validate;

pub use error::{DomainError, FieldError, RepoError};
pub use policy::Principal;
