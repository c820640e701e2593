//! # Blog Shared
//!
//! Wire types shared by the server and API clients: request and response
//! bodies plus the problem-details error format.

pub mod dto;
pub mod response;

pub use response::{ErrorResponse, PageResponse};
