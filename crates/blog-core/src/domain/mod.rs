//! Domain entities - the core business objects.

mod page;
mod post;
mod query;
mod taxonomy;
mod user;

pub use page::{MAX_PAGE_SIZE, Page, PageRequest};
pub use post::{NewPost, Post, PostChanges, PostDetails, PostInput, WriteMode};
pub use query::{OrderField, OrderKey, PostFilter, PostOrdering, RawPostFilter};
pub use taxonomy::{Category, Tag, Taxonomy};
pub use user::{Profile, User, UserSummary, normalize_email};
