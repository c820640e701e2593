//! SeaORM entities mirroring the migration schema.

pub mod category;
pub mod post;
pub mod post_tag;
pub mod profile;
pub mod tag;
pub mod user;
