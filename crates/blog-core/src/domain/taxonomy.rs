//! Categories and tags: named labels owned by the user who created them.

use serde::{Deserialize, Serialize};

use crate::policy::Authored;

/// Shared behaviour of the named entities posts are classified with.
pub trait Taxonomy: Authored + Clone + Send + Sync + 'static {
    /// Lower-case singular name used in messages ("category", "tag").
    const KIND: &'static str;

    /// Create an unsaved entity.
    fn new(name: String, author_id: i32) -> Self;

    fn id(&self) -> i32;

    fn name(&self) -> &str;

    fn rename(&mut self, name: String);
}

/// Post category. Each post references at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub author_id: i32,
}

/// Post tag. Posts carry any number of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub author_id: i32,
}

macro_rules! impl_taxonomy {
    ($ty:ty, $kind:literal) => {
        impl Authored for $ty {
            fn author_id(&self) -> i32 {
                self.author_id
            }
        }

        impl Taxonomy for $ty {
            const KIND: &'static str = $kind;

            fn new(name: String, author_id: i32) -> Self {
                Self {
                    id: 0,
                    name,
                    author_id,
                }
            }

            fn id(&self) -> i32 {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn rename(&mut self, name: String) {
                self.name = name;
            }
        }
    };
}

impl_taxonomy!(Category, "category");
impl_taxonomy!(Tag, "tag");
