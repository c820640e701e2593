//! Post filtering, free-text search and ordering.
//!
//! The same [`PostFilter`] drives the SQL query builder and the in-memory
//! backend, so both agree on bounds and matching rules.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::post::PostDetails;
use crate::error::{DomainError, FieldError};

/// Structured filter plus free-text search over posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    /// Exact category name.
    pub category: Option<String>,
    /// Posts carrying any of these tag ids.
    pub tags: Vec<i32>,
    pub author: Option<i32>,
    /// Posts created on this UTC day.
    pub created_on: Option<NaiveDate>,
    /// Inclusive lower day bound.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper day bound.
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring over title, content, tag names and author
    /// username.
    pub search: Option<String>,
}

impl PostFilter {
    pub fn by_author(author_id: i32) -> Self {
        Self {
            author: Some(author_id),
            ..Self::default()
        }
    }

    pub fn by_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            start_date: start,
            end_date: end,
            ..Self::default()
        }
    }

    pub fn by_text(query: impl Into<String>) -> Self {
        Self {
            search: Some(query.into()),
            ..Self::default()
        }
    }

    /// Normalized search needle, `None` when absent or blank.
    pub fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    /// Inclusive lower bound on `created_at`.
    pub fn created_from(&self) -> Option<DateTime<Utc>> {
        [self.start_date, self.created_on]
            .into_iter()
            .flatten()
            .max()
            .map(start_of_day)
    }

    /// Exclusive upper bound on `created_at`.
    pub fn created_before(&self) -> Option<DateTime<Utc>> {
        [self.end_date, self.created_on]
            .into_iter()
            .flatten()
            .min()
            .and_then(|d| d.succ_opt())
            .map(start_of_day)
    }

    /// Whether `post` passes every structured predicate and the search.
    pub fn matches(&self, post: &PostDetails) -> bool {
        if let Some(name) = &self.category {
            if post.category.as_ref().map(|c| c.name.as_str()) != Some(name.as_str()) {
                return false;
            }
        }
        if !self.tags.is_empty() && !post.tags.iter().any(|t| self.tags.contains(&t.id)) {
            return false;
        }
        if let Some(author) = self.author {
            if post.post.author_id != author {
                return false;
            }
        }
        if let Some(from) = self.created_from() {
            if post.post.created_at < from {
                return false;
            }
        }
        if let Some(before) = self.created_before() {
            if post.post.created_at >= before {
                return false;
            }
        }
        match self.search_needle() {
            Some(needle) => matches_text(post, &needle),
            None => true,
        }
    }
}

fn matches_text(post: &PostDetails, needle: &str) -> bool {
    let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
    contains(&post.post.title)
        || contains(&post.post.content)
        || post.tags.iter().any(|t| contains(&t.name))
        || contains(&post.author.username)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Query-string form of a post filter, before parsing.
#[derive(Debug, Clone, Default)]
pub struct RawPostFilter {
    pub category: Option<String>,
    pub tags: Option<String>,
    pub author: Option<String>,
    pub created_at: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
}

impl TryFrom<RawPostFilter> for PostFilter {
    type Error = DomainError;

    fn try_from(raw: RawPostFilter) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();

        let tags = keep(
            &mut errors,
            parse_opt(raw.tags.as_deref(), |v| parse_id_list("tags", v)),
        )
        .unwrap_or_default();
        let author = keep(
            &mut errors,
            parse_opt(raw.author.as_deref(), |v| parse_id("author", v)),
        );
        let created_on = keep(
            &mut errors,
            parse_opt(raw.created_at.as_deref(), |v| parse_date("created_at", v)),
        );
        let start_date = keep(
            &mut errors,
            parse_opt(raw.start_date.as_deref(), |v| parse_date("start_date", v)),
        );
        let end_date = keep(
            &mut errors,
            parse_opt(raw.end_date.as_deref(), |v| parse_date("end_date", v)),
        );

        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        Ok(Self {
            category: raw.category.filter(|c| !c.is_empty()),
            tags,
            author,
            created_on,
            start_date,
            end_date,
            search: raw.search,
        })
    }
}

fn keep<T>(errors: &mut Vec<FieldError>, result: Result<Option<T>, FieldError>) -> Option<T> {
    result.unwrap_or_else(|e| {
        errors.push(e);
        None
    })
}

fn parse_opt<T>(
    value: Option<&str>,
    parse: impl FnOnce(&str) -> Result<T, FieldError>,
) -> Result<Option<T>, FieldError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse(v).map(Some),
        None => Ok(None),
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| FieldError::new(field, "Enter a valid date (YYYY-MM-DD)."))
}

fn parse_id(field: &str, value: &str) -> Result<i32, FieldError> {
    value
        .parse()
        .map_err(|_| FieldError::new(field, format!("\"{value}\" is not a valid id.")))
}

fn parse_id_list(field: &str, value: &str) -> Result<Vec<i32>, FieldError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| parse_id(field, v))
        .collect()
}

/// Sortable post fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    CreatedAt,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub field: OrderField,
    pub descending: bool,
}

/// Ordering applied to the filtered set. Ties fall back to the id, in the
/// direction of the first key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostOrdering {
    keys: Vec<OrderKey>,
}

impl Default for PostOrdering {
    fn default() -> Self {
        Self {
            keys: vec![OrderKey {
                field: OrderField::CreatedAt,
                descending: true,
            }],
        }
    }
}

impl PostOrdering {
    /// Parses `created_at,-title` style lists. Unknown fields are ignored; an
    /// empty result falls back to newest first.
    pub fn parse(value: Option<&str>) -> Self {
        let keys: Vec<OrderKey> = value
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter_map(|term| {
                let (descending, name) = match term.strip_prefix('-') {
                    Some(name) => (true, name),
                    None => (false, term),
                };
                let field = match name {
                    "created_at" => OrderField::CreatedAt,
                    "title" => OrderField::Title,
                    _ => return None,
                };
                Some(OrderKey { field, descending })
            })
            .collect();

        if keys.is_empty() {
            Self::default()
        } else {
            Self { keys }
        }
    }

    pub fn keys(&self) -> &[OrderKey] {
        &self.keys
    }

    /// Whether the id tie-breaker sorts descending.
    pub fn id_descending(&self) -> bool {
        self.keys.first().is_some_and(|k| k.descending)
    }

    pub fn compare(&self, a: &PostDetails, b: &PostDetails) -> Ordering {
        for key in &self.keys {
            let ord = match key.field {
                OrderField::CreatedAt => a.post.created_at.cmp(&b.post.created_at),
                OrderField::Title => a.post.title.cmp(&b.post.title),
            };
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        let ord = a.post.id.cmp(&b.post.id);
        if self.id_descending() { ord.reverse() } else { ord }
    }

    pub fn sort(&self, posts: &mut [PostDetails]) {
        posts.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Post, Tag, UserSummary};
    use chrono::TimeZone;
    use rstest::rstest;

    fn post(id: i32, title: &str, created: DateTime<Utc>) -> PostDetails {
        PostDetails {
            post: Post {
                id,
                author_id: 1,
                category_id: Some(3),
                title: title.to_string(),
                content: "Body text".to_string(),
                created_at: created,
                updated_at: created,
            },
            author: UserSummary {
                id: 1,
                username: "writer".to_string(),
                email: "writer@example.com".to_string(),
            },
            category: Some(Category {
                id: 3,
                name: "Tech".to_string(),
                author_id: 1,
            }),
            tags: vec![Tag {
                id: 9,
                name: "Rust".to_string(),
                author_id: 1,
            }],
        }
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, h, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[rstest]
    #[case(at(10, 0), true)]
    #[case(at(12, 23), true)]
    #[case(at(9, 23), false)]
    #[case(at(13, 0), false)]
    fn date_range_is_inclusive_by_day(#[case] created: DateTime<Utc>, #[case] expected: bool) {
        let filter = PostFilter::by_date_range(Some(day(10)), Some(day(12)));
        assert_eq!(filter.matches(&post(1, "x", created)), expected);
    }

    #[test]
    fn bounds_are_independent() {
        let only_start = PostFilter::by_date_range(Some(day(10)), None);
        assert!(only_start.matches(&post(1, "x", at(30, 0))));
        assert!(only_start.created_before().is_none());

        let only_end = PostFilter::by_date_range(None, Some(day(10)));
        assert!(only_end.matches(&post(1, "x", at(1, 0))));
        assert!(!only_end.matches(&post(1, "x", at(11, 0))));
    }

    #[rstest]
    #[case("rust")]
    #[case("WRITER")]
    #[case("body")]
    #[case("hello")]
    fn search_covers_every_field(#[case] q: &str) {
        let filter = PostFilter::by_text(q);
        assert!(filter.matches(&post(1, "Hello world", at(1, 0))));
    }

    #[test]
    fn search_misses_unrelated_text() {
        assert!(!PostFilter::by_text("python").matches(&post(1, "Hello", at(1, 0))));
        assert!(PostFilter::by_text("   ").matches(&post(1, "Hello", at(1, 0))));
    }

    #[test]
    fn category_and_tags_narrow() {
        let p = post(1, "x", at(1, 0));
        let mut filter = PostFilter {
            category: Some("Tech".into()),
            ..PostFilter::default()
        };
        assert!(filter.matches(&p));
        filter.category = Some("tech".into());
        assert!(!filter.matches(&p));

        let filter = PostFilter {
            tags: vec![2, 9],
            ..PostFilter::default()
        };
        assert!(filter.matches(&p));
        let filter = PostFilter {
            tags: vec![2],
            ..PostFilter::default()
        };
        assert!(!filter.matches(&p));
    }

    #[test]
    fn raw_filter_collects_field_errors() {
        let raw = RawPostFilter {
            tags: Some("1,x".into()),
            start_date: Some("05/10/2024".into()),
            ..RawPostFilter::default()
        };
        let err = PostFilter::try_from(raw).unwrap_err();
        match err {
            DomainError::Validation(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["tags", "start_date"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn raw_filter_parses_values() {
        let raw = RawPostFilter {
            tags: Some("1, 2".into()),
            author: Some("5".into()),
            end_date: Some("2024-05-12".into()),
            ..RawPostFilter::default()
        };
        let filter = PostFilter::try_from(raw).unwrap();
        assert_eq!(filter.tags, vec![1, 2]);
        assert_eq!(filter.author, Some(5));
        assert_eq!(filter.end_date, Some(day(12)));
    }

    #[test]
    fn ordering_parses_and_sorts() {
        let mut posts = vec![
            post(1, "b", at(1, 0)),
            post(2, "a", at(2, 0)),
            post(3, "c", at(2, 0)),
        ];

        PostOrdering::parse(Some("title")).sort(&mut posts);
        assert_eq!(posts.iter().map(|p| p.id()).collect::<Vec<_>>(), vec![2, 1, 3]);

        PostOrdering::parse(Some("-created_at,-title")).sort(&mut posts);
        assert_eq!(posts.iter().map(|p| p.id()).collect::<Vec<_>>(), vec![3, 2, 1]);

        PostOrdering::parse(None).sort(&mut posts);
        assert_eq!(posts.iter().map(|p| p.id()).collect::<Vec<_>>(), vec![3, 2, 1]);
    }

    #[test]
    fn unknown_ordering_falls_back_to_default() {
        assert_eq!(PostOrdering::parse(Some("author,,")), PostOrdering::default());
    }
}
