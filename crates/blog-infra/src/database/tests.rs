use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction, Value};

use blog_core::domain::{
    Category, NewPost, PageRequest, PostChanges, PostFilter, PostOrdering, Tag,
};
use blog_core::error::RepoError;
use blog_core::ports::{BaseRepository, PostRepository, TaxonomyRepository, UserRepository};

use crate::database::entity::{category, post, post_tag, tag, user};
use crate::database::{
    PostgresCategoryRepository, PostgresPostRepository, PostgresTagRepository,
    PostgresUserRepository,
};

fn user_row(id: i32, username: &str) -> user::Model {
    let now = Utc::now();
    user::Model {
        id,
        email: format!("{username}@example.com"),
        username: username.to_owned(),
        password_hash: "hash".to_owned(),
        is_staff: false,
        is_superuser: false,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

fn post_row(id: i32, author_id: i32) -> post::Model {
    let now = Utc::now();
    post::Model {
        id,
        author_id,
        category_id: None,
        title: "Hi".to_owned(),
        content: "Body".to_owned(),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[tokio::test]
async fn test_find_category_by_id() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![category::Model {
            id: 3,
            name: "Tech".to_owned(),
            author_id: 1,
        }]])
        .into_connection();

    let repo = PostgresCategoryRepository::new(db);
    let result: Option<Category> = repo.find_by_id(3).await.unwrap();

    let category = result.unwrap();
    assert_eq!(category.name, "Tech");
    assert_eq!(category.author_id, 1);
}

#[tokio::test]
async fn test_find_tags_by_empty_ids_skips_query() {
    // No prepared results: any query would fail.
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let repo = PostgresTagRepository::new(db);
    let tags: Vec<Tag> = TaxonomyRepository::<Tag>::find_by_ids(&repo, &[])
        .await
        .unwrap();

    assert!(tags.is_empty());
}

#[tokio::test]
async fn test_find_user_by_email() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![user_row(7, "alice")]])
        .into_connection();

    let repo = PostgresUserRepository::new(db);
    let user = repo
        .find_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(user.id, 7);
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn test_find_by_author_without_posts() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let posts = repo.find_by_author(9999).await.unwrap();

    assert!(posts.is_empty());
}

#[tokio::test]
async fn test_find_post_by_id_resolves_author() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![post_row(1, 7)]])
        .append_query_results(vec![vec![user_row(7, "alice")]])
        .append_query_results(vec![vec![(
            post_tag::Model {
                post_id: 1,
                tag_id: 4,
            },
            Some(tag::Model {
                id: 4,
                name: "AI".to_owned(),
                author_id: 7,
            }),
        )]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let details = repo.find_by_id(1).await.unwrap().unwrap();

    assert_eq!(details.author.username, "alice");
    assert!(details.category.is_none());
    assert_eq!(details.tag_ids(), vec![4]);
}

#[tokio::test]
async fn test_delete_missing_post() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let result = repo.delete(42).await;

    assert!(matches!(result, Err(RepoError::NotFound)));
}

fn exec(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

fn statements(log: &[Transaction]) -> Vec<String> {
    log.iter()
        .flat_map(|txn| txn.statements().iter().map(|stmt| stmt.sql.clone()))
        .collect()
}

#[tokio::test]
async fn test_create_post_writes_tags_in_one_transaction() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![post_row(10, 7)]])
        .append_query_results(vec![vec![user_row(7, "alice")]])
        .append_query_results(vec![vec![(
            post_tag::Model {
                post_id: 10,
                tag_id: 4,
            },
            Some(tag::Model {
                id: 4,
                name: "AI".to_owned(),
                author_id: 7,
            }),
        )]])
        .append_exec_results(vec![exec(0), exec(1)])
        .into_connection();

    let repo = PostgresPostRepository::new(db.clone());
    let details = repo
        .create(NewPost {
            author_id: 7,
            title: "Hi".to_owned(),
            content: "Body".to_owned(),
            category_id: None,
            tag_ids: vec![4],
        })
        .await
        .unwrap();
    assert_eq!(details.tag_ids(), vec![4]);

    let log = db.into_transaction_log();
    assert_eq!(log.len(), 1);
    let sql = statements(&log);
    assert_eq!(sql.len(), 7);
    assert_eq!(sql[0], "BEGIN");
    assert!(sql[1].starts_with(r#"INSERT INTO "posts""#));
    assert!(sql[2].starts_with(r#"DELETE FROM "post_tags""#));
    assert!(sql[3].starts_with(r#"INSERT INTO "post_tags""#));
    assert_eq!(sql[6], "COMMIT");
}

#[tokio::test]
async fn test_update_with_empty_tags_clears_links() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![post_row(1, 7)]])
        .append_query_results(vec![vec![post_row(1, 7)]])
        .append_query_results(vec![vec![user_row(7, "alice")]])
        .append_query_results(vec![Vec::<(post_tag::Model, Option<tag::Model>)>::new()])
        .append_exec_results(vec![exec(2)])
        .into_connection();

    let repo = PostgresPostRepository::new(db.clone());
    let details = repo
        .update(
            1,
            PostChanges {
                tag_ids: Some(vec![]),
                ..PostChanges::default()
            },
        )
        .await
        .unwrap();
    assert!(details.tags.is_empty());

    let sql = statements(&db.into_transaction_log());
    assert_eq!(sql.first().map(String::as_str), Some("BEGIN"));
    assert_eq!(sql.last().map(String::as_str), Some("COMMIT"));
    assert!(sql.iter().any(|s| s.starts_with(r#"DELETE FROM "post_tags""#)));
    assert!(!sql.iter().any(|s| s.starts_with(r#"INSERT INTO "post_tags""#)));
}

#[tokio::test]
async fn test_update_missing_post_rolls_back() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db.clone());
    let result = repo.update(5, PostChanges::default()).await;
    assert!(matches!(result, Err(RepoError::NotFound)));

    let sql = statements(&db.into_transaction_log());
    assert!(!sql.iter().any(|s| s == "COMMIT"));
}

#[tokio::test]
async fn test_search_escapes_like_wildcards() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db.clone());
    let posts = repo
        .find_all(
            &PostFilter::by_text(" 50%_OFF "),
            &PostOrdering::parse(Some("title,-created_at")),
        )
        .await
        .unwrap();
    assert!(posts.is_empty());

    let log = db.into_transaction_log();
    let stmt = &log[0].statements()[0];
    assert!(stmt.sql.contains("LIKE"));
    assert!(stmt.sql.contains("ESCAPE"));
    assert!(stmt.sql.contains(r#"LOWER("users"."username")"#));
    assert!(stmt.sql.contains(
        r#"ORDER BY "posts"."title" ASC, "posts"."created_at" DESC, "posts"."id" ASC"#
    ));
    let values = stmt.values.as_ref().unwrap();
    assert!(values.0.contains(&Value::from(r"%50\%\_off%")));
}

#[tokio::test]
async fn test_list_clamps_huge_page() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![BTreeMap::from([(
            "num_items",
            Value::from(1i64),
        )])]])
        .append_query_results(vec![Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);
    let page = repo
        .list(
            &PostFilter::default(),
            &PostOrdering::default(),
            PageRequest::new(Some(u64::MAX), Some(100), 10),
        )
        .await
        .unwrap();

    assert_eq!(page.total, 1);
    assert!(page.items.is_empty());
}
