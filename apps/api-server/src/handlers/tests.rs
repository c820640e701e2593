//! End-to-end handler tests against the in-memory backend.

use actix_web::http::StatusCode;
use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::{App, test};
use chrono::{Days, Utc};
use serde_json::{Value, json};

use super::configure_app;
use crate::state::test_support;

macro_rules! app {
    ($anonymous_reads:expr) => {
        test::init_service(
            App::new()
                .wrap(NormalizePath::new(TrailingSlash::Always))
                .configure(configure_app(test_support::state($anonymous_reads))),
        )
        .await
    };
}

macro_rules! call {
    ($app:expr, $req:expr) => {
        test::call_service(&$app, $req.to_request()).await
    };
}

/// Signs `name` up, logs in and returns the `Authorization` header value.
macro_rules! login {
    ($app:expr, $name:expr) => {{
        let email = format!("{}@example.com", $name);
        let res = call!(
            $app,
            test::TestRequest::post().uri("/api/users/").set_json(json!({
                "email": email,
                "username": $name,
                "password": "password123"
            }))
        );
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = call!(
            $app,
            test::TestRequest::post()
                .uri("/api/token/login/")
                .set_json(json!({"username": email, "password": "password123"}))
        );
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["token_type"], "Bearer");
        format!("Bearer {}", body["token"].as_str().unwrap())
    }};
}

/// POSTs `body` to `uri` as `auth` and returns the created resource.
macro_rules! create {
    ($app:expr, $auth:expr, $uri:expr, $body:expr) => {{
        let res = call!(
            $app,
            test::TestRequest::post()
                .uri($uri)
                .insert_header(("Authorization", $auth.clone()))
                .set_json($body)
        );
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(res).await;
        body
    }};
}

#[actix_rt::test]
async fn health_reports_storage() {
    let app = app!(true);

    let res = call!(app, test::TestRequest::get().uri("/health"));
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[actix_rt::test]
async fn author_only_edit_scenario() {
    let app = app!(true);
    let alice = login!(app, "alice");
    let bob = login!(app, "bob");

    let tech = create!(app, alice, "/categories/", json!({"name": "Tech"}));
    let ai = create!(app, alice, "/tags/", json!({"name": "AI"}));
    let post = create!(
        app,
        alice,
        "/posts/",
        json!({
            "title": "Hi",
            "content": "First post",
            "category_id": tech["id"],
            "tag_ids": [ai["id"]]
        })
    );
    assert_eq!(post["author"]["username"], "alice");
    assert_eq!(post["category"]["name"], "Tech");
    assert_eq!(post["tags"][0]["name"], "AI");

    let uri = format!("/posts/{}/", post["id"]);
    let res = call!(
        app,
        test::TestRequest::patch()
            .uri(&uri)
            .insert_header(("Authorization", bob.clone()))
            .set_json(json!({"title": "Hijacked"}))
    );
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["detail"], "You do not have permission to edit this post.");

    let res = call!(
        app,
        test::TestRequest::patch()
            .uri(&uri)
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"title": "Hello"}))
    );
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["title"], "Hello");
    assert_eq!(body["tags"][0]["name"], "AI");
}

#[actix_rt::test]
async fn non_author_cannot_delete() {
    let app = app!(true);
    let alice = login!(app, "alice");
    let bob = login!(app, "bob");
    let post = create!(app, alice, "/posts/", json!({"title": "Hi", "content": "x"}));
    let uri = format!("/posts/{}/", post["id"]);

    let res = call!(
        app,
        test::TestRequest::delete()
            .uri(&uri)
            .insert_header(("Authorization", bob.clone()))
    );
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = call!(
        app,
        test::TestRequest::delete()
            .uri(&uri)
            .insert_header(("Authorization", alice.clone()))
    );
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = call!(app, test::TestRequest::get().uri(&uri));
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn posts_by_unknown_author_is_not_found() {
    let app = app!(true);

    let res = call!(app, test::TestRequest::get().uri("/posts/author/9999/"));
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["detail"], "No posts found for this author.");
}

#[actix_rt::test]
async fn posts_by_author_lists_their_posts() {
    let app = app!(true);
    let alice = login!(app, "alice");
    let post = create!(app, alice, "/posts/", json!({"title": "Hi", "content": "x"}));

    let uri = format!("/posts/author/{}/", post["author"]["id"]);
    let res = call!(app, test::TestRequest::get().uri(&uri));
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[actix_rt::test]
async fn author_in_body_is_ignored() {
    let app = app!(true);
    let alice = login!(app, "alice");

    let res = call!(
        app,
        test::TestRequest::get()
            .uri("/api/users/me/")
            .insert_header(("Authorization", alice.clone()))
    );
    let me: Value = test::read_body_json(res).await;

    let post = create!(
        app,
        alice,
        "/posts/",
        json!({"title": "Hi", "content": "x", "author": 999})
    );
    assert_eq!(post["author"]["id"], me["id"]);
}

#[actix_rt::test]
async fn anonymous_callers_read_but_do_not_write() {
    let app = app!(true);
    let alice = login!(app, "alice");
    create!(app, alice, "/posts/", json!({"title": "Hi", "content": "x"}));

    let res = call!(app, test::TestRequest::get().uri("/posts"));
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Hi");

    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/posts/")
            .set_json(json!({"title": "Anon", "content": "x"}))
    );
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn anonymous_reads_can_be_disabled() {
    let app = app!(false);

    let res = call!(app, test::TestRequest::get().uri("/posts/"));
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let alice = login!(app, "alice");
    let res = call!(
        app,
        test::TestRequest::get()
            .uri("/posts/")
            .insert_header(("Authorization", alice.clone()))
    );
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn omitted_tag_ids_keep_tags_and_empty_list_clears() {
    let app = app!(true);
    let alice = login!(app, "alice");
    let ai = create!(app, alice, "/tags/", json!({"name": "AI"}));
    let post = create!(
        app,
        alice,
        "/posts/",
        json!({"title": "Hi", "content": "x", "tag_ids": [ai["id"]]})
    );
    let uri = format!("/posts/{}/", post["id"]);

    let res = call!(
        app,
        test::TestRequest::patch()
            .uri(&uri)
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"content": "edited"}))
    );
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["tags"].as_array().unwrap().len(), 1);

    let res = call!(
        app,
        test::TestRequest::patch()
            .uri(&uri)
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"tag_ids": []}))
    );
    let body: Value = test::read_body_json(res).await;
    assert!(body["tags"].as_array().unwrap().is_empty());
    assert_eq!(body["content"], "edited");
}

#[actix_rt::test]
async fn put_requires_title_and_content() {
    let app = app!(true);
    let alice = login!(app, "alice");
    let post = create!(app, alice, "/posts/", json!({"title": "Hi", "content": "x"}));

    let res = call!(
        app,
        test::TestRequest::put()
            .uri(&format!("/posts/{}/", post["id"]))
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"title": "Only title"}))
    );
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["errors"]["content"][0], "This field is required.");
}

#[actix_rt::test]
async fn unknown_tag_is_rejected_and_nothing_stored() {
    let app = app!(true);
    let alice = login!(app, "alice");

    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/posts/")
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"title": "Hi", "content": "x", "tag_ids": [77]}))
    );
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(
        body["errors"]["tag_ids"][0],
        "Invalid pk \"77\" - object does not exist."
    );

    let res = call!(app, test::TestRequest::get().uri("/posts/"));
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["count"], 0);
}

#[actix_rt::test]
async fn duplicate_category_name_is_a_field_error() {
    let app = app!(true);
    let alice = login!(app, "alice");
    create!(app, alice, "/categories/", json!({"name": "Tech"}));

    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/categories/")
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"name": "Tech"}))
    );
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(
        body["errors"]["name"][0],
        "category with this name already exists."
    );
}

#[actix_rt::test]
async fn search_filters_and_ordering_compose() {
    let app = app!(true);
    let alice = login!(app, "alice");
    let bob = login!(app, "bob");
    let rust = create!(app, alice, "/tags/", json!({"name": "Rust"}));
    create!(
        app,
        alice,
        "/posts/",
        json!({"title": "Borrowing", "content": "lifetimes", "tag_ids": [rust["id"]]})
    );
    create!(app, bob, "/posts/", json!({"title": "Async", "content": "futures"}));

    let search = |q: &str| format!("/posts/?search={q}&ordering=title");
    let res = call!(app, test::TestRequest::get().uri(&search("RUST")));
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Borrowing");

    let res = call!(app, test::TestRequest::get().uri(&search("bob")));
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Async");

    let res = call!(app, test::TestRequest::get().uri("/posts/?ordering=title"));
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["results"][0]["title"], "Async");
    assert_eq!(body["results"][1]["title"], "Borrowing");

    let res = call!(
        app,
        test::TestRequest::get().uri(&format!("/posts/?tags={}", rust["id"]))
    );
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["count"], 1);
}

#[actix_rt::test]
async fn date_range_is_inclusive_by_day() {
    let app = app!(true);
    let alice = login!(app, "alice");
    create!(app, alice, "/posts/", json!({"title": "Hi", "content": "x"}));

    let today = Utc::now().date_naive();
    let yesterday = today.checked_sub_days(Days::new(1)).unwrap();

    let res = call!(
        app,
        test::TestRequest::get().uri(&format!("/posts/?start_date={today}&end_date={today}"))
    );
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["count"], 1);

    let res = call!(
        app,
        test::TestRequest::get().uri(&format!("/posts/?end_date={yesterday}"))
    );
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["count"], 0);

    let res = call!(app, test::TestRequest::get().uri("/posts/?start_date=yesterday"));
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert!(body["errors"]["start_date"].is_array());
}

#[actix_rt::test]
async fn pagination_wraps_results() {
    let app = app!(true);
    let alice = login!(app, "alice");
    for title in ["a", "b", "c"] {
        create!(app, alice, "/posts/", json!({"title": title, "content": "x"}));
    }

    let res = call!(
        app,
        test::TestRequest::get().uri("/posts/?ordering=title&page=2&page_size=2")
    );
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["page"], 2);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["title"], "c");
}

#[actix_rt::test]
async fn wrong_password_is_unauthorized() {
    let app = app!(true);
    login!(app, "alice");

    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/api/token/login/")
            .set_json(json!({"email": "alice@example.com", "password": "not-it-at-all"}))
    );
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn profile_is_attached_to_me() {
    let app = app!(true);
    let alice = login!(app, "alice");

    let res = call!(
        app,
        test::TestRequest::put()
            .uri("/api/users/me/profile/")
            .insert_header(("Authorization", alice.clone()))
            .set_json(json!({"pic": "https://example.com/me.png", "country": "NL"}))
    );
    assert_eq!(res.status(), StatusCode::OK);

    let res = call!(
        app,
        test::TestRequest::get()
            .uri("/api/users/me/")
            .insert_header(("Authorization", alice.clone()))
    );
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["profile"]["country"], "NL");

    let res = call!(app, test::TestRequest::get().uri("/api/users/me/"));
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn malformed_json_is_a_problem_document() {
    let app = app!(true);
    let alice = login!(app, "alice");

    let res = call!(
        app,
        test::TestRequest::post()
            .uri("/posts/")
            .insert_header(("Authorization", alice.clone()))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
    );
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["title"], "Bad Request");
}

#[actix_rt::test]
async fn repeated_tags_keys_match_any() {
    let app = app!(true);
    let alice = login!(app, "alice");
    let rust = create!(app, alice, "/tags/", json!({"name": "Rust"}));
    let ai = create!(app, alice, "/tags/", json!({"name": "AI"}));
    create!(app, alice, "/posts/", json!({"title": "a", "content": "x", "tag_ids": [rust["id"]]}));
    create!(app, alice, "/posts/", json!({"title": "b", "content": "x", "tag_ids": [ai["id"]]}));
    create!(app, alice, "/posts/", json!({"title": "c", "content": "x"}));

    let res = call!(
        app,
        test::TestRequest::get().uri(&format!("/posts/?tags={}&tags={}", rust["id"], ai["id"]))
    );
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["count"], 2);
}

#[actix_rt::test]
async fn huge_page_number_is_an_empty_page() {
    let app = app!(true);
    let alice = login!(app, "alice");
    create!(app, alice, "/posts/", json!({"title": "Hi", "content": "x"}));

    let res = call!(
        app,
        test::TestRequest::get().uri("/posts/?page=18446744073709551615")
    );
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["count"], 1);
    assert!(body["results"].as_array().unwrap().is_empty());

    let res = call!(
        app,
        test::TestRequest::get().uri("/categories/?page=18446744073709551615")
    );
    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn anonymous_update_and_delete_are_unauthorized() {
    let app = app!(true);
    let alice = login!(app, "alice");
    let post = create!(app, alice, "/posts/", json!({"title": "Hi", "content": "x"}));
    let tech = create!(app, alice, "/categories/", json!({"name": "Tech"}));
    let post_uri = format!("/posts/{}/", post["id"]);
    let category_uri = format!("/categories/{}/", tech["id"]);

    let res = call!(
        app,
        test::TestRequest::patch()
            .uri(&post_uri)
            .set_json(json!({"title": "Anon"}))
    );
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = call!(app, test::TestRequest::delete().uri(&post_uri));
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = call!(app, test::TestRequest::delete().uri(&category_uri));
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = call!(
        app,
        test::TestRequest::put()
            .uri("/posts/9999/")
            .set_json(json!({"title": "Anon", "content": "x"}))
    );
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = call!(app, test::TestRequest::get().uri(&post_uri));
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["title"], "Hi");
}
