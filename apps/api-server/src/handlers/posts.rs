//! Post endpoints.

use actix_web::{HttpRequest, HttpResponse, web};

use blog_core::DomainError;
use blog_core::domain::{PageRequest, PostFilter, PostOrdering, WriteMode};
use blog_shared::PageResponse;
use blog_shared::dto::{PostListQuery, PostRequest, PostResponse};

use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /posts/
pub async fn list(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    req: HttpRequest,
) -> AppResult<HttpResponse> {
    let query = PostListQuery::from_query(req.query_string()).map_err(DomainError::Validation)?;
    let filter = PostFilter::try_from(query.filter())?;
    let ordering = PostOrdering::parse(query.ordering.as_deref());
    let page = PageRequest::new(query.page, query.page_size, state.default_page_size);

    let posts = state
        .posts
        .list(&caller.principal(), &filter, &ordering, page)
        .await?;
    Ok(HttpResponse::Ok().json(PageResponse::<PostResponse>::from(posts)))
}

/// POST /posts/
pub async fn create(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let post = state
        .posts
        .create(&caller.principal(), body.into_inner().into())
        .await?;
    Ok(HttpResponse::Created().json(PostResponse::from(post)))
}

/// GET /posts/{id}/
pub async fn retrieve(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let post = state
        .posts
        .retrieve(&caller.principal(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(PostResponse::from(post)))
}

async fn write(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    id: i32,
    body: PostRequest,
    mode: WriteMode,
) -> AppResult<HttpResponse> {
    let post = state
        .posts
        .update(&caller.principal(), id, body.into(), mode)
        .await?;
    Ok(HttpResponse::Ok().json(PostResponse::from(post)))
}

/// PUT /posts/{id}/
pub async fn replace(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    path: web::Path<i32>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    write(state, caller, path.into_inner(), body.into_inner(), WriteMode::Replace).await
}

/// PATCH /posts/{id}/
pub async fn patch(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    path: web::Path<i32>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    write(state, caller, path.into_inner(), body.into_inner(), WriteMode::Partial).await
}

/// DELETE /posts/{id}/
pub async fn delete(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    state
        .posts
        .delete(&caller.principal(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /posts/author/{author_id}/
pub async fn by_author(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let posts = state
        .posts
        .by_author(&caller.principal(), path.into_inner())
        .await?;
    let body: Vec<PostResponse> = posts.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}
