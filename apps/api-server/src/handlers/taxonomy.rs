//! Category and tag endpoints. Both resources share one set of handlers,
//! instantiated per kind.

use actix_web::{HttpResponse, web};

use blog_core::domain::{Category, PageRequest, Tag, Taxonomy, WriteMode};
use blog_core::services::TaxonomyService;
use blog_shared::PageResponse;
use blog_shared::dto::{ListQuery, TaxonomyRequest, TaxonomyResponse};

use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// A label kind served over HTTP.
pub trait Resource: Taxonomy + Into<TaxonomyResponse> {
    fn service(state: &AppState) -> &TaxonomyService<Self>;
}

impl Resource for Category {
    fn service(state: &AppState) -> &TaxonomyService<Self> {
        &state.categories
    }
}

impl Resource for Tag {
    fn service(state: &AppState) -> &TaxonomyService<Self> {
        &state.tags
    }
}

fn render<T: Resource>(item: T) -> TaxonomyResponse {
    item.into()
}

/// Routes for one kind, mounted under `path`.
pub fn scope<T: Resource>(path: &str) -> actix_web::Scope {
    web::scope(path)
        .route("/", web::get().to(list::<T>))
        .route("/", web::post().to(create::<T>))
        .route("/{id}/", web::get().to(retrieve::<T>))
        .route("/{id}/", web::put().to(replace::<T>))
        .route("/{id}/", web::patch().to(patch::<T>))
        .route("/{id}/", web::delete().to(delete::<T>))
}

async fn list<T: Resource>(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    let page = PageRequest::new(query.page, query.page_size, state.default_page_size);
    let items = T::service(&state)
        .list(&caller.principal(), query.search.as_deref(), page)
        .await?;
    Ok(HttpResponse::Ok().json(PageResponse::<TaxonomyResponse>::from(items.map(render::<T>))))
}

async fn create<T: Resource>(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    body: web::Json<TaxonomyRequest>,
) -> AppResult<HttpResponse> {
    let item = T::service(&state)
        .create(&caller.principal(), body.into_inner().name)
        .await?;
    Ok(HttpResponse::Created().json(render(item)))
}

async fn retrieve<T: Resource>(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let item = T::service(&state)
        .retrieve(&caller.principal(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(render(item)))
}

async fn replace<T: Resource>(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    path: web::Path<i32>,
    body: web::Json<TaxonomyRequest>,
) -> AppResult<HttpResponse> {
    let item = T::service(&state)
        .update(
            &caller.principal(),
            path.into_inner(),
            body.into_inner().name,
            WriteMode::Replace,
        )
        .await?;
    Ok(HttpResponse::Ok().json(render(item)))
}

async fn patch<T: Resource>(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    path: web::Path<i32>,
    body: web::Json<TaxonomyRequest>,
) -> AppResult<HttpResponse> {
    let item = T::service(&state)
        .update(
            &caller.principal(),
            path.into_inner(),
            body.into_inner().name,
            WriteMode::Partial,
        )
        .await?;
    Ok(HttpResponse::Ok().json(render(item)))
}

async fn delete<T: Resource>(
    state: web::Data<AppState>,
    caller: OptionalIdentity,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    T::service(&state)
        .delete(&caller.principal(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
