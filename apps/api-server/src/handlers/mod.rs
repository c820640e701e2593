//! HTTP handlers and route configuration.

mod auth;
mod health;
mod posts;
mod taxonomy;

#[cfg(test)]
mod tests;

use actix_web::web;

use blog_core::domain::{Category, Tag};

use crate::middleware::error::{json_config, query_config};
use crate::state::AppState;

/// Shared state, extractor settings and routes, ready for `App::configure`.
pub fn configure_app(state: AppState) -> impl Fn(&mut web::ServiceConfig) + Clone {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(state.clone()))
            .app_data(json_config())
            .app_data(query_config());
        configure_routes(cfg);
    }
}

/// Configure all application routes. Paths end in `/`; the server
/// normalizes incoming paths to match.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health/", web::get().to(health::health_check))
        .service(
            web::scope("/api")
                .route("/token/login/", web::post().to(auth::login))
                .route("/users/", web::post().to(auth::register))
                .route("/users/me/", web::get().to(auth::me))
                .route("/users/me/profile/", web::put().to(auth::save_profile)),
        )
        .service(
            web::scope("/posts")
                .route("/", web::get().to(posts::list))
                .route("/", web::post().to(posts::create))
                .route("/author/{author_id}/", web::get().to(posts::by_author))
                .route("/{id}/", web::get().to(posts::retrieve))
                .route("/{id}/", web::put().to(posts::replace))
                .route("/{id}/", web::patch().to(posts::patch))
                .route("/{id}/", web::delete().to(posts::delete)),
        )
        .service(taxonomy::scope::<Category>("/categories"))
        .service(taxonomy::scope::<Tag>("/tags"));
}
