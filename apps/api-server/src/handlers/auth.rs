//! Token login, signup and the caller's own account.

use actix_web::{HttpResponse, web};

use blog_core::services::Registration;
use blog_shared::dto::{
    AuthResponse, LoginRequest, ProfileRequest, ProfileResponse, RegisterUserRequest,
    UserResponse,
};

use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/token/login/
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let issued = state.accounts.login(&req.email, &req.password).await?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in.max(0) as u64,
    }))
}

/// POST /api/users/
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let user = state
        .accounts
        .create_user(Registration {
            email: req.email,
            username: req.username,
            password: req.password,
        })
        .await?;

    Ok(HttpResponse::Created().json(UserResponse::new(user, None)))
}

/// GET /api/users/me/
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    tracing::debug!(user_id = identity.user_id, roles = ?identity.roles, "account lookup");
    let (user, profile) = state.accounts.me(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::new(user, profile)))
}

/// PUT /api/users/me/profile/
pub async fn save_profile(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<ProfileRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let profile = state
        .accounts
        .save_profile(identity.user_id, req.pic, req.country)
        .await?;

    Ok(HttpResponse::Ok().json(ProfileResponse::from(profile)))
}
