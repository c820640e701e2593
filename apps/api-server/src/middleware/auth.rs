//! Authentication extractors.

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use std::future::{Ready, ready};

use blog_core::Principal;
use blog_core::ports::{AuthError, TokenClaims};

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Accepted `Authorization` schemes. `Token` is kept for clients of the
/// classic token-auth flow.
const SCHEMES: [&str; 2] = ["Bearer ", "Token "];

/// Authenticated user identity extractor.
///
/// Use this in handlers to require authentication:
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, user {}!", identity.user_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i32,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn principal(&self) -> Principal {
        Principal::User(self.user_id)
    }
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            roles: claims.roles,
        }
    }
}

/// Decodes the credentials carried by `req`. `Ok(None)` when the request has
/// no `Authorization` header at all.
fn authenticate(req: &HttpRequest) -> Result<Option<Identity>, AppError> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        tracing::error!("AppState not found in app data");
        AppError::Internal("Server configuration error".to_string())
    })?;

    let raw = value
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;
    let token = SCHEMES
        .iter()
        .find_map(|scheme| raw.strip_prefix(scheme))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))?;

    let claims = state.tokens.validate_token(token)?;
    Ok(Some(claims.into()))
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).and_then(|identity| identity.ok_or(AuthError::MissingAuth.into())))
    }
}

/// Identity for endpoints open to anonymous callers. A missing header yields
/// `None`; a present but invalid one is still rejected with 401.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn principal(&self) -> Principal {
        self.0
            .as_ref()
            .map_or(Principal::Anonymous, Identity::principal)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map(OptionalIdentity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    use crate::state::test_support;

    fn request(state: &AppState, header: Option<String>) -> HttpRequest {
        let mut req = TestRequest::default().app_data(web::Data::new(state.clone()));
        if let Some(value) = header {
            req = req.insert_header((header::AUTHORIZATION, value));
        }
        req.to_http_request()
    }

    #[rstest]
    #[case("Bearer")]
    #[case("Token")]
    fn accepts_both_schemes(#[case] scheme: &str) {
        let state = test_support::state(true);
        let token = state
            .tokens
            .generate_token(5, "a@example.com", vec!["user".into()])
            .unwrap();

        let req = request(&state, Some(format!("{scheme} {token}")));
        let identity = authenticate(&req).unwrap().unwrap();

        assert_eq!(identity.user_id, 5);
        assert_eq!(identity.roles, vec!["user".to_string()]);
    }

    #[test]
    fn missing_header_is_anonymous() {
        let state = test_support::state(true);
        let req = request(&state, None);

        assert!(authenticate(&req).unwrap().is_none());
    }

    #[rstest]
    #[case("Basic dXNlcjpwdw==")]
    #[case("Bearer ")]
    #[case("Bearer not-a-jwt")]
    fn rejects_bad_credentials(#[case] value: &str) {
        let state = test_support::state(true);
        let req = request(&state, Some(value.to_string()));

        assert!(matches!(
            authenticate(&req),
            Err(AppError::Unauthorized(_))
        ));
    }
}
