//! Request-time session gate for protected routes.
//!
//! Stateless: trusts the signed claims' embedded expiry and never consults
//! persisted storage. Failures redirect to the sign-in view, preserving the
//! originally requested path for post-login return.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::services::{SessionClaims, SessionError};
use crate::AppState;

pub const SESSION_COOKIE: &str = "notebook_session";
pub const LOGIN_PATH: &str = "/login";

/// Gate evaluated per incoming request to a protected resource.
pub async fn session_guard(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    let token = bearer.or_else(|| jar.get(SESSION_COOKIE).map(|c| c.value().to_string()));

    let token = match token {
        Some(token) => token,
        None => return redirect_to_login(&path, false),
    };

    match state.session.validate(&token) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(SessionError::Expired) => redirect_to_login(&path, true),
        Err(SessionError::Invalid) => redirect_to_login(&path, false),
    }
}

fn redirect_to_login(return_to: &str, expired: bool) -> Response {
    let url = if expired {
        format!(
            "{}?expired=1&returnTo={}",
            LOGIN_PATH,
            urlencoding::encode(return_to)
        )
    } else {
        format!("{}?returnTo={}", LOGIN_PATH, urlencoding::encode(return_to))
    };
    Redirect::to(&url).into_response()
}

/// Extractor for the validated session claims in protected handlers.
pub struct SessionUser(pub SessionClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<SessionClaims>().ok_or_else(|| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Session claims missing from request extensions" })),
            )
                .into_response()
        })?;

        Ok(SessionUser(claims.clone()))
    }
}
