//! Registration, password sign-in, password reset, logout and session
//! introspection.

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use mongodb::bson::doc;
use serde_json::{json, Value};
use validator::ValidateEmail;

use crate::config::Environment;
use crate::dtos::auth::{
    AuthResponse, LoginRequest, RegisterRequest, RegisterResponse, ResetPasswordRequest,
};
use crate::middleware::{SessionUser, SESSION_COOKIE};
use crate::models::User;
use crate::services::{Identity, SessionView};
use crate::utils::password::{
    check_password_strength, hash_password, verify_password, Password, PasswordHashString,
};
use crate::utils::validation::{validate_username, ValidatedJson};
use crate::AppState;
use service_core::error::AppError;

/// Scores below this are treated as automation, as for code issuance.
const BOT_SCORE_THRESHOLD: f64 = 0.4;

/// Build the HttpOnly session cookie carrying `token`.
pub fn session_cookie(state: &AppState, token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.environment == Environment::Prod)
        .build()
}

pub(crate) fn issue_session(
    state: &AppState,
    user: &User,
) -> Result<(String, SessionView), AppError> {
    let identity = Identity {
        id: user.id.clone(),
        email: user.email.clone(),
        username: user.username.clone(),
        name: user.display_name(),
    };
    let (token, claims) = state
        .session
        .issue(&identity)
        .map_err(AppError::InternalError)?;
    let session = state.session.view(&claims);
    Ok((token, session))
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we))
            if we.code == 11000
    )
}

/// Register a new account.
///
/// POST /auth/register
///
/// Validation mirrors the sign-up form rule by rule so the client can surface
/// the exact message next to the offending field.
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    if req.first_name.is_empty()
        || req.last_name.is_empty()
        || req.username.is_empty()
        || req.email.is_empty()
        || req.password.is_empty()
    {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "All fields are required"
        )));
    }

    // The bot gate only binds in production, matching the sign-up form
    if state.config.environment == Environment::Prod {
        if req.recaptcha_token.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Security verification required"
            )));
        }
        let score = state
            .bot_verifier
            .verify(&req.recaptcha_token)
            .await
            .map_err(AppError::from)?;
        if !score.success || score.score < BOT_SCORE_THRESHOLD {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Security check failed. Please try again."
            )));
        }
    }

    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();
    if first_name.len() < 2 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "First name must be at least 2 characters"
        )));
    }
    if last_name.len() < 2 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Last name must be at least 2 characters"
        )));
    }

    let username = req.username.trim().to_lowercase();
    if username.len() < 3 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Username must be at least 3 characters"
        )));
    }
    if validate_username(&username).is_err() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Username must contain only letters, numbers, dots, hyphens, and underscores"
        )));
    }

    let email = req.email.trim().to_lowercase();
    if !email.validate_email() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Please enter a valid email address"
        )));
    }

    check_password_strength(&req.password)
        .map_err(|msg| AppError::BadRequest(anyhow::anyhow!(msg)))?;

    let existing = state
        .db
        .users()
        .find_one(
            doc! { "$or": [ { "username": &username }, { "email": &email } ] },
            None,
        )
        .await
        .map_err(AppError::from)?;

    if let Some(existing) = existing {
        let field = if existing.username == username {
            "username"
        } else {
            "email"
        };
        return Err(AppError::Conflict(anyhow::anyhow!(
            "User already exists with this {}",
            field
        )));
    }

    let password_hash = hash_password(&Password::new(req.password))
        .map_err(AppError::InternalError)?
        .into_string();

    let user = User::new(first_name, last_name, username, email, password_hash);

    if let Err(e) = state.db.users().insert_one(&user, None).await {
        // The unique index closes the find-then-insert race
        if is_duplicate_key(&e) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "User already exists with this username or email"
            )));
        }
        return Err(AppError::from(e));
    }

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "User registered successfully".to_string(),
            user: user.sanitized(),
        }),
    ))
}

/// Sign in with username-or-email and password.
///
/// POST /auth/login
#[tracing::instrument(skip(state, jar, req))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let identifier = req.identifier.trim().to_lowercase();

    let user = state
        .db
        .users()
        .find_one(
            doc! { "$or": [ { "username": &identifier }, { "email": &identifier } ] },
            None,
        )
        .await
        .map_err(AppError::from)?;

    // A missing user and a wrong password are indistinguishable to the caller
    let user = user.ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Invalid credentials")))?;

    verify_password(
        &Password::new(req.password),
        &PasswordHashString::new(user.password_hash.clone()),
    )
    .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid credentials")))?;

    let (token, session) = issue_session(&state, &user)?;

    tracing::info!(user_id = %user.id, "User signed in with password");

    let jar = jar.add(session_cookie(&state, &token));
    Ok((
        jar,
        Json(AuthResponse {
            ok: true,
            token,
            session,
        }),
    ))
}

/// Reset a forgotten password after one-time-code verification.
///
/// POST /auth/password/reset
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    check_password_strength(&req.new_password)
        .map_err(|msg| AppError::BadRequest(anyhow::anyhow!(msg)))?;

    // Consumes the code; a second reset attempt needs a fresh one
    let email = state.otp.verify(&req.email, &req.otp).await?;

    let password_hash = hash_password(&Password::new(req.new_password))
        .map_err(AppError::InternalError)?
        .into_string();

    let updated = state
        .db
        .users()
        .update_one(
            doc! { "email": &email },
            doc! { "$set": {
                "password_hash": password_hash,
                "updated_at": mongodb::bson::DateTime::now(),
            } },
            None,
        )
        .await
        .map_err(AppError::from)?;

    if updated.matched_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("User not found")));
    }

    tracing::info!("Password reset completed");

    Ok(Json(json!({
        "success": true,
        "message": "Password reset successfully"
    })))
}

/// Clear the session cookie.
///
/// POST /auth/logout
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/").build());
    (jar, Json(json!({ "message": "Logged out" })))
}

/// Current session in the client-facing shape. Never extends the expiry.
///
/// GET /auth/session
pub async fn get_session(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
) -> Json<SessionView> {
    Json(state.session.view(&claims))
}
