//! One-time code endpoints.
//!
//! POST /auth/otp/send   — gate, rate-limit, generate, store hashed, email
//! POST /auth/otp/verify — match + consume, then hand off to session issuance

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use mongodb::bson::doc;

use crate::dtos::auth::{AuthResponse, SendOtpRequest, SendOtpResponse, VerifyOtpRequest};
use crate::handlers::auth::{issue_session, session_cookie};
use crate::utils::validation::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

/// Send a one-time code to the given email.
///
/// POST /auth/otp/send
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn send_otp(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SendOtpRequest>,
) -> Result<(StatusCode, Json<SendOtpResponse>), AppError> {
    state.otp.issue(&req.email, &req.bot_score_token).await?;
    Ok((StatusCode::OK, Json(SendOtpResponse { ok: true })))
}

/// Verify a one-time code and sign the user in.
///
/// POST /auth/otp/verify
#[tracing::instrument(skip(state, jar, req), fields(email = %req.email))]
pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<VerifyOtpRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let email = state.otp.verify(&req.email, &req.otp).await?;

    let user = state
        .db
        .users()
        .find_one(doc! { "email": &email }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    let (token, session) = issue_session(&state, &user)?;

    tracing::info!(user_id = %user.id, "User signed in with one-time code");

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
