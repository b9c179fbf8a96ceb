use axum::{extract::State, Json};
use mongodb::bson::doc;

use crate::middleware::SessionUser;
use crate::models::SanitizedUser;
use crate::AppState;
use service_core::error::AppError;

/// GET /users/me — the signed-in user's profile.
pub async fn get_me(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
) -> Result<Json<SanitizedUser>, AppError> {
    let user = state
        .db
        .users()
        .find_one(doc! { "_id": &claims.sub }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(user.sanitized()))
}
