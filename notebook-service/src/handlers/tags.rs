use axum::{extract::State, Json};
use mongodb::bson::doc;

use crate::middleware::SessionUser;
use crate::AppState;
use service_core::error::AppError;

/// GET /tags — distinct tags across the owner's notes.
pub async fn list_tags(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
) -> Result<Json<Vec<String>>, AppError> {
    let values = state
        .db
        .notes()
        .distinct("tags", doc! { "owner_id": &claims.sub }, None)
        .await
        .map_err(AppError::from)?;

    let mut tags: Vec<String> = values
        .into_iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect();
    tags.sort();

    Ok(Json(tags))
}
