use axum::{extract::State, Json};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;

use crate::dtos::notes::ColorResponse;
use crate::AppState;
use service_core::error::AppError;

/// GET /colors — the note card palette.
pub async fn list_colors(
    State(state): State<AppState>,
) -> Result<Json<Vec<ColorResponse>>, AppError> {
    let mut cursor = state
        .db
        .colors()
        .find(doc! {}, None)
        .await
        .map_err(AppError::from)?;

    let mut colors = Vec::new();
    while let Some(color) = cursor.try_next().await.map_err(AppError::from)? {
        colors.push(ColorResponse::from(color));
    }

    Ok(Json(colors))
}
