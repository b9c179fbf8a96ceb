//! Owner-scoped note CRUD with search, filters and pagination.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use serde_json::json;

use crate::dtos::notes::{
    CreateNoteRequest, NoteListParams, NoteListResponse, NoteResponse, UpdateNoteRequest,
};
use crate::middleware::SessionUser;
use crate::models::Note;
use crate::utils::validation::ValidatedJson;
use crate::AppState;
use service_core::error::AppError;

/// POST /notes
pub async fn create_note(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
    ValidatedJson(req): ValidatedJson<CreateNoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let note = Note::new(
        claims.sub,
        req.title,
        req.content,
        req.tags,
        req.color.unwrap_or_default(),
    );

    state
        .db
        .notes()
        .insert_one(&note, None)
        .await
        .map_err(AppError::from)?;

    tracing::info!(note_id = %note.id, "Note created");

    Ok((StatusCode::CREATED, Json(NoteResponse::from(note))))
}

/// GET /notes?q=&colors=&tags=&page=&page_size=
pub async fn list_notes(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
    Query(params): Query<NoteListParams>,
) -> Result<Json<NoteListResponse>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);
    let skip = (page - 1) * page_size;

    let filter = build_list_filter(&claims.sub, &params);

    let total = state
        .db
        .notes()
        .count_documents(filter.clone(), None)
        .await
        .map_err(AppError::from)?;

    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .skip(skip)
        .limit(page_size as i64)
        .build();

    let mut cursor = state
        .db
        .notes()
        .find(filter, find_options)
        .await
        .map_err(AppError::from)?;

    let mut notes = Vec::new();
    while let Some(note) = cursor.try_next().await.map_err(AppError::from)? {
        notes.push(NoteResponse::from(note));
    }

    let total_pages = (total as f64 / page_size as f64).ceil() as u64;

    Ok(Json(NoteListResponse {
        notes,
        total,
        page,
        page_size,
        total_pages,
    }))
}

fn build_list_filter(owner_id: &str, params: &NoteListParams) -> Document {
    let mut filter = doc! { "owner_id": owner_id };

    if let Some(q) = params.q.as_deref().filter(|q| !q.is_empty()) {
        filter.insert(
            "$or",
            vec![
                doc! { "title": { "$regex": q, "$options": "i" } },
                doc! { "content": { "$regex": q, "$options": "i" } },
            ],
        );
    }

    if let Some(colors) = split_csv(params.colors.as_deref()) {
        filter.insert("color", doc! { "$in": colors });
    }

    if let Some(tags) = split_csv(params.tags.as_deref()) {
        filter.insert("tags", doc! { "$in": tags });
    }

    filter
}

fn split_csv(value: Option<&str>) -> Option<Vec<String>> {
    let items: Vec<String> = value?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// GET /notes/:id
pub async fn get_note(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
    Path(id): Path<String>,
) -> Result<Json<NoteResponse>, AppError> {
    let note = state
        .db
        .notes()
        .find_one(doc! { "_id": &id, "owner_id": &claims.sub }, None)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Note not found")))?;

    Ok(Json(NoteResponse::from(note)))
}

/// PUT /notes/:id
pub async fn update_note(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<NoteResponse>, AppError> {
    let mut set = doc! { "updated_at": mongodb::bson::DateTime::now() };

    if let Some(title) = req.title {
        if title.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Title and content are required"
            )));
        }
        set.insert("title", title);
    }
    if let Some(content) = req.content {
        if content.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Title and content are required"
            )));
        }
        set.insert("content", content);
    }
    if let Some(tags) = req.tags {
        set.insert("tags", tags);
    }
    if let Some(color) = req.color {
        set.insert("color", color.as_str());
    }

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    let updated = state
        .db
        .notes()
        .find_one_and_update(
            doc! { "_id": &id, "owner_id": &claims.sub },
            doc! { "$set": set },
            options,
        )
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Note not found")))?;

    Ok(Json(NoteResponse::from(updated)))
}

/// DELETE /notes/:id
pub async fn delete_note(
    State(state): State<AppState>,
    SessionUser(claims): SessionUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let result = state
        .db
        .notes()
        .delete_one(doc! { "_id": &id, "owner_id": &claims.sub }, None)
        .await
        .map_err(AppError::from)?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound(anyhow::anyhow!("Note not found")));
    }

    tracing::info!(note_id = %id, "Note deleted");

    Ok(Json(json!({ "message": "Note deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(q: Option<&str>, colors: Option<&str>, tags: Option<&str>) -> NoteListParams {
        NoteListParams {
            q: q.map(String::from),
            colors: colors.map(String::from),
            tags: tags.map(String::from),
            page: None,
            page_size: None,
        }
    }

    #[test]
    fn filter_always_scopes_to_owner() {
        let filter = build_list_filter("user-1", &params(None, None, None));
        assert_eq!(filter.get_str("owner_id").unwrap(), "user-1");
        assert!(!filter.contains_key("$or"));
    }

    #[test]
    fn filter_includes_search_and_facets() {
        let filter = build_list_filter(
            "user-1",
            &params(Some("groceries"), Some("yellow,blue"), Some("home, work")),
        );

        assert!(filter.contains_key("$or"));
        let colors = filter.get_document("color").unwrap();
        assert_eq!(
            colors.get_array("$in").unwrap().len(),
            2,
        );
        let tags = filter.get_document("tags").unwrap();
        assert_eq!(tags.get_array("$in").unwrap().len(), 2);
    }

    #[test]
    fn empty_csv_values_are_ignored() {
        let filter = build_list_filter("user-1", &params(None, Some(" , ,"), None));
        assert!(!filter.contains_key("color"));
    }
}
