use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Note, NoteColor};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNoteRequest {
    #[validate(length(min = 1, message = "Title and content are required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Title and content are required"))]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub color: Option<NoteColor>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub color: Option<NoteColor>,
}

/// Query parameters for the note list: free-text search, comma-separated
/// color/tag filters and pagination.
#[derive(Debug, Deserialize)]
pub struct NoteListParams {
    pub q: Option<String>,
    pub colors: Option<String>,
    pub tags: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub color: NoteColor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            title: note.title,
            content: note.content,
            tags: note.tags,
            color: note.color,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListResponse {
    pub notes: Vec<NoteResponse>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct ColorResponse {
    pub id: String,
    pub bg: String,
    pub title: String,
    pub border: String,
}

impl From<crate::models::Color> for ColorResponse {
    fn from(color: crate::models::Color) -> Self {
        Self {
            id: color.id,
            bg: color.bg,
            title: color.title,
            border: color.border,
        }
    }
}
