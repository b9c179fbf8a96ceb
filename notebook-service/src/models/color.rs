use serde::{Deserialize, Serialize};

/// Display palette entry for note cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Color {
    #[serde(rename = "_id")]
    pub id: String,
    pub bg: String,
    pub title: String,
    pub border: String,
}

impl Color {
    /// Default palette seeded into an empty colors collection at startup.
    pub fn default_palette() -> Vec<Color> {
        [
            ("yellow", "#fef9c3", "#a16207", "#fde047"),
            ("green", "#dcfce7", "#15803d", "#86efac"),
            ("blue", "#dbeafe", "#1d4ed8", "#93c5fd"),
            ("red", "#fee2e2", "#b91c1c", "#fca5a5"),
            ("gray", "#f3f4f6", "#374151", "#d1d5db"),
        ]
        .into_iter()
        .map(|(id, bg, title, border)| Color {
            id: id.to_string(),
            bg: bg.to_string(),
            title: title.to_string(),
            border: border.to_string(),
        })
        .collect()
    }
}
