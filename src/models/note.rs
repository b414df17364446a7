//! Note model matching the backend note payload.

use serde::{Deserialize, Serialize};

use super::paper::null_as_default;

/// Longest note accepted at the edit surface, in characters.
pub const MAX_NOTE_CHARS: usize = 10_000;

/// Free-text annotation attached to a single paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperNote {
    pub paper_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// `None` when the backend holds no note for the paper
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl PaperNote {
    /// Whether the note carries anything worth showing.
    pub fn is_present(&self) -> bool {
        !self.content.is_empty()
    }
}

/// Request body for creating or replacing a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveNoteRequest {
    pub content: String,
}
