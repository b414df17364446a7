//! Note endpoints.

use super::ApiClient;
use crate::errors::ClientError;
use crate::models::{PaperNote, SaveNoteRequest};

impl ApiClient {
    /// GET /api/notes/:paper_id - Fetch a paper's note.
    ///
    /// The backend answers with empty content rather than 404 when no note
    /// exists.
    pub async fn get_note(&self, paper_id: &str) -> Result<PaperNote, ClientError> {
        let url = self.endpoint(&["api", "notes", paper_id])?;
        self.fetch_json(self.http.get(url)).await
    }

    /// POST /api/notes/:paper_id - Create or replace a paper's note.
    pub async fn save_note(&self, paper_id: &str, content: &str) -> Result<PaperNote, ClientError> {
        let url = self.endpoint(&["api", "notes", paper_id])?;
        let body = SaveNoteRequest {
            content: content.to_string(),
        };
        self.fetch_json(self.http.post(url).json(&body)).await
    }

    /// DELETE /api/notes/:paper_id - Delete a paper's note.
    pub async fn delete_note(&self, paper_id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "notes", paper_id])?;
        self.fetch_empty(self.http.delete(url)).await
    }
}
