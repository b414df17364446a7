//! Tag and tag-association endpoints.

use super::ApiClient;
use crate::errors::ClientError;
use crate::models::{CreateTagRequest, Tag};

impl ApiClient {
    /// GET /api/tags - List all tags.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, ClientError> {
        let url = self.endpoint(&["api", "tags"])?;
        self.fetch_json(self.http.get(url)).await
    }

    /// POST /api/tags - Create a tag, returning the stored representation.
    pub async fn create_tag(&self, request: &CreateTagRequest) -> Result<Tag, ClientError> {
        let url = self.endpoint(&["api", "tags"])?;
        self.fetch_json(self.http.post(url).json(request)).await
    }

    /// DELETE /api/tags/:id - Delete a tag.
    pub async fn delete_tag(&self, tag_id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "tags", tag_id])?;
        self.fetch_empty(self.http.delete(url)).await
    }

    /// POST /api/papers/:paper_id/tags/:tag_id - Assign a tag to a paper.
    pub async fn add_tag_to_paper(&self, paper_id: &str, tag_id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "papers", paper_id, "tags", tag_id])?;
        self.fetch_empty(self.http.post(url)).await
    }

    /// DELETE /api/papers/:paper_id/tags/:tag_id - Remove a tag from a paper.
    pub async fn remove_tag_from_paper(
        &self,
        paper_id: &str,
        tag_id: &str,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "papers", paper_id, "tags", tag_id])?;
        self.fetch_empty(self.http.delete(url)).await
    }
}
