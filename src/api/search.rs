//! Search proxy and citation endpoints.

use super::ApiClient;
use crate::errors::ClientError;
use crate::models::{CitationStyle, PaperSummary, SearchRequest, DEFAULT_SEARCH_LIMIT};

impl ApiClient {
    /// POST /search/openalex - Search the remote index.
    pub async fn search(&self, query: &str) -> Result<Vec<PaperSummary>, ClientError> {
        let url = self.endpoint(&["search", "openalex"])?;
        let body = SearchRequest {
            query: query.to_string(),
            limit: DEFAULT_SEARCH_LIMIT,
        };

        tracing::debug!("Searching for {:?}", query);
        self.fetch_json(self.http.post(url).json(&body)).await
    }

    /// POST /cite/:style - Format a citation for a paper.
    pub async fn cite(
        &self,
        paper: &PaperSummary,
        style: CitationStyle,
    ) -> Result<String, ClientError> {
        let url = self.endpoint(&["cite", style.as_str()])?;
        self.fetch_json(self.http.post(url).json(paper)).await
    }
}
