//! Paperlib - client-side data layer for a personal paper library.
//!
//! Mirrors a remote paper backend in a set of stores (saved papers, tags,
//! notes, search history), and formats the library for export.

pub mod api;
pub mod config;
pub mod errors;
pub mod export;
pub mod models;
pub mod search;
pub mod stores;

use std::path::{Path, PathBuf};

use futures_util::future::join_all;

use api::ApiClient;
use config::Config;
use errors::ClientError;
use export::{ExportFormat, PaperTags};
use models::{CitationStyle, Paper, PaperSummary, PdfUploadResponse};
use search::AdvancedQuery;
use stores::{NoteCache, PaperInvalidation, SavedPapers, SearchHistory, TagRegistry};

/// One of each store, wired to a single backend.
///
/// Tag-association changes are forwarded into a saved-papers refresh here, so
/// callers going through `Library` never see stale embedded tags.
#[derive(Debug)]
pub struct Library {
    api: ApiClient,
    papers: SavedPapers,
    tags: TagRegistry,
    notes: NoteCache,
    history: SearchHistory,
}

impl Library {
    /// Build a library from configuration. Nothing is fetched yet.
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let api = ApiClient::new(config)?;
        let history = SearchHistory::open(&config.history_path);
        Ok(Self::with_parts(api, history))
    }

    pub fn with_parts(api: ApiClient, history: SearchHistory) -> Self {
        Self {
            papers: SavedPapers::new(api.clone()),
            tags: TagRegistry::new(api.clone()),
            notes: NoteCache::new(api.clone()),
            api,
            history,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn papers(&self) -> &SavedPapers {
        &self.papers
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn notes(&self) -> &NoteCache {
        &self.notes
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    /// Initial fetch of papers and tags.
    pub async fn load(&self) -> Result<(), ClientError> {
        let (papers, tags) = tokio::join!(self.papers.load(), self.tags.load());
        papers?;
        tags?;
        tracing::info!(
            "Loaded {} papers and {} tags",
            self.papers.count(),
            self.tags.count()
        );
        Ok(())
    }

    /// Keyword search. The query is recorded in the history even when the
    /// search itself fails.
    pub async fn search(&self, query: &str) -> Result<Vec<PaperSummary>, ClientError> {
        if query.trim().is_empty() {
            return Err(ClientError::Validation("Search query is required".to_string()));
        }

        self.history.add(query);

        let results = self.api.search(query).await.map_err(|e| {
            tracing::error!("Search failed: {}", e);
            e
        })?;

        if results.is_empty() {
            return Err(ClientError::EmptyResult(format!(
                "No papers found for {:?}",
                query
            )));
        }
        Ok(results)
    }

    /// Keyword search refined by author, journal and year criteria.
    pub async fn advanced_search(
        &self,
        query: &AdvancedQuery,
    ) -> Result<Vec<PaperSummary>, ClientError> {
        if let Some(keywords) = query.keywords() {
            self.history.add(keywords);
        }

        let results = self.api.search(query.search_terms()).await.map_err(|e| {
            tracing::error!("Advanced search failed: {}", e);
            e
        })?;

        let filtered = query.apply(results);
        if filtered.is_empty() {
            return Err(ClientError::EmptyResult(format!(
                "No papers found for {:?}",
                query.search_terms()
            )));
        }
        Ok(filtered)
    }

    pub async fn cite(
        &self,
        paper: &PaperSummary,
        style: CitationStyle,
    ) -> Result<String, ClientError> {
        self.api.cite(paper, style).await.map_err(|e| {
            tracing::error!("Citation failed: {}", e);
            e
        })
    }

    /// Bring cached papers up to date after a tag mutation.
    pub async fn invalidate(&self, invalidation: PaperInvalidation) -> Result<(), ClientError> {
        match &invalidation {
            PaperInvalidation::Paper(id) => tracing::debug!("Refreshing papers for {}", id),
            PaperInvalidation::AllPapers => tracing::debug!("Refreshing all papers"),
        }
        // The backend only exposes the full list
        self.papers.refresh().await
    }

    pub async fn tag_paper(&self, paper_id: &str, tag_id: &str) -> Result<(), ClientError> {
        let invalidation = self.tags.add_to_paper(paper_id, tag_id).await?;
        self.invalidate(invalidation).await
    }

    pub async fn untag_paper(&self, paper_id: &str, tag_id: &str) -> Result<(), ClientError> {
        let invalidation = self.tags.remove_from_paper(paper_id, tag_id).await?;
        self.invalidate(invalidation).await
    }

    pub async fn delete_tag(&self, tag_id: &str) -> Result<(), ClientError> {
        let invalidation = self.tags.delete(tag_id).await?;
        self.invalidate(invalidation).await
    }

    /// Upload a local PDF for a saved paper, then refresh the paper list so
    /// the new PDF path shows up.
    ///
    /// The file name is checked before the file is read and its contents
    /// before anything is sent.
    pub async fn upload_pdf(
        &self,
        paper_id: &str,
        path: &Path,
    ) -> Result<PdfUploadResponse, ClientError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::Validation(format!("Invalid file path: {:?}", path)))?;

        api::validate_pdf_name(file_name)?;

        let data = tokio::fs::read(path).await?;
        api::validate_pdf(file_name, &data)?;

        let response = self.api.upload_pdf(paper_id, file_name, data).await.map_err(|e| {
            tracing::error!("Upload failed for {}: {}", paper_id, e);
            e
        })?;
        tracing::info!("Uploaded {} for paper {}", file_name, paper_id);

        self.papers.refresh().await?;
        Ok(response)
    }

    pub async fn delete_pdf(&self, paper_id: &str) -> Result<(), ClientError> {
        self.api.delete_pdf(paper_id).await?;
        self.papers.refresh().await
    }

    pub fn pdf_url(&self, paper_id: &str) -> Result<String, ClientError> {
        self.api.pdf_url(paper_id)
    }

    /// Fetch the note of every saved paper so exports include them.
    ///
    /// Returns the number of papers that have a note.
    pub async fn prefetch_notes(&self) -> Result<usize, ClientError> {
        let ids: Vec<String> = self.papers.list().into_iter().map(|p| p.id).collect();
        let results = join_all(ids.iter().map(|id| self.notes.get(id))).await;

        let mut found = 0;
        for result in results {
            if result?.is_some() {
                found += 1;
            }
        }
        Ok(found)
    }

    /// Saved papers, optionally limited to those carrying a tag.
    pub fn filter_by_tag(&self, tag_id: Option<&str>) -> Vec<Paper> {
        match tag_id {
            Some(id) => self.papers.with_tag(id),
            None => self.papers.list(),
        }
    }

    /// Format the cached library. Notes are whatever the note cache holds.
    pub fn export(&self, format: ExportFormat) -> Result<String, ClientError> {
        let papers = self.papers.list();
        let tags: PaperTags = papers
            .iter()
            .map(|p| (p.id.clone(), self.tags.tags_for_paper(p)))
            .collect();
        let notes = self.notes.snapshot();

        format.render(&papers, Some(&tags), Some(&notes))
    }

    /// Format the cached library and write it into `dir`.
    pub fn export_to_dir(&self, format: ExportFormat, dir: &Path) -> Result<PathBuf, ClientError> {
        let content = self.export(format)?;
        export::write_export(dir, format, &content, chrono::Local::now().date_naive())
    }
}
