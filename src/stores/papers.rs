//! Saved-papers cache.
//!
//! The backend is authoritative. Additions become visible only after a full
//! re-fetch, because the stored shape (creation time, PDF path, embedded tags)
//! is assigned server-side. Removals are applied locally as soon as the delete
//! succeeds. A re-fetch that overlaps a local removal is discarded, since its
//! list may still contain the removed papers.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures_util::future::join_all;

use super::{InFlight, Pending};
use crate::api::ApiClient;
use crate::errors::ClientError;
use crate::models::{CreatePaperRequest, Paper, PaperSummary};

/// In-memory reflection of the user's saved papers.
#[derive(Debug)]
pub struct SavedPapers {
    api: ApiClient,
    papers: RwLock<Vec<Paper>>,
    pending: Pending,
    in_flight: InFlight,
    /// Bumped by every local removal.
    generation: AtomicU64,
}

impl SavedPapers {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            papers: RwLock::new(Vec::new()),
            pending: Pending::default(),
            in_flight: InFlight::default(),
            generation: AtomicU64::new(0),
        }
    }

    /// Initial population of the cache.
    pub async fn load(&self) -> Result<(), ClientError> {
        self.refresh().await
    }

    /// Replace the cache with the backend's current paper set.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let _pending = self.pending.start();
        let seen = self.generation.load(Ordering::SeqCst);

        match self.api.list_papers().await {
            Ok(papers) => {
                let mut cached = self.write();
                if self.generation.load(Ordering::SeqCst) != seen {
                    tracing::debug!("Discarding paper list superseded by a local removal");
                    return Ok(());
                }
                tracing::debug!("Fetched {} saved papers", papers.len());
                *cached = papers;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error fetching papers: {}", e);
                Err(e)
            }
        }
    }

    /// Save a search result to the library.
    ///
    /// Returns once the creation request succeeded. The follow-up refresh is
    /// best effort: if it fails the paper stays invisible to [`is_saved`]
    /// until the next successful refresh.
    ///
    /// [`is_saved`]: SavedPapers::is_saved
    pub async fn save(&self, summary: &PaperSummary) -> Result<(), ClientError> {
        if summary.id.trim().is_empty() {
            return Err(ClientError::Validation("Paper id is required".to_string()));
        }

        let _guard = self.in_flight.begin(format!("paper:{}", summary.id))?;

        let request = CreatePaperRequest::from(summary);
        if let Err(e) = self.api.create_paper(&request).await {
            tracing::error!("Error saving paper {}: {}", summary.id, e);
            return Err(e);
        }
        tracing::info!("Saved paper {}", summary.id);

        if let Err(e) = self.refresh().await {
            tracing::warn!("Paper {} saved but the library could not be refreshed: {}", summary.id, e);
        }
        Ok(())
    }

    /// Remove a paper, dropping it locally without waiting for a refresh.
    pub async fn unsave(&self, paper_id: &str) -> Result<(), ClientError> {
        let _guard = self.in_flight.begin(format!("paper:{}", paper_id))?;

        if let Err(e) = self.api.delete_paper(paper_id).await {
            tracing::error!("Error unsaving paper {}: {}", paper_id, e);
            return Err(e);
        }

        self.remove_local(|p| p.id == paper_id);
        tracing::info!("Removed paper {}", paper_id);
        Ok(())
    }

    /// Delete every known paper concurrently.
    ///
    /// Papers whose delete succeeded are dropped locally. If any delete failed
    /// the cache is re-fetched and a `PartialFailure` names the survivors.
    pub async fn clear_all(&self) -> Result<(), ClientError> {
        let _guard = self.in_flight.begin("papers:clear-all")?;

        let ids: Vec<String> = self.read().iter().map(|p| p.id.clone()).collect();
        if ids.is_empty() {
            return Ok(());
        }

        let results = join_all(ids.iter().map(|id| self.api.delete_paper(id))).await;

        let mut deleted = HashSet::new();
        let mut failed = Vec::new();
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => {
                    deleted.insert(id.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to delete paper {}: {}", id, e);
                    failed.push(id.clone());
                }
            }
        }

        self.remove_local(|p| deleted.contains(&p.id));

        if failed.is_empty() {
            tracing::info!("Cleared {} saved papers", ids.len());
            return Ok(());
        }

        if let Err(e) = self.refresh().await {
            tracing::warn!("Could not reconcile library after partial clear: {}", e);
        }

        Err(ClientError::PartialFailure {
            message: format!("Failed to delete {} of {} papers", failed.len(), ids.len()),
            failed,
        })
    }

    /// Snapshot of the cached papers.
    pub fn list(&self) -> Vec<Paper> {
        self.read().clone()
    }

    pub fn get(&self, paper_id: &str) -> Option<Paper> {
        self.read().iter().find(|p| p.id == paper_id).cloned()
    }

    /// Membership test against the cache only.
    pub fn is_saved(&self, paper_id: &str) -> bool {
        self.read().iter().any(|p| p.id == paper_id)
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Cached papers carrying the given tag.
    pub fn with_tag(&self, tag_id: &str) -> Vec<Paper> {
        self.read()
            .iter()
            .filter(|p| p.has_tag(tag_id))
            .cloned()
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_pending()
    }

    fn remove_local(&self, removed: impl Fn(&Paper) -> bool) {
        let mut papers = self.write();
        papers.retain(|p| !removed(p));
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Paper>> {
        self.papers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Paper>> {
        self.papers.write().unwrap_or_else(PoisonError::into_inner)
    }
}
