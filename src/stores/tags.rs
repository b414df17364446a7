//! Tag registry.
//!
//! Tags are global. Which papers carry a tag is owned by the backend and only
//! shows up on the paper payloads, so association mutations hand back a
//! [`PaperInvalidation`] for the caller to forward to the saved-papers cache.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use super::{InFlight, Pending};
use crate::api::ApiClient;
use crate::errors::ClientError;
use crate::models::{CreateTagRequest, Paper, Tag};

/// Colors handed out to tags created without an explicit color.
pub const PRESET_COLORS: [&str; 7] = [
    "#3B82F6", // blue
    "#10B981", // green
    "#F59E0B", // amber
    "#EF4444", // red
    "#8B5CF6", // purple
    "#F97316", // orange
    "#EC4899", // pink
];

/// Cached paper data made stale by a tag mutation.
#[must_use = "forward the invalidation to SavedPapers::refresh"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperInvalidation {
    /// The embedded tags of one paper changed.
    Paper(String),
    /// Any paper may have changed.
    AllPapers,
}

/// In-memory reflection of the backend's tags.
#[derive(Debug)]
pub struct TagRegistry {
    api: ApiClient,
    tags: RwLock<Vec<Tag>>,
    pending: Pending,
    in_flight: InFlight,
}

impl TagRegistry {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            tags: RwLock::new(Vec::new()),
            pending: Pending::default(),
            in_flight: InFlight::default(),
        }
    }

    pub async fn load(&self) -> Result<(), ClientError> {
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<(), ClientError> {
        let _pending = self.pending.start();

        match self.api.list_tags().await {
            Ok(tags) => {
                tracing::debug!("Fetched {} tags", tags.len());
                *self.write() = tags;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Error fetching tags: {}", e);
                Err(e)
            }
        }
    }

    /// Create a tag, defaulting its color by the current tag count.
    ///
    /// The backend's stored representation is what gets cached and returned.
    pub async fn create(&self, name: &str, color: Option<&str>) -> Result<Tag, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation("Tag name is required".to_string()));
        }

        let _guard = self.in_flight.begin(format!("tag-name:{}", name))?;

        let color = match color.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => c.to_string(),
            None => default_color(self.count()).to_string(),
        };

        let request = CreateTagRequest {
            id: generate_tag_id(),
            name: name.to_string(),
            color,
        };

        match self.api.create_tag(&request).await {
            Ok(tag) => {
                tracing::info!("Created tag {} ({})", tag.name, tag.id);
                self.write().push(tag.clone());
                Ok(tag)
            }
            Err(e) => {
                tracing::error!("Error creating tag {}: {}", name, e);
                Err(e)
            }
        }
    }

    /// Delete a tag. Every paper embedding it is now stale.
    pub async fn delete(&self, tag_id: &str) -> Result<PaperInvalidation, ClientError> {
        let _guard = self.in_flight.begin(format!("tag:{}", tag_id))?;

        if let Err(e) = self.api.delete_tag(tag_id).await {
            tracing::error!("Error deleting tag {}: {}", tag_id, e);
            return Err(e);
        }

        self.write().retain(|t| t.id != tag_id);
        tracing::info!("Deleted tag {}", tag_id);
        Ok(PaperInvalidation::AllPapers)
    }

    /// Assign a tag to a paper. No cached paper is touched.
    pub async fn add_to_paper(
        &self,
        paper_id: &str,
        tag_id: &str,
    ) -> Result<PaperInvalidation, ClientError> {
        let _guard = self
            .in_flight
            .begin(format!("paper-tag:{}:{}", paper_id, tag_id))?;

        if let Err(e) = self.api.add_tag_to_paper(paper_id, tag_id).await {
            tracing::error!("Error adding tag {} to paper {}: {}", tag_id, paper_id, e);
            return Err(e);
        }
        Ok(PaperInvalidation::Paper(paper_id.to_string()))
    }

    /// Remove a tag from a paper. No cached paper is touched.
    pub async fn remove_from_paper(
        &self,
        paper_id: &str,
        tag_id: &str,
    ) -> Result<PaperInvalidation, ClientError> {
        let _guard = self
            .in_flight
            .begin(format!("paper-tag:{}:{}", paper_id, tag_id))?;

        if let Err(e) = self.api.remove_tag_from_paper(paper_id, tag_id).await {
            tracing::error!("Error removing tag {} from paper {}: {}", tag_id, paper_id, e);
            return Err(e);
        }
        Ok(PaperInvalidation::Paper(paper_id.to_string()))
    }

    /// Tags embedded in a paper payload.
    pub fn tags_for_paper(&self, paper: &Paper) -> Vec<Tag> {
        paper.tags.clone()
    }

    /// Ids of papers carrying a tag, fetched fresh from the backend.
    pub async fn papers_with_tag(&self, tag_id: &str) -> Result<Vec<String>, ClientError> {
        let papers = self.api.list_papers().await.map_err(|e| {
            tracing::error!("Error getting papers with tag {}: {}", tag_id, e);
            e
        })?;

        Ok(papers
            .into_iter()
            .filter(|p| p.has_tag(tag_id))
            .map(|p| p.id)
            .collect())
    }

    pub fn list(&self) -> Vec<Tag> {
        self.read().clone()
    }

    pub fn get(&self, tag_id: &str) -> Option<Tag> {
        self.read().iter().find(|t| t.id == tag_id).cloned()
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<Tag> {
        let name = name.trim();
        self.read()
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.read().len()
    }

    pub fn palette(&self) -> &'static [&'static str] {
        &PRESET_COLORS
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_pending()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Tag>> {
        self.tags.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Tag>> {
        self.tags.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Palette color for the tag created at position `index`.
pub fn default_color(index: usize) -> &'static str {
    PRESET_COLORS[index % PRESET_COLORS.len()]
}

/// Fresh client-side tag identifier.
pub fn generate_tag_id() -> String {
    format!("tag_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_color_cycles() {
        assert_eq!(default_color(0), "#3B82F6");
        assert_eq!(default_color(6), "#EC4899");
        assert_eq!(default_color(7), default_color(0));
        assert_eq!(default_color(15), default_color(1));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_tag_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.starts_with("tag_")));
    }
}
