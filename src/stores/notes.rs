//! Note cache.
//!
//! Reads always go to the backend and populate the map on the way back.
//! `has_note` only consults the map, so a paper reports no note until its note
//! has been fetched or saved during this session.
//!
//! A fetch that overlaps a save or delete of the same note is discarded, so a
//! slow read never replaces content written after it started.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Generations, InFlight, Pending};
use crate::api::ApiClient;
use crate::errors::ClientError;
use crate::models::{PaperNote, MAX_NOTE_CHARS};

#[derive(Debug)]
pub struct NoteCache {
    api: ApiClient,
    notes: RwLock<HashMap<String, PaperNote>>,
    pending: Pending,
    in_flight: InFlight,
    generations: Generations,
}

impl NoteCache {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            notes: RwLock::new(HashMap::new()),
            pending: Pending::default(),
            in_flight: InFlight::default(),
            generations: Generations::default(),
        }
    }

    /// Fetch a paper's note from the backend.
    ///
    /// Returns `None` when the backend holds no content for the paper, in
    /// which case any stale local copy is dropped.
    pub async fn get(&self, paper_id: &str) -> Result<Option<PaperNote>, ClientError> {
        let _pending = self.pending.start();
        let seen = self.generations.current(paper_id);

        let note = self.api.get_note(paper_id).await.map_err(|e| {
            tracing::error!("Error fetching note for {}: {}", paper_id, e);
            e
        })?;

        let mut notes = self.write();
        if self.generations.current(paper_id) != seen {
            tracing::debug!("Discarding note fetch for {} superseded by a local change", paper_id);
            return Ok(notes.get(paper_id).filter(|n| n.is_present()).cloned());
        }

        if note.is_present() {
            notes.insert(paper_id.to_string(), note.clone());
            Ok(Some(note))
        } else {
            notes.remove(paper_id);
            Ok(None)
        }
    }

    /// Create or replace a paper's note and cache the backend's echo.
    pub async fn save(&self, paper_id: &str, content: &str) -> Result<PaperNote, ClientError> {
        let chars = content.chars().count();
        if chars > MAX_NOTE_CHARS {
            return Err(ClientError::Validation(format!(
                "Note is {} characters long, the limit is {}",
                chars, MAX_NOTE_CHARS
            )));
        }

        let _guard = self.in_flight.begin(format!("note:{}", paper_id))?;
        let _pending = self.pending.start();

        match self.api.save_note(paper_id, content).await {
            Ok(note) => {
                tracing::info!("Saved note for {}", paper_id);
                let mut notes = self.write();
                notes.insert(paper_id.to_string(), note.clone());
                self.generations.bump(paper_id);
                Ok(note)
            }
            Err(e) => {
                tracing::error!("Error saving note for {}: {}", paper_id, e);
                Err(e)
            }
        }
    }

    pub async fn delete(&self, paper_id: &str) -> Result<(), ClientError> {
        let _guard = self.in_flight.begin(format!("note:{}", paper_id))?;

        if let Err(e) = self.api.delete_note(paper_id).await {
            tracing::error!("Error deleting note for {}: {}", paper_id, e);
            return Err(e);
        }

        let mut notes = self.write();
        notes.remove(paper_id);
        self.generations.bump(paper_id);
        drop(notes);
        tracing::info!("Deleted note for {}", paper_id);
        Ok(())
    }

    /// Local-only check for a cached note with content.
    pub fn has_note(&self, paper_id: &str) -> bool {
        self.read()
            .get(paper_id)
            .is_some_and(PaperNote::is_present)
    }

    pub fn cached(&self, paper_id: &str) -> Option<PaperNote> {
        self.read().get(paper_id).cloned()
    }

    /// Copy of every cached note, keyed by paper id.
    pub fn snapshot(&self) -> HashMap<String, PaperNote> {
        self.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_pending()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, PaperNote>> {
        self.notes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, PaperNote>> {
        self.notes.write().unwrap_or_else(PoisonError::into_inner)
    }
}
