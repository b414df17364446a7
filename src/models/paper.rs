//! Saved paper model matching the backend paper payload.

use serde::{Deserialize, Deserializer, Serialize};

use super::{PaperSummary, Tag};

/// A paper persisted in the user's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub year: i32,
    #[serde(
        rename = "abstract",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub abstract_text: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    /// Server-side location of an uploaded PDF
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Tags resolved by the backend and embedded in the payload
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<Tag>,
}

impl Paper {
    pub fn has_pdf(&self) -> bool {
        self.pdf_path.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tags.iter().any(|t| t.id == tag_id)
    }
}

/// Request body for saving a paper.
///
/// Only bibliographic fields are sent; persisted fields such as the PDF path
/// and the creation time are assigned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePaperRequest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: i32,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
}

impl From<&PaperSummary> for CreatePaperRequest {
    fn from(summary: &PaperSummary) -> Self {
        Self {
            id: summary.id.clone(),
            title: summary.title.clone(),
            authors: summary.authors.clone(),
            year: summary.year,
            abstract_text: summary.abstract_text.clone(),
            url: summary.url.clone(),
            journal: summary.journal.clone(),
            volume: summary.volume.clone(),
            issue: summary.issue.clone(),
            pages: summary.pages.clone(),
        }
    }
}

/// Response body of a PDF upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfUploadResponse {
    pub status: String,
    pub paper_id: String,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
