//! Tag model matching the backend tag payload.

use serde::{Deserialize, Serialize};

/// A global label, many-to-many with saved papers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Request body for creating a new tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTagRequest {
    /// Client-generated identifier
    pub id: String,
    pub name: String,
    pub color: String,
}
