use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

use crate::error::Result;

pub const ID_FIELD: &str = "_id";
pub const REV_FIELD: &str = "_rev";

/// Store-assigned revision token. Never parsed, only handed back on writes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wire form of a stored document: `_id`, `_rev` and the application fields
/// side by side in one JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<Revision>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rev: None,
            fields: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadConsistency {
    /// The latest committed revision.
    Fresh,
    /// A slightly outdated document is acceptable in exchange for latency.
    Stale,
}

/// Per-document result of a bulk write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub id: String,
    #[serde(default)]
    pub rev: Option<Revision>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BulkOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetch a document by id. `None` when no live document exists.
    async fn get(&self, id: &str, consistency: ReadConsistency) -> Result<Option<Document>>;

    /// Create a new document and return its first revision
    async fn create(&self, doc: &Document) -> Result<Revision>;

    /// Replace a document. `doc.rev` must carry the revision being replaced.
    async fn update(&self, doc: &Document) -> Result<Revision>;

    /// Remove the document at the given revision
    async fn remove(&self, id: &str, rev: &Revision) -> Result<()>;

    /// Write many documents in one request. Per-document failures are
    /// reported in the outcomes, not as an error.
    async fn bulk(&self, docs: &[Document], full_commit: bool) -> Result<Vec<BulkOutcome>>;

    /// Documents in id order starting at `start_id` inclusive, at most `limit`
    /// of them. Without `include_docs` only ids and revisions are returned.
    async fn all_docs(
        &self,
        start_id: &str,
        limit: usize,
        include_docs: bool,
    ) -> Result<Vec<Document>>;
}
