use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::store::{BulkOutcome, Document, DocumentStore, ReadConsistency, Revision};

// Underscore members CouchDB accepts in a document body.
const SPECIAL_MEMBERS: &[&str] = &[
    "_attachments",
    "_conflicts",
    "_deleted",
    "_deleted_conflicts",
    "_local_seq",
    "_revisions",
    "_revs_info",
];

struct Entry {
    generation: u64,
    rev: Revision,
    fields: Map<String, Value>,
    deleted: bool,
}

#[derive(Default)]
struct Inner {
    docs: BTreeMap<String, Entry>,
    sequence: u64,
}

impl Inner {
    fn next_rev(&mut self, generation: u64) -> Revision {
        self.sequence += 1;
        Revision::new(format!("{}-{:016x}", generation, self.sequence))
    }

    fn write(&mut self, doc: &Document) -> Result<Revision> {
        if let Some(field) = doc
            .fields
            .keys()
            .find(|f| f.starts_with('_') && !SPECIAL_MEMBERS.contains(&f.as_str()))
        {
            return Err(Error::Store {
                status: 400,
                error: "doc_validation".to_string(),
                reason: format!("Bad special document member: {}", field),
            });
        }

        let generation = match (self.docs.get(&doc.id), &doc.rev) {
            (None, None) => 1,
            (Some(entry), None) if entry.deleted => entry.generation + 1,
            (Some(entry), Some(rev)) if !entry.deleted && entry.rev == *rev => {
                entry.generation + 1
            }
            // A revisioned write-back to a document that is gone.
            (None, Some(_)) => return Err(Error::NotFound { id: doc.id.clone() }),
            (Some(entry), Some(_)) if entry.deleted => {
                return Err(Error::NotFound { id: doc.id.clone() })
            }
            _ => return Err(Error::Conflict { id: doc.id.clone() }),
        };

        let rev = self.next_rev(generation);
        self.docs.insert(
            doc.id.clone(),
            Entry {
                generation,
                rev: rev.clone(),
                fields: doc.fields.clone(),
                deleted: false,
            },
        );
        Ok(rev)
    }
}

/// In-process store with CouchDB's revision, conflict and ordering rules.
/// Deleted documents leave a tombstone so a later create continues the
/// revision history. Cloning shares the underlying documents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    offline: Arc<AtomicBool>,
    bulk_requests: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live documents
    pub fn len(&self) -> usize {
        self.inner.lock().docs.values().filter(|e| !e.deleted).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bulk_requests(&self) -> u64 {
        self.bulk_requests.load(Ordering::Relaxed)
    }

    /// While offline every request fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(Error::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: &str, _consistency: ReadConsistency) -> Result<Option<Document>> {
        self.check_online()?;
        let inner = self.inner.lock();
        Ok(inner.docs.get(id).filter(|e| !e.deleted).map(|e| Document {
            id: id.to_string(),
            rev: Some(e.rev.clone()),
            fields: e.fields.clone(),
        }))
    }

    async fn create(&self, doc: &Document) -> Result<Revision> {
        self.check_online()?;
        let mut doc = doc.clone();
        doc.rev = None;
        self.inner.lock().write(&doc)
    }

    async fn update(&self, doc: &Document) -> Result<Revision> {
        self.check_online()?;
        self.inner.lock().write(doc)
    }

    async fn remove(&self, id: &str, rev: &Revision) -> Result<()> {
        self.check_online()?;
        let mut inner = self.inner.lock();
        let generation = match inner.docs.get(id) {
            Some(entry) if !entry.deleted && entry.rev == *rev => entry.generation + 1,
            Some(entry) if !entry.deleted => return Err(Error::Conflict { id: id.to_string() }),
            _ => return Err(Error::NotFound { id: id.to_string() }),
        };

        let rev = inner.next_rev(generation);
        inner.docs.insert(
            id.to_string(),
            Entry {
                generation,
                rev,
                fields: Map::new(),
                deleted: true,
            },
        );
        Ok(())
    }

    async fn bulk(&self, docs: &[Document], _full_commit: bool) -> Result<Vec<BulkOutcome>> {
        self.check_online()?;
        self.bulk_requests.fetch_add(1, Ordering::Relaxed);

        let mut inner = self.inner.lock();
        let outcomes = docs
            .iter()
            .map(|doc| match inner.write(doc) {
                Ok(rev) => BulkOutcome {
                    id: doc.id.clone(),
                    rev: Some(rev),
                    error: None,
                    reason: None,
                },
                Err(e) => BulkOutcome {
                    id: doc.id.clone(),
                    rev: None,
                    error: Some(bulk_error(&e).to_string()),
                    reason: Some(e.to_string()),
                },
            })
            .collect();
        Ok(outcomes)
    }

    async fn all_docs(
        &self,
        start_id: &str,
        limit: usize,
        include_docs: bool,
    ) -> Result<Vec<Document>> {
        self.check_online()?;
        let inner = self.inner.lock();
        let docs = inner
            .docs
            .range(start_id.to_string()..)
            .filter(|(_, e)| !e.deleted)
            .take(limit)
            .map(|(id, e)| Document {
                id: id.clone(),
                rev: Some(e.rev.clone()),
                fields: if include_docs {
                    e.fields.clone()
                } else {
                    Map::new()
                },
            })
            .collect();
        Ok(docs)
    }
}

fn bulk_error(err: &Error) -> &str {
    match err {
        Error::Conflict { .. } => "conflict",
        Error::NotFound { .. } => "not_found",
        Error::Store { error, .. } => error,
        _ => "unknown_error",
    }
}
