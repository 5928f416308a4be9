#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use couchbench::{
    BulkOutcome, Document, DocumentStore, MemoryStore, ReadConsistency, Record, Result, Revision,
};
use parking_lot::Mutex;

pub fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
        .collect()
}

/// What another writer does between a client's fetch and its write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interference {
    /// Rewrite the document unchanged, moving it to a new revision.
    Rewrite,
    /// Delete the document.
    Delete,
}

/// Store where another writer touches every document right after it is
/// fetched, so the revision the caller holds is already outdated.
#[derive(Clone)]
pub struct RacingStore {
    pub inner: MemoryStore,
    interference: Interference,
    gets: Arc<AtomicUsize>,
}

impl RacingStore {
    pub fn new(inner: MemoryStore, interference: Interference) -> Self {
        Self {
            inner,
            interference,
            gets: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DocumentStore for RacingStore {
    async fn get(&self, id: &str, consistency: ReadConsistency) -> Result<Option<Document>> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let fetched = self.inner.get(id, consistency).await?;
        if let Some(doc) = &fetched {
            match self.interference {
                Interference::Rewrite => {
                    self.inner.update(doc).await?;
                }
                Interference::Delete => {
                    if let Some(rev) = &doc.rev {
                        self.inner.remove(id, rev).await?;
                    }
                }
            }
        }
        Ok(fetched)
    }

    async fn create(&self, doc: &Document) -> Result<Revision> {
        self.inner.create(doc).await
    }

    async fn update(&self, doc: &Document) -> Result<Revision> {
        self.inner.update(doc).await
    }

    async fn remove(&self, id: &str, rev: &Revision) -> Result<()> {
        self.inner.remove(id, rev).await
    }

    async fn bulk(&self, docs: &[Document], full_commit: bool) -> Result<Vec<BulkOutcome>> {
        self.inner.bulk(docs, full_commit).await
    }

    async fn all_docs(
        &self,
        start_id: &str,
        limit: usize,
        include_docs: bool,
    ) -> Result<Vec<Document>> {
        self.inner.all_docs(start_id, limit, include_docs).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get {
        id: String,
        consistency: ReadConsistency,
    },
    Create {
        id: String,
    },
    Update {
        id: String,
        rev: Option<Revision>,
    },
    Remove {
        id: String,
        rev: Revision,
    },
    Bulk {
        ids: Vec<String>,
        full_commit: bool,
    },
    AllDocs {
        start_id: String,
        limit: usize,
        include_docs: bool,
    },
}

/// Store that logs every request it receives before passing it on.
#[derive(Clone, Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn get(&self, id: &str, consistency: ReadConsistency) -> Result<Option<Document>> {
        self.push(Call::Get {
            id: id.to_string(),
            consistency,
        });
        self.inner.get(id, consistency).await
    }

    async fn create(&self, doc: &Document) -> Result<Revision> {
        self.push(Call::Create { id: doc.id.clone() });
        self.inner.create(doc).await
    }

    async fn update(&self, doc: &Document) -> Result<Revision> {
        self.push(Call::Update {
            id: doc.id.clone(),
            rev: doc.rev.clone(),
        });
        self.inner.update(doc).await
    }

    async fn remove(&self, id: &str, rev: &Revision) -> Result<()> {
        self.push(Call::Remove {
            id: id.to_string(),
            rev: rev.clone(),
        });
        self.inner.remove(id, rev).await
    }

    async fn bulk(&self, docs: &[Document], full_commit: bool) -> Result<Vec<BulkOutcome>> {
        self.push(Call::Bulk {
            ids: docs.iter().map(|d| d.id.clone()).collect(),
            full_commit,
        });
        self.inner.bulk(docs, full_commit).await
    }

    async fn all_docs(
        &self,
        start_id: &str,
        limit: usize,
        include_docs: bool,
    ) -> Result<Vec<Document>> {
        self.push(Call::AllDocs {
            start_id: start_id.to_string(),
            limit,
            include_docs,
        });
        self.inner.all_docs(start_id, limit, include_docs).await
    }
}
