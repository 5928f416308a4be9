use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::store::{Document, DocumentStore};

/// Pending inserts for one client, written to the store in a single bulk
/// request once `batch_size` documents have accumulated.
///
/// A partial batch is only written by [`BulkInsertBuffer::drain`].
#[derive(Debug)]
pub struct BulkInsertBuffer {
    batch_size: usize,
    pending: Vec<Document>,
}

impl BulkInsertBuffer {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Config("batch size must be positive".to_string()));
        }
        Ok(Self {
            batch_size,
            pending: Vec::with_capacity(batch_size.min(4096)),
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue a document, flushing the whole batch when it becomes full.
    pub async fn append<S: DocumentStore + ?Sized>(
        &mut self,
        store: &S,
        doc: Document,
    ) -> Result<()> {
        self.pending.push(doc);
        if self.pending.len() >= self.batch_size {
            self.flush(store).await?;
        }
        Ok(())
    }

    /// Write out a partially filled batch. Returns the number of documents
    /// sent.
    pub async fn drain<S: DocumentStore + ?Sized>(&mut self, store: &S) -> Result<usize> {
        self.flush(store).await
    }

    // The batch is kept when the request itself fails.
    async fn flush<S: DocumentStore + ?Sized>(&mut self, store: &S) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        let outcomes = store.bulk(&self.pending, false).await?;
        let sent = self.pending.len();
        self.pending.clear();

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        if failed > 0 {
            let first = outcomes.iter().find(|o| !o.is_success());
            warn!(
                sent,
                failed,
                first_id = first.map(|o| o.id.as_str()),
                first_error = first.and_then(|o| o.error.as_deref()),
                "bulk insert had per-document failures"
            );
        } else {
            debug!(sent, "bulk insert flushed");
        }

        Ok(sent)
    }
}
