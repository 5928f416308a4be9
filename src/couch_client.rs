use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::buffer::BulkInsertBuffer;
use crate::client::{Client, Record, Status};
use crate::codec::{self, Unprojected};
use crate::error::{Error, Result};
use crate::store::{DocumentStore, ReadConsistency};

/// Workload client for one document database.
///
/// Each benchmark worker owns its own instance, and with it its own store
/// handle and insert buffer. `table` arguments are accepted and ignored:
/// every operation targets the database the store was opened on.
pub struct CouchDBClient<S: DocumentStore> {
    store: S,
    inserts: BulkInsertBuffer,
}

impl<S: DocumentStore> CouchDBClient<S> {
    pub fn new(store: S, batch_size: usize) -> Result<Self> {
        Ok(Self {
            store,
            inserts: BulkInsertBuffer::new(batch_size)?,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn batch_size(&self) -> usize {
        self.inserts.batch_size()
    }

    /// Inserts accepted but not yet written to the store
    pub fn pending_inserts(&self) -> usize {
        self.inserts.len()
    }
}

#[cfg(feature = "couchdb")]
impl CouchDBClient<crate::couchdb::CouchStore> {
    pub async fn connect(config: &crate::config::CouchConfig) -> Result<Self> {
        let store = crate::couchdb::CouchStore::connect(config).await?;
        Self::new(store, config.batch_size)
    }
}

impl<S: DocumentStore> Drop for CouchDBClient<S> {
    fn drop(&mut self) {
        if !self.inserts.is_empty() {
            warn!(
                pending = self.inserts.len(),
                "client dropped without cleanup, buffered inserts discarded"
            );
        }
    }
}

#[async_trait]
impl<S: DocumentStore> Client for CouchDBClient<S> {
    async fn read(
        &self,
        _table: &str,
        key: &str,
        fields: Option<&HashSet<String>>,
    ) -> Result<Option<Record>> {
        let found = self.store.get(key, ReadConsistency::Stale).await?;
        Ok(found.map(|doc| codec::decode(&doc, fields, Unprojected::MetadataOnly)))
    }

    async fn scan(
        &self,
        _table: &str,
        start_key: &str,
        record_count: usize,
        fields: Option<&HashSet<String>>,
    ) -> Result<Vec<Record>> {
        let docs = self.store.all_docs(start_key, record_count, true).await?;
        Ok(docs
            .iter()
            .take(record_count)
            .map(|doc| codec::decode(doc, fields, Unprojected::FullDocument))
            .collect())
    }

    async fn update(&mut self, _table: &str, key: &str, values: &Record) -> Result<Status> {
        let Some(mut doc) = self.store.get(key, ReadConsistency::Fresh).await? else {
            return Ok(Status::NotFound);
        };
        codec::overlay(&mut doc, values);
        self.store.update(&doc).await?;
        Ok(Status::Ok)
    }

    async fn insert(&mut self, _table: &str, key: &str, values: &Record) -> Result<()> {
        let doc = codec::encode(key, values);
        if self.inserts.batch_size() == 1 {
            self.store.create(&doc).await?;
        } else {
            self.inserts.append(&self.store, doc).await?;
        }
        Ok(())
    }

    async fn delete(&mut self, _table: &str, key: &str) -> Result<()> {
        let doc = self
            .store
            .get(key, ReadConsistency::Fresh)
            .await?
            .ok_or_else(|| Error::NotFound { id: key.to_string() })?;
        let rev = doc
            .rev
            .ok_or_else(|| Error::NotFound { id: key.to_string() })?;
        self.store.remove(key, &rev).await
    }

    async fn cleanup(&mut self) -> Result<()> {
        let flushed = self.inserts.drain(&self.store).await?;
        if flushed > 0 {
            debug!(flushed, "drained pending inserts");
        }
        Ok(())
    }
}
