//! Workload-driver adapter for CouchDB.
//!
//! The benchmark harness drives a [`Client`]: point reads, range scans,
//! inserts, updates and deletes over flat records of field name to bytes.
//! [`CouchDBClient`] maps those records onto documents carrying `_id` and
//! `_rev`, re-reads the current revision before every update or delete, and
//! groups inserts into bulk writes of `batchsize` documents.
//!
//! The store itself sits behind [`DocumentStore`]. [`CouchStore`] speaks
//! CouchDB's HTTP API; [`MemoryStore`] keeps the same semantics in process.

pub mod buffer;
pub mod client;
pub mod codec;
pub mod config;
pub mod couch_client;
pub mod couchdb;
pub mod error;
pub mod memory;
pub mod store;

pub use buffer::BulkInsertBuffer;
pub use client::{Client, Record, Status};
pub use config::CouchConfig;
pub use couch_client::CouchDBClient;
#[cfg(feature = "couchdb")]
pub use couchdb::CouchStore;
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use store::{BulkOutcome, Document, DocumentStore, ReadConsistency, Revision};
