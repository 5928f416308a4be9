#![cfg(feature = "couchdb")]

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

use crate::config::CouchConfig;
use crate::error::{Error, Result};
use crate::store::{BulkOutcome, Document, DocumentStore, ReadConsistency, Revision};

// Scans with include_docs can return far more than ureq's default body limit.
const MAX_RESPONSE_BYTES: u64 = 1 << 30;

#[derive(Clone)]
struct Connection {
    agent: Agent,
    db_url: String,
    authorization: Option<String>,
}

impl Connection {
    fn doc_url(&self, id: &str) -> String {
        format!("{}/{}", self.db_url, encode_segment(id))
    }

    fn authorize<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        let request = request.header("Accept", "application/json");
        match &self.authorization {
            Some(auth) => request.header("Authorization", auth.as_str()),
            None => request,
        }
    }
}

/// CouchDB over its HTTP API. Requests run on a blocking `ureq` agent inside
/// tokio's blocking pool; no timeouts are configured and nothing is retried.
#[derive(Clone)]
pub struct CouchStore {
    conn: Connection,
}

impl CouchStore {
    /// Open a connection to the configured database, creating it first when
    /// `create_db_if_absent` is set.
    pub async fn connect(config: &CouchConfig) -> Result<Self> {
        config.validate()?;

        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .build();
        let agent = Agent::new_with_config(agent_config);

        let authorization = config.username.as_ref().map(|user| {
            let password = config.password.as_deref().unwrap_or_default();
            let token = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", user, password));
            format!("Basic {}", token)
        });

        let conn = Connection {
            agent,
            db_url: format!("{}/{}", config.base_url(), encode_segment(&config.database)),
            authorization,
        };
        let store = Self { conn };

        if config.create_db_if_absent {
            store.create_database().await?;
        }

        info!(url = %store.conn.db_url, "connected to couchdb");
        Ok(store)
    }

    async fn create_database(&self) -> Result<()> {
        self.call(|conn| {
            let response = conn
                .authorize(conn.agent.put(&conn.db_url))
                .send_empty()
                .map_err(transport)?;
            let (status, body) = read_body(response)?;
            match status {
                201 | 202 => {
                    info!(url = %conn.db_url, "created database");
                    Ok(())
                }
                412 => Ok(()),
                _ => Err(store_error(status, &body)),
            }
        })
        .await
    }

    async fn call<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || f(&conn))
            .await
            .map_err(|e| Error::Transport(format!("request task failed: {}", e)))?
    }

    async fn put_document(&self, doc: &Document) -> Result<Revision> {
        let id = doc.id.clone();
        let body = serde_json::to_vec(doc)?;
        self.call(move |conn| {
            let response = conn
                .authorize(conn.agent.put(&conn.doc_url(&id)))
                .header("Content-Type", "application/json")
                .send(&body[..])
                .map_err(transport)?;
            let (status, body) = read_body(response)?;
            match status {
                201 | 202 => Ok(serde_json::from_str::<WriteResponse>(&body)?.rev),
                404 => Err(Error::NotFound { id }),
                409 => Err(Error::Conflict { id }),
                _ => Err(store_error(status, &body)),
            }
        })
        .await
    }
}

#[derive(Deserialize)]
struct WriteResponse {
    rev: Revision,
}

#[derive(Serialize)]
struct BulkRequest<'a> {
    docs: &'a [Document],
}

#[derive(Deserialize)]
struct AllDocsResponse {
    rows: Vec<AllDocsRow>,
}

#[derive(Deserialize)]
struct AllDocsRow {
    id: String,
    value: RowValue,
    #[serde(default)]
    doc: Option<Document>,
}

#[derive(Deserialize)]
struct RowValue {
    rev: Revision,
}

#[derive(Deserialize, Default)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    reason: String,
}

#[async_trait]
impl DocumentStore for CouchStore {
    async fn get(&self, id: &str, consistency: ReadConsistency) -> Result<Option<Document>> {
        let id = id.to_string();
        self.call(move |conn| {
            let mut request = conn.authorize(conn.agent.get(&conn.doc_url(&id)));
            if consistency == ReadConsistency::Stale {
                request = request.query("stale", "ok");
            }
            let (status, body) = read_body(request.call().map_err(transport)?)?;
            match status {
                200 => Ok(Some(serde_json::from_str(&body)?)),
                404 => Ok(None),
                _ => Err(store_error(status, &body)),
            }
        })
        .await
    }

    async fn create(&self, doc: &Document) -> Result<Revision> {
        debug!(id = %doc.id, "create");
        let mut doc = doc.clone();
        doc.rev = None;
        self.put_document(&doc).await
    }

    async fn update(&self, doc: &Document) -> Result<Revision> {
        debug!(id = %doc.id, rev = ?doc.rev, "update");
        self.put_document(doc).await
    }

    async fn remove(&self, id: &str, rev: &Revision) -> Result<()> {
        debug!(id, %rev, "remove");
        let id = id.to_string();
        let rev = rev.clone();
        self.call(move |conn| {
            let response = conn
                .authorize(conn.agent.delete(&conn.doc_url(&id)))
                .query("rev", rev.as_str())
                .call()
                .map_err(transport)?;
            let (status, body) = read_body(response)?;
            match status {
                200 | 202 => Ok(()),
                404 => Err(Error::NotFound { id }),
                409 => Err(Error::Conflict { id }),
                _ => Err(store_error(status, &body)),
            }
        })
        .await
    }

    async fn bulk(&self, docs: &[Document], full_commit: bool) -> Result<Vec<BulkOutcome>> {
        debug!(count = docs.len(), full_commit, "bulk write");
        let body = serde_json::to_vec(&BulkRequest { docs })?;
        self.call(move |conn| {
            let response = conn
                .authorize(conn.agent.post(&format!("{}/_bulk_docs", conn.db_url)))
                .header("Content-Type", "application/json")
                .header("X-Couch-Full-Commit", if full_commit { "true" } else { "false" })
                .send(&body[..])
                .map_err(transport)?;
            let (status, body) = read_body(response)?;
            match status {
                200..=202 => Ok(serde_json::from_str(&body)?),
                _ => Err(store_error(status, &body)),
            }
        })
        .await
    }

    async fn all_docs(
        &self,
        start_id: &str,
        limit: usize,
        include_docs: bool,
    ) -> Result<Vec<Document>> {
        // start_key is JSON, so the id goes out quoted and escaped.
        let start_key = serde_json::to_string(start_id)?;
        self.call(move |conn| {
            let response = conn
                .authorize(conn.agent.get(&format!("{}/_all_docs", conn.db_url)))
                .query("start_key", &start_key)
                .query("limit", limit.to_string())
                .query("include_docs", include_docs.to_string())
                .call()
                .map_err(transport)?;
            let (status, body) = read_body(response)?;
            if status != 200 {
                return Err(store_error(status, &body));
            }

            let parsed: AllDocsResponse = serde_json::from_str(&body)?;
            Ok(parsed
                .rows
                .into_iter()
                .map(|row| match row.doc {
                    Some(doc) => doc,
                    None => Document {
                        rev: Some(row.value.rev),
                        ..Document::new(row.id)
                    },
                })
                .collect())
        })
        .await
    }
}

fn read_body(mut response: Response<Body>) -> Result<(u16, String)> {
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .with_config()
        .limit(MAX_RESPONSE_BYTES)
        .read_to_string()
        .map_err(transport)?;
    Ok((status, body))
}

fn transport(err: ureq::Error) -> Error {
    Error::Transport(err.to_string())
}

fn store_error(status: u16, body: &str) -> Error {
    let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or_default();
    Error::Store {
        status,
        error: parsed.error,
        reason: parsed.reason,
    }
}

/// Percent-encode one path segment. Document ids may contain `/`.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
