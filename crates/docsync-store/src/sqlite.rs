//! SQLite implementation of the Storage trait.
//!
//! Uses rusqlite with bundled SQLite, wrapped in async via
//! `tokio::task::spawn_blocking`. Bodies are stored CBOR-encoded.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use docsync_core::{ensure_object, Body};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::query::apply_query;
use crate::traits::{AttachmentInfo, Capability, QueryOptions, QueryRow, Storage};

/// SQLite-based storage.
///
/// Thread-safe via internal Mutex. All operations run on the blocking pool.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open a SQLite database at the given path, creating and migrating it
    /// as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Backend(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("spawn_blocking failed: {}", e)))?
    }
}

fn encode_body(body: &Body) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(body, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_body(bytes: &[u8]) -> Result<Body> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::InvalidData(e.to_string()))
}

fn document_exists(conn: &Connection, id: &str) -> Result<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM documents WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?
        .is_some())
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get(&self, id: &str) -> Result<Body> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let body: Option<Vec<u8>> = conn
                .query_row("SELECT body FROM documents WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })
                .optional()?;
            match body {
                Some(bytes) => decode_body(&bytes),
                None => Err(StoreError::NotFound(id)),
            }
        })
        .await
    }

    async fn put(&self, id: &str, body: Body) -> Result<String> {
        ensure_object(&body)?;
        let encoded = encode_body(&body)?;
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO documents (id, body, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
                params![id, encoded, now_millis()],
            )?;
            debug!(id = %id, "put document");
            Ok(id)
        })
        .await
    }

    async fn remove(&self, id: &str) -> Result<String> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM attachments WHERE doc_id = ?1", params![id])?;
            let removed = tx.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
            if removed == 0 {
                return Err(StoreError::NotFound(id));
            }
            tx.commit()?;
            debug!(id = %id, "removed document");
            Ok(id)
        })
        .await
    }

    async fn get_attachment(&self, id: &str, name: &str) -> Result<Bytes> {
        let (id, name) = (id.to_string(), name.to_string());
        self.with_conn(move |conn| {
            let data: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT data FROM attachments WHERE doc_id = ?1 AND name = ?2",
                    params![id, name],
                    |row| row.get(0),
                )
                .optional()?;
            data.map(Bytes::from)
                .ok_or(StoreError::AttachmentNotFound { id, name })
        })
        .await
    }

    async fn put_attachment(&self, id: &str, name: &str, data: Bytes) -> Result<()> {
        let (id, name) = (id.to_string(), name.to_string());
        self.with_conn(move |conn| {
            if !document_exists(conn, &id)? {
                return Err(StoreError::NotFound(id));
            }
            conn.execute(
                "INSERT INTO attachments (doc_id, name, data, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(doc_id, name) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                params![id, name, data.as_ref(), now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove_attachment(&self, id: &str, name: &str) -> Result<()> {
        let (id, name) = (id.to_string(), name.to_string());
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM attachments WHERE doc_id = ?1 AND name = ?2",
                params![id, name],
            )?;
            if removed == 0 {
                return Err(StoreError::AttachmentNotFound { id, name });
            }
            Ok(())
        })
        .await
    }

    async fn all_attachments(&self, id: &str) -> Result<BTreeMap<String, AttachmentInfo>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            if !document_exists(conn, &id)? {
                return Err(StoreError::NotFound(id));
            }
            let mut stmt = conn.prepare(
                "SELECT name, LENGTH(data) FROM attachments WHERE doc_id = ?1 ORDER BY name",
            )?;
            let rows = stmt.query_map(params![id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            let mut out = BTreeMap::new();
            for row in rows {
                let (name, length) = row?;
                out.insert(
                    name,
                    AttachmentInfo {
                        length: length as u64,
                    },
                );
            }
            Ok(out)
        })
        .await
    }

    fn has_capacity(&self, capability: Capability) -> bool {
        matches!(
            capability,
            Capability::List
                | Capability::Include
                | Capability::Select
                | Capability::Sort
                | Capability::Limit
        )
    }

    async fn build_query(&self, options: &QueryOptions) -> Result<Vec<QueryRow>> {
        if options.query.is_some() {
            return Err(StoreError::NotImplemented(Capability::Query));
        }
        let docs = self
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT id, body FROM documents ORDER BY id")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?;
                let mut docs = Vec::new();
                for row in rows {
                    let (id, bytes) = row?;
                    docs.push((id, decode_body(&bytes)?));
                }
                Ok(docs)
            })
            .await?;
        Ok(apply_query(docs, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{SortKey, SortOrder};
    use serde_json::json;

    #[tokio::test]
    async fn test_put_and_get() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage
            .put("doc", json!({"title": "foo", "n": [1, 2, {"x": null}]}))
            .await
            .unwrap();
        let body = storage.get("doc").await.unwrap();
        assert_eq!(body, json!({"title": "foo", "n": [1, 2, {"x": null}]}));
    }

    #[tokio::test]
    async fn test_missing_document() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert!(matches!(
            storage.get("nope").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            storage.remove("nope").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_attachments_and_cascade() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage.put("doc", json!({})).await.unwrap();
        storage
            .put_attachment("doc", "a", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        storage
            .put_attachment("doc", "a", Bytes::from_static(b"hello!"))
            .await
            .unwrap();

        let list = storage.all_attachments("doc").await.unwrap();
        assert_eq!(list.get("a"), Some(&AttachmentInfo { length: 6 }));

        storage.remove("doc").await.unwrap();
        storage.put("doc", json!({})).await.unwrap();
        assert!(storage.all_attachments("doc").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_attachment_requires_document() {
        let storage = SqliteStorage::open_memory().unwrap();
        let err = storage
            .put_attachment("nope", "a", Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_build_query_sorted() {
        let storage = SqliteStorage::open_memory().unwrap();
        storage.put("1", json!({"title": "a"})).await.unwrap();
        storage.put("2", json!({"title": "b"})).await.unwrap();

        let rows = storage
            .build_query(&QueryOptions {
                sort_on: vec![SortKey("title".into(), SortOrder::Descending)],
                ..QueryOptions::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.db");
        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.put("doc", json!({"v": 1})).await.unwrap();
            storage
                .put_attachment("doc", "a", Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(storage.get("doc").await.unwrap(), json!({"v": 1}));
        assert_eq!(
            storage.get_attachment("doc", "a").await.unwrap(),
            Bytes::from_static(b"x")
        );
    }
}
