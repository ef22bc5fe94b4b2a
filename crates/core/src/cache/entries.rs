//! Cached response entries.
//!
//! Entries are keyed by request (method + URL) within a bucket. Writes use
//! UPSERT semantics, so a later write for the same request wins.

use bytes::Bytes;
use url::Url;

use super::buckets::BucketName;
use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use crate::http::Response;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A response stored under the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub method: String,
    /// Request URL the entry is keyed by.
    pub url: String,
    pub response: Response,
}

impl CachedEntry {
    pub fn new(method: &str, url: &str, response: Response) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.to_string(), response }
    }

    /// Entry for a GET of `url`.
    pub fn get(url: &str, response: Response) -> Self {
        Self::new("GET", url, response)
    }

    pub fn key_hash(&self) -> String {
        compute_cache_key(&self.method, &self.url)
    }
}

/// Write one entry inside an open connection or transaction.
pub(crate) fn insert_entry(conn: &rusqlite::Connection, bucket: BucketName, entry: &CachedEntry) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&entry.response.headers)?;
    conn.execute(
        "INSERT INTO entries (
            class, generation, key_hash, url, status, final_url, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(class, generation, key_hash) DO UPDATE SET
            url = excluded.url,
            status = excluded.status,
            final_url = excluded.final_url,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            bucket.class.as_str(),
            bucket.generation.0,
            entry.key_hash(),
            &entry.url,
            entry.response.status,
            entry.response.url.as_str(),
            headers_json,
            entry.response.body.as_ref(),
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store an entry, creating the bucket if needed.
    pub async fn put_entry(&self, bucket: BucketName, entry: CachedEntry) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.unchecked_transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO buckets (class, generation, created_at) VALUES (?1, ?2, ?3)",
                    params![bucket.class.as_str(), bucket.generation.0, chrono::Utc::now().to_rfc3339()],
                )?;
                insert_entry(&tx, bucket, &entry)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request in a single bucket.
    pub async fn match_entry(&self, bucket: BucketName, method: &str, url: &str) -> Result<Option<Response>, Error> {
        self.match_any(&[bucket], method, url).await
    }

    /// Look up a request in the given buckets, first hit in order wins.
    pub async fn match_any(&self, buckets: &[BucketName], method: &str, url: &str) -> Result<Option<Response>, Error> {
        let key_hash = compute_cache_key(method, url);
        let buckets = buckets.to_vec();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status, final_url, headers_json, body FROM entries
                    WHERE class = ?1 AND generation = ?2 AND key_hash = ?3",
                )?;

                for bucket in buckets {
                    let result = stmt.query_row(params![bucket.class.as_str(), bucket.generation.0, &key_hash], |row| {
                        Ok((
                            row.get::<_, u16>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, Vec<u8>>(3)?,
                        ))
                    });

                    match result {
                        Ok((status, final_url, headers_json, body)) => {
                            let url = Url::parse(&final_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
                            let headers = serde_json::from_str(&headers_json)?;
                            return Ok(Some(Response::new(status, url, headers, Bytes::from(body))));
                        }
                        Err(rusqlite::Error::QueryReturnedNoRows) => continue,
                        Err(e) => return Err(e.into()),
                    }
                }

                Ok(None)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a bucket.
    pub async fn entry_count(&self, bucket: BucketName) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE class = ?1 AND generation = ?2",
                    params![bucket.class.as_str(), bucket.generation.0],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
