//! Cache buckets and generation tracking.
//!
//! A bucket is identified by its class and the generation that created it.
//! The storage also keeps a single "current generation" pointer which the
//! worker moves on activation.

use std::fmt;
use std::str::FromStr;

use super::connection::CacheDb;
use super::entries::{CachedEntry, insert_entry};
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// One install/activate cycle of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u32);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The three kinds of bucket a generation owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketClass {
    /// App shell, filled at install time.
    Static,
    /// Patch pages and assets, filled on first successful fetch.
    Dynamic,
    /// Stylesheets.
    Css,
}

impl BucketClass {
    pub const ALL: [BucketClass; 3] = [BucketClass::Static, BucketClass::Dynamic, BucketClass::Css];

    pub fn as_str(&self) -> &'static str {
        match self {
            BucketClass::Static => "static",
            BucketClass::Dynamic => "dynamic",
            BucketClass::Css => "css",
        }
    }
}

impl FromStr for BucketClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(BucketClass::Static),
            "dynamic" => Ok(BucketClass::Dynamic),
            "css" => Ok(BucketClass::Css),
            other => Err(Error::InvalidInput(format!("unknown bucket class: {other}"))),
        }
    }
}

/// Name of a bucket: class plus generation, rendered as `static-v1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketName {
    pub class: BucketClass,
    pub generation: Generation,
}

impl BucketName {
    pub fn new(class: BucketClass, generation: Generation) -> Self {
        Self { class, generation }
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.class.as_str(), self.generation)
    }
}

/// The three bucket names belonging to one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSet {
    pub generation: Generation,
}

impl BucketSet {
    pub fn new(generation: Generation) -> Self {
        Self { generation }
    }

    pub fn static_bucket(&self) -> BucketName {
        BucketName::new(BucketClass::Static, self.generation)
    }

    pub fn dynamic_bucket(&self) -> BucketName {
        BucketName::new(BucketClass::Dynamic, self.generation)
    }

    pub fn css_bucket(&self) -> BucketName {
        BucketName::new(BucketClass::Css, self.generation)
    }
}

impl CacheDb {
    /// Create the bucket if it doesn't exist yet.
    pub async fn open_bucket(&self, name: BucketName) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO buckets (class, generation, created_at) VALUES (?1, ?2, ?3)",
                    params![name.class.as_str(), name.generation.0, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Whether the bucket exists.
    pub async fn has_bucket(&self, name: BucketName) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM buckets WHERE class = ?1 AND generation = ?2)",
                    params![name.class.as_str(), name.generation.0],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// List every bucket, ordered by generation then class.
    pub async fn bucket_keys(&self) -> Result<Vec<BucketName>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<BucketName>, Error> {
                let mut stmt = conn.prepare("SELECT class, generation FROM buckets ORDER BY generation, class")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?)))?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;

                rows.into_iter()
                    .map(|(class, generation)| Ok(BucketName::new(class.parse()?, Generation(generation))))
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket and all its entries.
    ///
    /// Returns true if the bucket existed.
    pub async fn delete_bucket(&self, name: BucketName) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM buckets WHERE class = ?1 AND generation = ?2",
                    params![name.class.as_str(), name.generation.0],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every bucket of every generation.
    ///
    /// Returns the number of deleted buckets.
    pub async fn delete_all_buckets(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM buckets", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every bucket that does not belong to `keep`.
    ///
    /// Returns the names of the deleted buckets.
    pub async fn delete_buckets_except(&self, keep: Generation) -> Result<Vec<BucketName>, Error> {
        let stale: Vec<BucketName> = self
            .bucket_keys()
            .await?
            .into_iter()
            .filter(|name| name.generation != keep)
            .collect();

        for name in &stale {
            tracing::info!(bucket = %name, "clearing old cache bucket");
            self.delete_bucket(*name).await?;
        }

        Ok(stale)
    }

    /// Create `name` and store all `entries` in a single transaction.
    ///
    /// Nothing becomes visible unless every entry was written.
    pub async fn install_bucket(&self, name: BucketName, entries: Vec<CachedEntry>) -> Result<usize, Error> {
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.unchecked_transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO buckets (class, generation, created_at) VALUES (?1, ?2, ?3)",
                    params![name.class.as_str(), name.generation.0, chrono::Utc::now().to_rfc3339()],
                )?;
                for entry in &entries {
                    insert_entry(&tx, name, entry)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// The generation recorded by the last activation, if any.
    pub async fn current_generation(&self) -> Result<Option<Generation>, Error> {
        self.conn
            .call(|conn| -> Result<Option<Generation>, Error> {
                let result = conn.query_row("SELECT current_generation FROM worker_state WHERE id = 1", [], |row| {
                    row.get::<_, u32>(0)
                });

                match result {
                    Ok(g) => Ok(Some(Generation(g))),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Move the current generation pointer.
    pub async fn set_current_generation(&self, generation: Generation) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO worker_state (id, current_generation, activated_at) VALUES (1, ?1, ?2)
                    ON CONFLICT(id) DO UPDATE SET
                        current_generation = excluded.current_generation,
                        activated_at = excluded.activated_at",
                    params![generation.0, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entries::tests::make_entry;

    #[test]
    fn test_bucket_name_display() {
        let set = BucketSet::new(Generation(3));
        assert_eq!(set.static_bucket().to_string(), "static-v3");
        assert_eq!(set.dynamic_bucket().to_string(), "dynamic-v3");
        assert_eq!(set.css_bucket().to_string(), "css-v3");
    }

    #[test]
    fn test_bucket_class_parse() {
        assert_eq!("css".parse::<BucketClass>().unwrap(), BucketClass::Css);
        assert!("shell".parse::<BucketClass>().is_err());
    }

    #[tokio::test]
    async fn test_open_and_list() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let set = BucketSet::new(Generation(1));
        db.open_bucket(set.static_bucket()).await.unwrap();
        db.open_bucket(set.css_bucket()).await.unwrap();
        db.open_bucket(set.css_bucket()).await.unwrap();

        let keys = db.bucket_keys().await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&set.static_bucket()));
        assert!(keys.contains(&set.css_bucket()));
    }

    #[tokio::test]
    async fn test_delete_except_keeps_current_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = BucketSet::new(Generation(1));
        let new = BucketSet::new(Generation(2));
        for name in [old.static_bucket(), old.dynamic_bucket(), new.static_bucket(), new.css_bucket()] {
            db.open_bucket(name).await.unwrap();
        }

        let deleted = db.delete_buckets_except(Generation(2)).await.unwrap();
        assert_eq!(deleted.len(), 2);

        let keys = db.bucket_keys().await.unwrap();
        assert!(keys.iter().all(|k| k.generation == new.generation));
    }

    #[tokio::test]
    async fn test_delete_bucket_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let bucket = BucketSet::new(Generation(1)).dynamic_bucket();
        db.install_bucket(bucket, vec![make_entry("http://localhost/assets/a.png")])
            .await
            .unwrap();
        assert_eq!(db.entry_count(bucket).await.unwrap(), 1);

        assert!(db.delete_bucket(bucket).await.unwrap());
        assert!(!db.delete_bucket(bucket).await.unwrap());
        assert_eq!(db.entry_count(bucket).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_all_buckets() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let set = BucketSet::new(Generation(1));
        for class in BucketClass::ALL {
            db.open_bucket(BucketName::new(class, set.generation)).await.unwrap();
        }

        assert_eq!(db.delete_all_buckets().await.unwrap(), 3);
        assert!(db.bucket_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_pointer() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert_eq!(db.current_generation().await.unwrap(), None);

        db.set_current_generation(Generation(1)).await.unwrap();
        db.set_current_generation(Generation(4)).await.unwrap();
        assert_eq!(db.current_generation().await.unwrap(), Some(Generation(4)));
    }
}
