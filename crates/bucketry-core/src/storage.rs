//! Storage backend abstraction for object storage.
//!
//! The pipeline only needs two operations: whole-object reads (manifest,
//! checksum, data files) and one unconditional write (the report, when its
//! destination is remote). The trait keeps that surface minimal so tests
//! can run against an in-memory backend.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;

use crate::error::{Error, Result};

/// A bucket + key pair parsed from an `s3://bucket/key` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    /// Bucket name.
    pub bucket: String,
    /// Object key, possibly empty or a prefix ending in `/`.
    pub key: String,
}

impl S3Location {
    /// Parses an `s3://bucket/key` URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the URL is missing the `s3://`
    /// scheme, the bucket name, or the bucket/key separator.
    pub fn parse(location: &str) -> Result<Self> {
        let rest = location.strip_prefix("s3://").ok_or_else(|| {
            Error::InvalidInput(format!(
                "expected s3://<bucket>/<key> location, got {location}"
            ))
        })?;
        let (bucket, key) = rest.split_once('/').ok_or_else(|| {
            Error::InvalidInput(format!(
                "expected s3://<bucket>/<key> location, got {location}"
            ))
        })?;
        if bucket.is_empty() {
            return Err(Error::InvalidInput(format!(
                "missing bucket name in location {location}"
            )));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Storage backend trait for object storage.
///
/// All paths are addressed as bucket + key; the manifest and the data
/// files it references may live in different buckets.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Reads an entire object.
    ///
    /// Returns `Error::NotFound` if the object doesn't exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;

    /// Writes an object unconditionally.
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()>;
}

/// In-memory storage backend for testing.
///
/// Thread-safe via `RwLock`. Not suitable for production.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<(String, String), Bytes>>,
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })?;

        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("s3://{bucket}/{key}")))
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }
}

/// S3 storage backend over `object_store`.
///
/// Client configuration (region, credentials, endpoint) comes from the
/// standard AWS environment variables. Stores are built lazily, one per
/// bucket, and reused for the remainder of the run.
#[derive(Default)]
pub struct S3Backend {
    stores: RwLock<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl S3Backend {
    /// Creates a new S3 backend configured from the environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn store_for(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        {
            let stores = self.stores.read().map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?;
            if let Some(store) = stores.get(bucket) {
                return Ok(Arc::clone(store));
            }
        }

        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| {
                Error::transport_with_source(
                    format!("failed to configure storage client for bucket {bucket}"),
                    e,
                )
            })?;
        let store: Arc<dyn ObjectStore> = Arc::new(store);

        self.stores
            .write()
            .map_err(|_| Error::Internal {
                message: "lock poisoned".into(),
            })?
            .insert(bucket.to_string(), Arc::clone(&store));

        Ok(store)
    }
}

impl fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Backend").finish_non_exhaustive()
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let store = self.store_for(bucket)?;
        let path = ObjectPath::from(key);

        let result = store.get(&path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => {
                Error::NotFound(format!("s3://{bucket}/{key}"))
            }
            other => {
                Error::transport_with_source(format!("failed to read s3://{bucket}/{key}"), other)
            }
        })?;

        result.bytes().await.map_err(|e| {
            Error::transport_with_source(format!("failed to read s3://{bucket}/{key}"), e)
        })
    }

    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        let store = self.store_for(bucket)?;
        store
            .put(&ObjectPath::from(key), data.into())
            .await
            .map_err(|e| {
                Error::transport_with_source(format!("failed to write s3://{bucket}/{key}"), e)
            })?;
        Ok(())
    }
}
