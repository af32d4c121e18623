//! Inventory manifest loading and verification.
//!
//! A manifest is a JSON descriptor listing the inventory's constituent
//! data files, their MD5 digests, and the container format they share.
//! It ships with a companion `manifest.checksum` object holding the hex
//! digest of the JSON bytes; the manifest is only parsed after that
//! digest checks out, because no partial manifest is usable.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::info;

use crate::checksum;
use crate::error::{Error, Result};
use crate::storage::{S3Location, StorageBackend};

/// Container format of the inventory data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryFormat {
    /// Apache Parquet, decoded in streaming batches.
    Parquet,
    /// Apache ORC.
    Orc,
    /// Gzip-compressed headerless CSV.
    Csv,
}

impl FromStr for InventoryFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Parquet" => Ok(Self::Parquet),
            "ORC" => Ok(Self::Orc),
            "CSV" => Ok(Self::Csv),
            other => Err(Error::Format(format!(
                "unsupported inventory format '{other}' (supported: Parquet, ORC, CSV)"
            ))),
        }
    }
}

impl fmt::Display for InventoryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parquet => write!(f, "Parquet"),
            Self::Orc => write!(f, "ORC"),
            Self::Csv => write!(f, "CSV"),
        }
    }
}

/// Reference to one constituent inventory data file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    /// Object key of the data file in the destination bucket.
    pub key: String,
    /// Expected MD5 hex digest of the raw file bytes.
    #[serde(rename = "MD5checksum")]
    pub checksum: String,
}

/// An inventory manifest, immutable once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Destination bucket identifier; colon-delimited (ARN form), with
    /// the bucket name as the final segment.
    #[serde(rename = "destinationBucket")]
    pub destination_bucket: String,
    /// Declared container format tag for every data file.
    #[serde(rename = "fileFormat")]
    pub file_format: String,
    /// Data files in manifest order; processing follows this order.
    pub files: Vec<FileRef>,
}

impl Manifest {
    /// Returns the bare bucket name from the colon-delimited
    /// destination identifier.
    #[must_use]
    pub fn destination_bucket_name(&self) -> &str {
        self.destination_bucket
            .rsplit(':')
            .next()
            .unwrap_or(&self.destination_bucket)
    }

    /// Parses the declared format tag.
    ///
    /// # Errors
    ///
    /// Returns `Error::Format` for an unsupported tag; this is fatal for
    /// the run, no partial decode is attempted.
    pub fn format(&self) -> Result<InventoryFormat> {
        self.file_format.parse()
    }
}

/// Loads and verifies an inventory manifest.
///
/// `location` is either a bucket + prefix containing `manifest.json` and
/// `manifest.checksum`, or a direct path to `manifest.json` (normalized by
/// stripping the filename). The only side effects are the two reads.
///
/// # Errors
///
/// Returns `Error::Transport`/`Error::NotFound` if either object cannot be
/// fetched, `Error::Integrity` if the JSON bytes do not match the checksum
/// (the whole run aborts; no partial manifest is usable), and
/// `Error::Schema` if required fields are missing or the JSON is invalid.
pub async fn load_manifest(backend: &dyn StorageBackend, location: &str) -> Result<Manifest> {
    let location = normalize_location(location);
    let source = S3Location::parse(&location)?;

    let json_key = format!("{}manifest.json", source.key);
    let checksum_key = format!("{}manifest.checksum", source.key);

    info!(bucket = %source.bucket, prefix = %source.key, "loading inventory manifest");

    let manifest_json = backend.get(&source.bucket, &json_key).await?;
    let manifest_checksum = backend.get(&source.bucket, &checksum_key).await?;

    let expected = String::from_utf8_lossy(&manifest_checksum);
    if !checksum::verify(&manifest_json, &expected) {
        return Err(Error::Integrity {
            location: format!("s3://{}/{json_key}", source.bucket),
            expected: expected.trim_end().to_string(),
            computed: checksum::hex_digest(&manifest_json),
        });
    }

    let manifest: Manifest = serde_json::from_slice(&manifest_json)
        .map_err(|e| Error::Schema(format!("invalid inventory manifest: {e}")))?;

    Ok(manifest)
}

/// Normalizes a manifest location to a folder prefix ending in `/`.
fn normalize_location(location: &str) -> String {
    let trimmed = location.strip_suffix("manifest.json").unwrap_or(location);
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}
