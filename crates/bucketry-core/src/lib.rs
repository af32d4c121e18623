//! # bucketry-core
//!
//! Core library for Bucketry, a folder-size reporter for cloud
//! object-storage inventories.
//!
//! An inventory is a manifest referencing one or more columnar data files
//! that enumerate every object in a bucket. This crate turns that input
//! into a cumulative per-folder report:
//!
//! - **Checksum**: digest verification of the manifest and every data file
//! - **Manifest**: verified loading of the inventory descriptor
//! - **Source**: data-file retrieval with an optional verified local cache
//! - **Decode**: Parquet / ORC / gzip-CSV decoding into uniform record
//!   batches, streamed to bound memory
//! - **Aggregate**: incremental folder-prefix aggregation with a depth cap
//! - **Report**: finalized rows plus table and CSV renderings
//! - **Pipeline**: the sequential driver tying the above together
//!
//! Aggregation is strictly sequential; only the progress reporter runs
//! concurrently, polling an atomic counter.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod aggregate;
pub mod checksum;
pub mod decode;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod source;
pub mod storage;

// Re-export key types at crate root for ergonomics
pub use aggregate::{FolderStats, FolderTally, ROOT_FOLDER};
pub use decode::{decode, BatchIter, NEEDED_COLUMNS};
pub use error::{Error, Result};
pub use manifest::{load_manifest, FileRef, InventoryFormat, Manifest};
pub use pipeline::{process_inventory, ProcessOptions};
pub use progress::{ProgressCounter, ProgressReporter};
pub use report::{format_bytes, ByteUnit, Report, ReportRow};
pub use source::DataSource;
pub use storage::{MemoryBackend, S3Backend, S3Location, StorageBackend};
