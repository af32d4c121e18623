//! Incremental folder aggregation of decoded inventory batches.
//!
//! Every record contributes to every ancestor prefix up to the effective
//! depth, not just its immediate parent, which is what makes folder totals
//! cumulative: a top-level folder's size includes all of its descendants.
//! The prefix chain is produced by a single forward scan over the key, so
//! the per-record cost is O(key length) regardless of depth.

use indexmap::IndexMap;

use arrow::array::Array as _;
use arrow::record_batch::RecordBatch;

use crate::decode::{col_bool, col_size, col_string};
use crate::error::Result;
use crate::report::{Report, ReportRow};

/// Root sentinel entry present in every report.
pub const ROOT_FOLDER: &str = "/";

/// Running statistics for one folder prefix.
///
/// Created lazily on first encounter and mutated monotonically (fields
/// only increase) for the remainder of the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderStats {
    /// Number of records whose truncated-prefix chain includes this entry.
    pub count: u64,
    /// Total size of those records.
    pub total_size: u64,
    /// Size contributed by delete-marker records.
    pub deleted_size: u64,
    /// Size contributed by records that are not the latest version.
    pub noncurrent_size: u64,
    /// Number of separators in this entry's prefix (0 for the root).
    pub depth: u32,
}

impl FolderStats {
    fn at_depth(depth: u32) -> Self {
        Self {
            depth,
            ..Self::default()
        }
    }
}

/// Mutable aggregation state: folder prefix → running statistics.
///
/// Entries keep first-seen order, with the root sentinel inserted first.
/// `max_depth` caps the number of distinct entries created by capping the
/// effective depth per key; records below the cap are absorbed by the
/// deepest retained level, never discarded. An unset `max_depth` bounds
/// memory only by the depth diversity of the input, which is a
/// caller-accepted risk.
#[derive(Debug)]
pub struct FolderTally {
    folders: IndexMap<String, FolderStats>,
    max_depth: Option<u32>,
}

impl FolderTally {
    /// Creates an empty tally containing only the root sentinel.
    #[must_use]
    pub fn new(max_depth: Option<u32>) -> Self {
        let mut folders = IndexMap::new();
        folders.insert(ROOT_FOLDER.to_string(), FolderStats::at_depth(0));
        Self { folders, max_depth }
    }

    /// Consumes one decoded batch, updating the mapping in place.
    ///
    /// Returns the number of records processed, for progress accounting.
    ///
    /// # Errors
    ///
    /// Returns `Error::Format` if the batch does not expose the four
    /// needed columns with the expected types.
    pub fn aggregate(&mut self, batch: &RecordBatch) -> Result<u64> {
        let keys = col_string(batch, "key")?;
        let latest = col_bool(batch, "is_latest")?;
        let delete = col_bool(batch, "is_delete_marker")?;
        let sizes = col_size(batch, "size")?;

        for row in 0..batch.num_rows() {
            let key = if keys.is_null(row) { "" } else { keys.value(row) };
            let size = sizes.value_or_zero(row);
            let is_latest = !latest.is_null(row) && latest.value(row);
            let is_delete = !delete.is_null(row) && delete.value(row);

            let natural_depth =
                u32::try_from(key.bytes().filter(|&b| b == b'/').count()).unwrap_or(u32::MAX);
            let effective_depth = self
                .max_depth
                .map_or(natural_depth, |cap| natural_depth.min(cap));

            self.bump(ROOT_FOLDER, 0, size, is_latest, is_delete);

            // One forward pass over the key; each iteration extends the
            // prefix to just past the next separator.
            let mut trim_base = 0usize;
            for depth in 1..=effective_depth {
                let Some(offset) = key[trim_base..].find('/') else {
                    break;
                };
                trim_base += offset + 1;
                self.bump(&key[..trim_base], depth, size, is_latest, is_delete);
            }
        }

        Ok(batch.num_rows() as u64)
    }

    fn bump(&mut self, entry: &str, depth: u32, size: u64, is_latest: bool, is_delete: bool) {
        if !self.folders.contains_key(entry) {
            self.folders
                .insert(entry.to_string(), FolderStats::at_depth(depth));
        }
        if let Some(stats) = self.folders.get_mut(entry) {
            stats.count += 1;
            stats.total_size += size;
            if !is_latest {
                stats.noncurrent_size += size;
            }
            if is_delete {
                stats.deleted_size += size;
            }
        }
    }

    /// Returns the statistics for a folder prefix, if present.
    #[must_use]
    pub fn get(&self, folder: &str) -> Option<&FolderStats> {
        self.folders.get(folder)
    }

    /// Number of folder entries, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// True when only the untouched root sentinel exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.len() == 1 && self.folders[ROOT_FOLDER].count == 0
    }

    /// Finalizes the tally into a read-only report.
    ///
    /// Derives the average object size per entry. Entries other than the
    /// root cannot have a zero count, because an entry is only created in
    /// the same step that increments it.
    #[must_use]
    pub fn finalize(self) -> Report {
        let rows = self
            .folders
            .into_iter()
            .map(|(folder, stats)| {
                ReportRow {
                    folder,
                    count: stats.count,
                    total_size: stats.total_size,
                    deleted_size: stats.deleted_size,
                    noncurrent_size: stats.noncurrent_size,
                    avg_object_size: average_size(stats.total_size, stats.count),
                    depth: stats.depth,
                }
            })
            .collect();
        Report::new(rows)
    }
}

/// `round(total / count)`; zero for the untouched root of an empty input.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn average_size(total: u64, count: u64) -> u64 {
    if count == 0 {
        0
    } else {
        (total as f64 / count as f64).round() as u64
    }
}
