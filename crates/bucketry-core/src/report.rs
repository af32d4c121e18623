//! Finalized inventory reports and their output formats.
//!
//! A report is the read-only result of a completed run: one row per folder
//! prefix, in first-seen order with the root first. Two renderings exist,
//! a fixed-width console table and a CSV document; folder names are
//! percent-decoded in both (inventory keys arrive URL-encoded).

use std::borrow::Cow;
use std::fmt::Write as _;

use percent_encoding::percent_decode_str;

/// Byte unit used when rendering sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteUnit {
    /// Raw byte count.
    Bytes,
    /// Kibibytes.
    Kilo,
    /// Mebibytes.
    Mega,
    /// Gibibytes.
    Giga,
}

/// Renders a byte count with the chosen unit suffix.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(size: u64, unit: ByteUnit) -> String {
    match unit {
        ByteUnit::Bytes => format!("{size} Bytes"),
        ByteUnit::Kilo => format!("{:.3} KB", size as f64 / 1024.0),
        ByteUnit::Mega => format!("{:.3} MB", size as f64 / (1024.0 * 1024.0)),
        ByteUnit::Giga => format!("{:.3} GB", size as f64 / (1024.0 * 1024.0 * 1024.0)),
    }
}

/// One finalized folder entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// Folder prefix (root is `/`), as it appeared in the input keys.
    pub folder: String,
    /// Records aggregated into this entry.
    pub count: u64,
    /// Cumulative size of those records.
    pub total_size: u64,
    /// Size contributed by delete-marker records.
    pub deleted_size: u64,
    /// Size contributed by non-latest versions.
    pub noncurrent_size: u64,
    /// Derived `round(total_size / count)`.
    pub avg_object_size: u64,
    /// Separator count of the prefix.
    pub depth: u32,
}

/// A finalized, read-only inventory report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    rows: Vec<ReportRow>,
}

impl Report {
    /// Creates a report from finalized rows; row order is preserved.
    #[must_use]
    pub fn new(rows: Vec<ReportRow>) -> Self {
        Self { rows }
    }

    /// Finalized rows in first-seen order, root first.
    #[must_use]
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Renders the fixed-width console table.
    ///
    /// Sizes are shown in GB, averages in KB.
    #[must_use]
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>15} |{:>16} |{:>16} |{:>16} |{:>16} | Folder",
            "Count", "Total Size", "Ver Size", "Del Size", "Avg Object"
        );
        let _ = writeln!(out, "{}", "-".repeat(110));
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{:>15} |{:>16} |{:>16} |{:>16} |{:>16} | {}",
                row.count,
                format_bytes(row.total_size, ByteUnit::Giga),
                format_bytes(row.noncurrent_size, ByteUnit::Giga),
                format_bytes(row.deleted_size, ByteUnit::Giga),
                format_bytes(row.avg_object_size, ByteUnit::Kilo),
                decode_folder(&row.folder),
            );
        }
        out
    }

    /// Renders the CSV document, header included.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::from("Folder,Count,Size,DelSize,VerSize,AvgObject,Depth\n");
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{}",
                decode_folder(&row.folder),
                row.count,
                row.total_size,
                row.deleted_size,
                row.noncurrent_size,
                row.avg_object_size,
                row.depth,
            );
        }
        out
    }
}

/// Percent-decodes a folder prefix for display.
fn decode_folder(folder: &str) -> Cow<'_, str> {
    percent_decode_str(folder).decode_utf8_lossy()
}
