//! Columnar decoding of inventory data files.
//!
//! Three container formats funnel through one dispatch, each producing the
//! same shape: a lazy sequence of record batches exposing the four logical
//! columns `key`, `is_latest`, `is_delete_marker`, `size`. Parquet is read
//! in fixed-size batches rather than materialized whole, because inventory
//! files can run to gigabytes; ORC and CSV stream whatever batch sizes
//! their readers produce.
//!
//! The typed column accessors at the bottom are shared with the
//! aggregator, which walks the batches row by row.

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Array, BooleanArray, Int64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use flate2::read::GzDecoder;
use orc_rust::ArrowReaderBuilder;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;

use crate::error::{Error, Result};
use crate::manifest::InventoryFormat;

/// The four logical columns every decoded batch exposes.
pub const NEEDED_COLUMNS: [&str; 4] = ["key", "is_latest", "is_delete_marker", "size"];

/// Rows per decoded batch for the streaming readers.
const DECODE_BATCH_ROWS: usize = 64 * 1024;

/// A lazy sequence of decoded record batches.
pub type BatchIter = Box<dyn Iterator<Item = Result<RecordBatch>>>;

/// Decodes raw data-file bytes according to the declared format.
///
/// # Errors
///
/// Returns `Error::Format` if the reader cannot be constructed from the
/// bytes; individual batch pulls yield `Error::Format` on malformed
/// content. Either way the failure is fatal for the whole file, no
/// partial decode is attempted.
pub fn decode(format: InventoryFormat, data: Bytes) -> Result<BatchIter> {
    match format {
        InventoryFormat::Parquet => decode_parquet(data),
        InventoryFormat::Orc => decode_orc(data),
        InventoryFormat::Csv => decode_csv(data),
    }
}

fn decode_parquet(data: Bytes) -> Result<BatchIter> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)
        .map_err(|e| Error::Format(format!("parquet reader init failed: {e}")))?;

    let roots: Vec<usize> = builder
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| NEEDED_COLUMNS.contains(&field.name().as_str()))
        .map(|(index, _)| index)
        .collect();
    if roots.len() != NEEDED_COLUMNS.len() {
        return Err(Error::Format(format!(
            "inventory file does not expose the required columns {NEEDED_COLUMNS:?}"
        )));
    }
    let mask = ProjectionMask::roots(builder.parquet_schema(), roots);

    let reader = builder
        .with_batch_size(DECODE_BATCH_ROWS)
        .with_projection(mask)
        .build()
        .map_err(|e| Error::Format(format!("parquet reader build failed: {e}")))?;

    Ok(Box::new(reader.map(|batch| {
        batch.map_err(|e| Error::Format(format!("parquet decode failed: {e}")))
    })))
}

fn decode_orc(data: Bytes) -> Result<BatchIter> {
    let reader = ArrowReaderBuilder::try_new(data)
        .map_err(|e| Error::Format(format!("orc reader init failed: {e}")))?
        .with_batch_size(DECODE_BATCH_ROWS)
        .build();

    Ok(Box::new(reader.map(|batch| {
        batch
            .map_err(|e| Error::Format(format!("orc decode failed: {e}")))
            .and_then(|b| project_needed(&b))
    })))
}

fn decode_csv(data: Bytes) -> Result<BatchIter> {
    let reader = arrow::csv::ReaderBuilder::new(Arc::new(csv_schema()))
        .with_header(false)
        .with_batch_size(DECODE_BATCH_ROWS)
        .build(GzDecoder::new(Cursor::new(data)))
        .map_err(|e| Error::Format(format!("csv reader init failed: {e}")))?;

    Ok(Box::new(reader.map(|batch| {
        batch
            .map_err(|e| Error::Format(format!("csv decode failed: {e}")))
            .and_then(|b| project_needed(&b))
    })))
}

/// Fixed column-name schema applied to the headerless inventory CSV.
fn csv_schema() -> Schema {
    Schema::new(vec![
        Field::new("bucket", DataType::Utf8, true),
        Field::new("key", DataType::Utf8, true),
        Field::new("version_id", DataType::Utf8, true),
        Field::new("is_latest", DataType::Boolean, true),
        Field::new("is_delete_marker", DataType::Boolean, true),
        Field::new("size", DataType::Int64, true),
    ])
}

/// Narrows a batch to the four needed columns.
fn project_needed(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut indices = Vec::with_capacity(NEEDED_COLUMNS.len());
    for name in NEEDED_COLUMNS {
        indices.push(schema.index_of(name).map_err(|e| {
            Error::Format(format!("inventory file missing required column '{name}': {e}"))
        })?);
    }
    batch
        .project(&indices)
        .map_err(|e| Error::Format(format!("column projection failed: {e}")))
}

pub(crate) fn col_string<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    let index = batch
        .schema()
        .index_of(name)
        .map_err(|e| Error::Format(format!("missing column '{name}': {e}")))?;
    batch
        .column(index)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Format(format!("column '{name}' is not a string column")))
}

pub(crate) fn col_bool<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a BooleanArray> {
    let index = batch
        .schema()
        .index_of(name)
        .map_err(|e| Error::Format(format!("missing column '{name}': {e}")))?;
    batch
        .column(index)
        .as_any()
        .downcast_ref::<BooleanArray>()
        .ok_or_else(|| Error::Format(format!("column '{name}' is not a boolean column")))
}

/// Size column view; inventories write sizes as signed or unsigned 64-bit
/// depending on the producer.
pub(crate) enum SizeColumn<'a> {
    Int64(&'a Int64Array),
    UInt64(&'a UInt64Array),
}

impl SizeColumn<'_> {
    /// Size at `row`; null (and out-of-range negative) values are zero.
    pub(crate) fn value_or_zero(&self, row: usize) -> u64 {
        match self {
            Self::Int64(array) => {
                if array.is_null(row) {
                    0
                } else {
                    u64::try_from(array.value(row)).unwrap_or(0)
                }
            }
            Self::UInt64(array) => {
                if array.is_null(row) {
                    0
                } else {
                    array.value(row)
                }
            }
        }
    }
}

pub(crate) fn col_size<'a>(batch: &'a RecordBatch, name: &str) -> Result<SizeColumn<'a>> {
    let index = batch
        .schema()
        .index_of(name)
        .map_err(|e| Error::Format(format!("missing column '{name}': {e}")))?;
    let column = batch.column(index);
    if let Some(array) = column.as_any().downcast_ref::<Int64Array>() {
        return Ok(SizeColumn::Int64(array));
    }
    if let Some(array) = column.as_any().downcast_ref::<UInt64Array>() {
        return Ok(SizeColumn::UInt64(array));
    }
    Err(Error::Format(format!(
        "column '{name}' is not a 64-bit integer column"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use parquet::arrow::ArrowWriter;
    use std::io::Write;

    fn inventory_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("bucket", DataType::Utf8, false),
            Field::new("key", DataType::Utf8, false),
            Field::new("size", DataType::Int64, true),
            Field::new("is_latest", DataType::Boolean, false),
            Field::new("is_delete_marker", DataType::Boolean, false),
        ]))
    }

    fn parquet_fixture(rows: usize) -> Bytes {
        let schema = inventory_schema();
        let keys: Vec<String> = (0..rows).map(|i| format!("prefix/object-{i}")).collect();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["example-data"; rows])),
                Arc::new(StringArray::from(
                    keys.iter().map(String::as_str).collect::<Vec<_>>(),
                )),
                Arc::new(Int64Array::from(vec![Some(100_i64); rows])),
                Arc::new(BooleanArray::from(vec![true; rows])),
                Arc::new(BooleanArray::from(vec![false; rows])),
            ],
        )
        .expect("record batch should build");

        let mut cursor = Cursor::new(Vec::<u8>::new());
        let mut writer =
            ArrowWriter::try_new(&mut cursor, schema, None).expect("parquet writer init");
        writer.write(&batch).expect("parquet write");
        writer.close().expect("parquet close");
        Bytes::from(cursor.into_inner())
    }

    #[test]
    fn test_parquet_decode_projects_needed_columns() {
        let data = parquet_fixture(3);
        let batches: Vec<RecordBatch> = decode(InventoryFormat::Parquet, data)
            .expect("decode should succeed")
            .collect::<Result<_>>()
            .expect("batches should decode");

        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), NEEDED_COLUMNS.len());
        for name in NEEDED_COLUMNS {
            assert!(batch.schema().index_of(name).is_ok(), "missing {name}");
        }
        assert_eq!(col_string(batch, "key").expect("key").value(0), "prefix/object-0");
    }

    #[test]
    fn test_parquet_decode_is_batched() {
        // More rows than one decode batch; the reader must yield several
        let data = parquet_fixture(DECODE_BATCH_ROWS + 17);
        let batches: Vec<RecordBatch> = decode(InventoryFormat::Parquet, data)
            .expect("decode should succeed")
            .collect::<Result<_>>()
            .expect("batches should decode");

        assert!(batches.len() > 1, "expected multiple batches");
        let total: usize = batches.iter().map(RecordBatch::num_rows).sum();
        assert_eq!(total, DECODE_BATCH_ROWS + 17);
        assert!(batches.iter().all(|b| b.num_rows() <= DECODE_BATCH_ROWS));
    }

    #[test]
    fn test_csv_decode_applies_fixed_schema() {
        let csv = "\"example-data\",\"da/fa\",\"v1\",\"true\",\"false\",\"100\"\n\
                   \"example-data\",\"da/\",\"v1\",\"true\",\"false\",\"\"\n\
                   \"example-data\",\"fb\",\"v2\",\"false\",\"true\",\"50\"\n";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(csv.as_bytes()).expect("gzip write");
        let data = Bytes::from(encoder.finish().expect("gzip finish"));

        let batches: Vec<RecordBatch> = decode(InventoryFormat::Csv, data)
            .expect("decode should succeed")
            .collect::<Result<_>>()
            .expect("batches should decode");

        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), NEEDED_COLUMNS.len());

        let keys = col_string(batch, "key").expect("key column");
        assert_eq!(keys.value(0), "da/fa");
        assert_eq!(keys.value(1), "da/");

        let sizes = col_size(batch, "size").expect("size column");
        assert_eq!(sizes.value_or_zero(0), 100);
        // Empty size field decodes as null and is treated as zero
        assert_eq!(sizes.value_or_zero(1), 0);

        let latest = col_bool(batch, "is_latest").expect("is_latest column");
        assert!(latest.value(0));
        assert!(!latest.value(2));
    }

    #[test]
    fn test_csv_decode_rejects_plain_text() {
        // Not gzip-compressed; the reader construction or first pull fails
        let data = Bytes::from_static(b"\"b\",\"k\",\"v\",\"true\",\"false\",\"1\"\n");
        let result = decode(InventoryFormat::Csv, data)
            .and_then(|mut iter| iter.next().transpose());
        assert!(result.is_err());
    }

    #[test]
    fn test_parquet_decode_rejects_garbage() {
        let data = Bytes::from_static(b"this is not a parquet file");
        assert!(matches!(
            decode(InventoryFormat::Parquet, data),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_orc_decode_rejects_garbage() {
        let data = Bytes::from_static(b"this is not an orc file");
        let result = decode(InventoryFormat::Orc, data)
            .and_then(|mut iter| iter.next().transpose());
        assert!(result.is_err());
    }

    #[test]
    fn test_parquet_missing_columns_is_format_error() {
        let schema = Arc::new(Schema::new(vec![Field::new("key", DataType::Utf8, false)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(StringArray::from(vec!["only-keys"]))],
        )
        .expect("record batch should build");

        let mut cursor = Cursor::new(Vec::<u8>::new());
        let mut writer =
            ArrowWriter::try_new(&mut cursor, schema, None).expect("parquet writer init");
        writer.write(&batch).expect("parquet write");
        writer.close().expect("parquet close");

        let result = decode(InventoryFormat::Parquet, Bytes::from(cursor.into_inner()));
        assert!(matches!(result, Err(Error::Format(_))));
    }
}
