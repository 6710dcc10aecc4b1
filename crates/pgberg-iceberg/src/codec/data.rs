//! Parquet data files.
//!
//! Each column carries its Iceberg field id in the `PARQUET:field_id`
//! metadata so readers resolve columns by id rather than by name.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Schema as ArrowSchema, TimeUnit};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::{ArrowWriter, PARQUET_FIELD_ID_META_KEY};
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use pgberg_core::{ColumnDef, ColumnSchema, ColumnType};

use super::values;
use super::{Artifact, Row};
use crate::error::{IcebergError, IcebergResult};
use crate::types::DataFileStats;

const ARTIFACT: &str = Artifact::DataFile.as_str();
const UTC: &str = "+00:00";

fn arrow_type(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Boolean => DataType::Boolean,
        ColumnType::Int => DataType::Int32,
        ColumnType::Long => DataType::Int64,
        ColumnType::Float => DataType::Float32,
        ColumnType::Double => DataType::Float64,
        ColumnType::String => DataType::Utf8,
        ColumnType::Date => DataType::Date32,
        ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        ColumnType::TimestampTz => DataType::Timestamp(TimeUnit::Microsecond, Some(UTC.into())),
    }
}

fn arrow_schema(columns: &ColumnSchema) -> Arc<ArrowSchema> {
    let fields: Vec<Field> = columns
        .columns()
        .iter()
        .zip(1..)
        .map(|(column, field_id): (&ColumnDef, i32)| {
            Field::new(&column.name, arrow_type(column.column_type), true).with_metadata(
                HashMap::from([(PARQUET_FIELD_ID_META_KEY.to_string(), field_id.to_string())]),
            )
        })
        .collect();
    Arc::new(ArrowSchema::new(fields))
}

fn writer_properties() -> WriterProperties {
    let created_by = KeyValue {
        key: "created_by".to_string(),
        value: Some("pgberg".to_string()),
    };
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(Some(vec![created_by]))
        .build()
}

fn parse_cells<T>(
    rows: &[Row],
    index: usize,
    column: &ColumnDef,
    parse: impl Fn(&str) -> Result<T, String>,
) -> IcebergResult<Vec<Option<T>>> {
    rows.iter()
        .enumerate()
        .map(|(row_number, row)| match row.get(index).and_then(Option::as_deref) {
            None => Ok(None),
            Some(text) => parse(text).map(Some).map_err(|reason| {
                IcebergError::encode(
                    ARTIFACT,
                    format!(
                        "row {row_number}, column '{}': cannot read '{text}' as {}: {reason}",
                        column.name,
                        column.column_type.iceberg_type()
                    ),
                )
            }),
        })
        .collect()
}

fn build_column(rows: &[Row], index: usize, column: &ColumnDef) -> IcebergResult<ArrayRef> {
    let array: ArrayRef = match column.column_type {
        ColumnType::Boolean => Arc::new(BooleanArray::from(parse_cells(
            rows,
            index,
            column,
            values::parse_bool,
        )?)),
        ColumnType::Int => Arc::new(Int32Array::from(parse_cells(
            rows,
            index,
            column,
            values::parse_number::<i32>,
        )?)),
        ColumnType::Long => Arc::new(Int64Array::from(parse_cells(
            rows,
            index,
            column,
            values::parse_number::<i64>,
        )?)),
        ColumnType::Float => Arc::new(Float32Array::from(parse_cells(
            rows,
            index,
            column,
            values::parse_number::<f32>,
        )?)),
        ColumnType::Double => Arc::new(Float64Array::from(parse_cells(
            rows,
            index,
            column,
            values::parse_number::<f64>,
        )?)),
        ColumnType::String => Arc::new(StringArray::from(
            rows.iter()
                .map(|row| row.get(index).and_then(Option::as_deref))
                .collect::<Vec<_>>(),
        )),
        ColumnType::Date => Arc::new(Date32Array::from(parse_cells(
            rows,
            index,
            column,
            values::parse_date,
        )?)),
        ColumnType::Timestamp => Arc::new(TimestampMicrosecondArray::from(parse_cells(
            rows,
            index,
            column,
            values::parse_timestamp,
        )?)),
        ColumnType::TimestampTz => Arc::new(
            TimestampMicrosecondArray::from(parse_cells(
                rows,
                index,
                column,
                values::parse_timestamptz,
            )?)
            .with_timezone(UTC),
        ),
    };
    Ok(array)
}

/// Encodes text rows into a single-row-group Parquet file.
pub(crate) fn encode_rows(columns: &ColumnSchema, rows: &[Row]) -> IcebergResult<Vec<u8>> {
    if columns.is_empty() {
        return Err(IcebergError::encode(ARTIFACT, "table has no columns"));
    }
    if let Some((row_number, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != columns.len())
    {
        return Err(IcebergError::encode(
            ARTIFACT,
            format!(
                "row {row_number} has {} value(s), expected {}",
                row.len(),
                columns.len()
            ),
        ));
    }

    let schema = arrow_schema(columns);
    let arrays = columns
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| build_column(rows, index, column))
        .collect::<IcebergResult<Vec<_>>>()?;
    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .map_err(|e| IcebergError::encode(ARTIFACT, format!("record batch build failed: {e}")))?;

    let mut cursor = Cursor::new(Vec::<u8>::new());
    let mut writer = ArrowWriter::try_new(&mut cursor, schema, Some(writer_properties()))
        .map_err(|e| IcebergError::encode(ARTIFACT, format!("parquet writer init failed: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| IcebergError::encode(ARTIFACT, format!("parquet write failed: {e}")))?;
    writer
        .close()
        .map_err(|e| IcebergError::encode(ARTIFACT, format!("parquet close failed: {e}")))?;
    Ok(cursor.into_inner())
}

struct DecodedFile {
    batch: RecordBatch,
    record_count: i64,
    column_sizes: Vec<i64>,
}

fn read_file(data: Bytes) -> IcebergResult<DecodedFile> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)
        .map_err(|e| IcebergError::decode(ARTIFACT, format!("parquet reader init failed: {e}")))?;

    let metadata = builder.metadata().clone();
    let record_count = metadata.file_metadata().num_rows();
    let mut column_sizes = vec![0_i64; metadata.file_metadata().schema_descr().num_columns()];
    for row_group in metadata.row_groups() {
        for (size, column) in column_sizes.iter_mut().zip(row_group.columns()) {
            *size += column.compressed_size();
        }
    }

    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .map_err(|e| IcebergError::decode(ARTIFACT, format!("parquet reader build failed: {e}")))?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| IcebergError::decode(ARTIFACT, format!("parquet read batch failed: {e}")))?;
    let batch = concat_batches(&schema, &batches)
        .map_err(|e| IcebergError::decode(ARTIFACT, format!("batch concat failed: {e}")))?;

    Ok(DecodedFile {
        batch,
        record_count,
        column_sizes,
    })
}

fn column<'a>(batch: &'a RecordBatch, index: usize, def: &ColumnDef) -> IcebergResult<&'a ArrayRef> {
    if batch.num_columns() <= index {
        return Err(IcebergError::decode(
            ARTIFACT,
            format!("missing column '{}'", def.name),
        ));
    }
    Ok(batch.column(index))
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, def: &ColumnDef) -> IcebergResult<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        IcebergError::decode(
            ARTIFACT,
            format!(
                "column '{}' is not stored as {}",
                def.name,
                def.column_type.iceberg_type()
            ),
        )
    })
}

fn min_max<T: PartialOrd + Copy>(values: impl Iterator<Item = T>) -> Option<(T, T)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((
            if v < lo { v } else { lo },
            if v > hi { v } else { hi },
        )),
    })
}

fn encode_bounds<T>(bounds: Option<(T, T)>, encode: impl Fn(T) -> Vec<u8>) -> Option<(Vec<u8>, Vec<u8>)> {
    bounds.map(|(lo, hi)| (encode(lo), encode(hi)))
}

/// Lower and upper bounds in Iceberg single-value binary form.
fn column_bounds(array: &ArrayRef, def: &ColumnDef) -> IcebergResult<Option<(Vec<u8>, Vec<u8>)>> {
    let bounds = match def.column_type {
        ColumnType::Boolean => {
            let values = downcast::<BooleanArray>(array, def)?;
            encode_bounds(min_max(values.iter().flatten()), |v| vec![u8::from(v)])
        }
        ColumnType::Int => {
            let values = downcast::<Int32Array>(array, def)?;
            encode_bounds(min_max(values.iter().flatten()), |v| v.to_le_bytes().to_vec())
        }
        ColumnType::Long => {
            let values = downcast::<Int64Array>(array, def)?;
            encode_bounds(min_max(values.iter().flatten()), |v| v.to_le_bytes().to_vec())
        }
        ColumnType::Float => {
            let values = downcast::<Float32Array>(array, def)?;
            let finite = values.iter().flatten().filter(|v| !v.is_nan());
            encode_bounds(min_max(finite), |v| v.to_le_bytes().to_vec())
        }
        ColumnType::Double => {
            let values = downcast::<Float64Array>(array, def)?;
            let finite = values.iter().flatten().filter(|v| !v.is_nan());
            encode_bounds(min_max(finite), |v| v.to_le_bytes().to_vec())
        }
        ColumnType::String => {
            let values = downcast::<StringArray>(array, def)?;
            encode_bounds(min_max(values.iter().flatten()), |v: &str| v.as_bytes().to_vec())
        }
        ColumnType::Date => {
            let values = downcast::<Date32Array>(array, def)?;
            encode_bounds(min_max(values.iter().flatten()), |v| v.to_le_bytes().to_vec())
        }
        ColumnType::Timestamp | ColumnType::TimestampTz => {
            let values = downcast::<TimestampMicrosecondArray>(array, def)?;
            encode_bounds(min_max(values.iter().flatten()), |v| v.to_le_bytes().to_vec())
        }
    };
    Ok(bounds)
}

fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Recomputes row count and column statistics from a stored file.
pub(crate) fn read_stats(columns: &ColumnSchema, data: Bytes) -> IcebergResult<DataFileStats> {
    let decoded = read_file(data)?;
    let mut stats = DataFileStats {
        record_count: decoded.record_count,
        ..DataFileStats::default()
    };

    for ((index, def), field_id) in columns.columns().iter().enumerate().zip(1_i32..) {
        let array = column(&decoded.batch, index, def)?;
        if let Some(size) = decoded.column_sizes.get(index) {
            stats.column_sizes.insert(field_id, *size);
        }
        stats
            .value_counts
            .insert(field_id, usize_to_i64(array.len()));
        stats
            .null_value_counts
            .insert(field_id, usize_to_i64(array.null_count()));
        if let Some((lower, upper)) = column_bounds(array, def)? {
            stats.lower_bounds.insert(field_id, lower);
            stats.upper_bounds.insert(field_id, upper);
        }
    }
    Ok(stats)
}

fn render<T>(
    values: impl Iterator<Item = Option<T>>,
    def: &ColumnDef,
    format: impl Fn(T) -> Option<String>,
) -> IcebergResult<Vec<Option<String>>> {
    values
        .map(|value| match value {
            None => Ok(None),
            Some(v) => format(v).map(Some).ok_or_else(|| {
                IcebergError::decode(ARTIFACT, format!("column '{}' holds an out-of-range value", def.name))
            }),
        })
        .collect()
}

fn render_column(array: &ArrayRef, def: &ColumnDef) -> IcebergResult<Vec<Option<String>>> {
    match def.column_type {
        ColumnType::Boolean => render(downcast::<BooleanArray>(array, def)?.iter(), def, |v| {
            Some(v.to_string())
        }),
        ColumnType::Int => render(downcast::<Int32Array>(array, def)?.iter(), def, |v| {
            Some(v.to_string())
        }),
        ColumnType::Long => render(downcast::<Int64Array>(array, def)?.iter(), def, |v| {
            Some(v.to_string())
        }),
        ColumnType::Float => render(downcast::<Float32Array>(array, def)?.iter(), def, |v| {
            Some(v.to_string())
        }),
        ColumnType::Double => render(downcast::<Float64Array>(array, def)?.iter(), def, |v| {
            Some(v.to_string())
        }),
        ColumnType::String => render(downcast::<StringArray>(array, def)?.iter(), def, |v| {
            Some(v.to_string())
        }),
        ColumnType::Date => render(
            downcast::<Date32Array>(array, def)?.iter(),
            def,
            values::format_date,
        ),
        ColumnType::Timestamp => render(
            downcast::<TimestampMicrosecondArray>(array, def)?.iter(),
            def,
            values::format_timestamp,
        ),
        ColumnType::TimestampTz => render(
            downcast::<TimestampMicrosecondArray>(array, def)?.iter(),
            def,
            values::format_timestamptz,
        ),
    }
}

/// Decodes a stored file back into Postgres text rows.
pub(crate) fn decode_rows(columns: &ColumnSchema, data: Bytes) -> IcebergResult<Vec<Row>> {
    let decoded = read_file(data)?;
    let rendered = columns
        .columns()
        .iter()
        .enumerate()
        .map(|(index, def)| render_column(column(&decoded.batch, index, def)?, def))
        .collect::<IcebergResult<Vec<_>>>()?;

    let row_count = decoded.batch.num_rows();
    let mut rows: Vec<Row> = (0..row_count)
        .map(|_| Vec::with_capacity(columns.len()))
        .collect();
    for column_values in rendered {
        for (row, value) in rows.iter_mut().zip(column_values) {
            row.push(value);
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_rows(rows: &[&[Option<&str>]]) -> Vec<Row> {
        rows.iter()
            .map(|row| row.iter().map(|v| v.map(str::to_string)).collect())
            .collect()
    }

    #[test]
    fn test_stats_from_persisted_file() {
        let columns = ColumnSchema::from_pg([("id", "int"), ("name", "text")]).unwrap();
        let rows = text_rows(&[
            &[Some("2"), Some("bob")],
            &[Some("1"), None],
            &[Some("5"), Some("alice")],
        ]);

        let data = encode_rows(&columns, &rows).unwrap();
        let stats = read_stats(&columns, Bytes::from(data)).unwrap();

        assert_eq!(stats.record_count, 3);
        assert_eq!(stats.value_counts[&1], 3);
        assert_eq!(stats.null_value_counts[&2], 1);
        assert_eq!(stats.lower_bounds[&1], 1_i32.to_le_bytes().to_vec());
        assert_eq!(stats.upper_bounds[&1], 5_i32.to_le_bytes().to_vec());
        assert_eq!(stats.lower_bounds[&2], b"alice".to_vec());
        assert_eq!(stats.upper_bounds[&2], b"bob".to_vec());
        assert!(stats.column_sizes[&1] > 0);
    }

    #[test]
    fn test_all_null_column_has_no_bounds() {
        let columns = ColumnSchema::from_pg([("note", "text")]).unwrap();
        let rows = text_rows(&[&[None], &[None]]);
        let data = encode_rows(&columns, &rows).unwrap();
        let stats = read_stats(&columns, Bytes::from(data)).unwrap();
        assert_eq!(stats.null_value_counts[&1], 2);
        assert!(stats.lower_bounds.is_empty());
    }

    #[test]
    fn test_field_ids_are_embedded() {
        let columns = ColumnSchema::from_pg([("id", "bigint"), ("at", "timestamptz")]).unwrap();
        let schema = arrow_schema(&columns);
        assert_eq!(
            schema.field(1).metadata().get(PARQUET_FIELD_ID_META_KEY),
            Some(&"2".to_string())
        );
    }

    #[test]
    fn test_decode_renders_postgres_text() {
        let columns = ColumnSchema::from_pg([
            ("paid", "boolean"),
            ("day", "date"),
            ("at", "timestamptz"),
        ])
        .unwrap();
        let rows = text_rows(&[&[Some("t"), Some("2024-01-15"), Some("2024-01-02 00:00:00-05")]]);

        let data = encode_rows(&columns, &rows).unwrap();
        let decoded = decode_rows(&columns, Bytes::from(data)).unwrap();
        assert_eq!(
            decoded,
            text_rows(&[&[
                Some("true"),
                Some("2024-01-15"),
                Some("2024-01-02 05:00:00+00")
            ]])
        );
    }

    #[test]
    fn test_bad_value_names_row_and_column() {
        let columns = ColumnSchema::from_pg([("id", "int")]).unwrap();
        let err = encode_rows(&columns, &text_rows(&[&[Some("1")], &[Some("x")]])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("row 1"));
        assert!(message.contains("'id'"));
    }

    #[test]
    fn test_row_width_mismatch_rejected() {
        let columns = ColumnSchema::from_pg([("id", "int"), ("name", "text")]).unwrap();
        let err = encode_rows(&columns, &text_rows(&[&[Some("1")]])).unwrap_err();
        assert!(err.to_string().contains("expected 2"));
    }
}
