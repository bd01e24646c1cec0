//! Parquet reading operations.

use anyhow::{bail, Context, Result};
use arrow_array::{cast::AsArray, types::*, Array, RecordBatch};
use arrow_schema::{DataType, TimeUnit};
use bytes::Bytes;
use parquet::arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ProjectionMask};

/// Read Parquet from bytes one record batch at a time, projecting only `columns`.
/// Returns the number of rows read.
pub(crate) fn for_each_batch(
    bytes: Bytes,
    columns: &[&str],
    batch_size: usize,
    mut f: impl FnMut(&RecordBatch) -> Result<()>,
) -> Result<usize> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .context("[io::parquet::read] Failed to read Parquet metadata")?;
    let mask = ProjectionMask::columns(builder.parquet_schema(), columns.iter().copied());
    let reader = builder.with_projection(mask).with_batch_size(batch_size).build()?;

    let mut rows = 0;
    for batch in reader {
        let batch = batch.context("[io::parquet::read] Failed to decode record batch")?;
        rows += batch.num_rows();
        f(&batch)?;
    }
    Ok(rows)
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a dyn Array> {
    batch.column_by_name(name)
        .map(|array| array.as_ref())
        .with_context(|| format!("[io::parquet::read] missing column {name:?}"))
}

/// Numeric column as f64, whatever its integer or float width.
pub(crate) fn f64_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let array = column(batch, name)?;
    Ok(match array.data_type() {
        DataType::Float64 => array.as_primitive::<Float64Type>().iter().collect(),
        DataType::Float32 => array.as_primitive::<Float32Type>().iter().map(|v| v.map(f64::from)).collect(),
        DataType::Int64 => array.as_primitive::<Int64Type>().iter().map(|v| v.map(|v| v as f64)).collect(),
        DataType::Int32 => array.as_primitive::<Int32Type>().iter().map(|v| v.map(f64::from)).collect(),
        DataType::Int16 => array.as_primitive::<Int16Type>().iter().map(|v| v.map(f64::from)).collect(),
        DataType::Int8 => array.as_primitive::<Int8Type>().iter().map(|v| v.map(f64::from)).collect(),
        other => bail!("[io::parquet::read] column {name:?} has non-numeric type {other}"),
    })
}

/// Integer column as i64. Float columns are accepted when every value is whole.
pub(crate) fn i64_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<i64>>> {
    let array = column(batch, name)?;
    Ok(match array.data_type() {
        DataType::Int64 => array.as_primitive::<Int64Type>().iter().collect(),
        DataType::Int32 => array.as_primitive::<Int32Type>().iter().map(|v| v.map(i64::from)).collect(),
        DataType::Int16 => array.as_primitive::<Int16Type>().iter().map(|v| v.map(i64::from)).collect(),
        DataType::Int8 => array.as_primitive::<Int8Type>().iter().map(|v| v.map(i64::from)).collect(),
        DataType::UInt32 => array.as_primitive::<UInt32Type>().iter().map(|v| v.map(i64::from)).collect(),
        DataType::Float64 | DataType::Float32 => f64_values(batch, name)?.into_iter()
            .map(|v| v.filter(|v| v.fract() == 0.0).map(|v| v as i64))
            .collect(),
        other => bail!("[io::parquet::read] column {name:?} has non-integer type {other}"),
    })
}

/// Timestamp column as microseconds since the epoch.
pub(crate) fn timestamp_micros(batch: &RecordBatch, name: &str) -> Result<Vec<Option<i64>>> {
    let array = column(batch, name)?;
    Ok(match array.data_type() {
        DataType::Timestamp(TimeUnit::Second, _) =>
            array.as_primitive::<TimestampSecondType>().iter().map(|v| v.map(|s| s * 1_000_000)).collect(),
        DataType::Timestamp(TimeUnit::Millisecond, _) =>
            array.as_primitive::<TimestampMillisecondType>().iter().map(|v| v.map(|ms| ms * 1_000)).collect(),
        DataType::Timestamp(TimeUnit::Microsecond, _) =>
            array.as_primitive::<TimestampMicrosecondType>().iter().collect(),
        DataType::Timestamp(TimeUnit::Nanosecond, _) =>
            array.as_primitive::<TimestampNanosecondType>().iter().map(|v| v.map(|ns| ns / 1_000)).collect(),
        other => bail!("[io::parquet::read] column {name:?} is not a timestamp ({other})"),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;
    use arrow_array::{ArrayRef, Float64Array, Int32Array, Int64Array, TimestampMicrosecondArray};
    use arrow_schema::{Field, Schema};
    use parquet::arrow::ArrowWriter;

    /// Encode columns as an in-memory Parquet file.
    pub(crate) fn parquet_bytes(columns: Vec<(&str, ArrayRef)>) -> Bytes {
        let schema = Arc::new(Schema::new(columns.iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect::<Vec<_>>()));
        let batch = RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, a)| a).collect()).unwrap();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        Bytes::from(buffer)
    }

    #[test]
    fn projects_and_converts_columns() {
        let bytes = parquet_bytes(vec![
            ("a", Arc::new(Int32Array::from(vec![Some(1), None, Some(3)])) as ArrayRef),
            ("b", Arc::new(Float64Array::from(vec![1.5, 2.0, 4.0])) as ArrayRef),
            ("t", Arc::new(TimestampMicrosecondArray::from(vec![0, 60_000_000, 120_000_000])) as ArrayRef),
            ("skip", Arc::new(Int64Array::from(vec![9, 9, 9])) as ArrayRef),
        ]);

        let mut seen = Vec::new();
        let rows = for_each_batch(bytes, &["a", "b", "t"], 2, |batch| {
            assert!(batch.column_by_name("skip").is_none());
            seen.extend(i64_values(batch, "a")?.into_iter()
                .zip(f64_values(batch, "b")?)
                .zip(timestamp_micros(batch, "t")?));
            Ok(())
        }).unwrap();

        assert_eq!(rows, 3);
        assert_eq!(seen, vec![
            ((Some(1), Some(1.5)), Some(0)),
            ((None, Some(2.0)), Some(60_000_000)),
            ((Some(3), Some(4.0)), Some(120_000_000)),
        ]);
    }

    #[test]
    fn wrong_type_is_an_error() {
        let bytes = parquet_bytes(vec![("b", Arc::new(Float64Array::from(vec![1.0])) as ArrayRef)]);
        let result = for_each_batch(bytes, &["b"], 16, |batch| timestamp_micros(batch, "b").map(|_| ()));
        assert!(result.is_err());
    }
}
