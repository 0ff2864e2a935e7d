//! Arrow record batches as rows.

use crate::stream::RowStream;
use crate::types::{DataCell, Result, WriteError};
use crate::validation::validate_column_count;
use arrow_array::{
    Array, BooleanArray, Date32Array, Date64Array, Float32Array, Float64Array, Int16Array,
    Int32Array, Int64Array, Int8Array, LargeStringArray, RecordBatch, StringArray,
    TimestampMicrosecondArray, TimestampMillisecondArray, TimestampNanosecondArray,
    TimestampSecondArray, UInt16Array, UInt32Array, UInt64Array, UInt8Array,
};
use arrow_schema::{DataType, Schema, TimeUnit};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::io::AsyncWrite;

fn downcast<'a, T: 'static>(array: &'a dyn Array) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        WriteError::Validation(format!(
            "Array of type {} does not match its declared type",
            array.data_type()
        ))
    })
}

fn timestamp(dt: Option<DateTime<chrono::Utc>>) -> Result<NaiveDateTime> {
    dt.map(|dt| dt.naive_utc())
        .ok_or_else(|| WriteError::Validation("Invalid timestamp".to_string()))
}

/// Converts one value of `array`. Nulls and unsupported types become blanks.
pub fn array_cell(array: &dyn Array, row: usize) -> Result<DataCell> {
    if array.is_null(row) {
        return Ok(DataCell::Blank);
    }

    let cell = match array.data_type() {
        DataType::Utf8 => DataCell::from(downcast::<StringArray>(array)?.value(row)),
        DataType::LargeUtf8 => DataCell::from(downcast::<LargeStringArray>(array)?.value(row)),
        DataType::Int8 => DataCell::Integer(downcast::<Int8Array>(array)?.value(row) as i64),
        DataType::Int16 => DataCell::Integer(downcast::<Int16Array>(array)?.value(row) as i64),
        DataType::Int32 => DataCell::Integer(downcast::<Int32Array>(array)?.value(row) as i64),
        DataType::Int64 => DataCell::Integer(downcast::<Int64Array>(array)?.value(row)),
        DataType::UInt8 => DataCell::Integer(downcast::<UInt8Array>(array)?.value(row) as i64),
        DataType::UInt16 => DataCell::Integer(downcast::<UInt16Array>(array)?.value(row) as i64),
        DataType::UInt32 => DataCell::Integer(downcast::<UInt32Array>(array)?.value(row) as i64),
        DataType::UInt64 => {
            let n = downcast::<UInt64Array>(array)?.value(row);
            i64::try_from(n).map_or(DataCell::Number(n as f64), DataCell::Integer)
        }
        DataType::Float32 => DataCell::from(downcast::<Float32Array>(array)?.value(row)),
        DataType::Float64 => DataCell::from(downcast::<Float64Array>(array)?.value(row)),
        DataType::Boolean => DataCell::from(downcast::<BooleanArray>(array)?.value(row)),
        DataType::Date32 => {
            let days = downcast::<Date32Array>(array)?.value(row);
            let date = NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(Duration::days(days as i64)))
                .ok_or_else(|| WriteError::Validation("Date out of range".to_string()))?;
            DataCell::DateTime(date.and_time(NaiveTime::MIN))
        }
        DataType::Date64 => {
            let millis = downcast::<Date64Array>(array)?.value(row);
            DataCell::DateTime(timestamp(DateTime::from_timestamp_millis(millis))?)
        }
        DataType::Timestamp(unit, _) => {
            let dt = match unit {
                TimeUnit::Second => {
                    let secs = downcast::<TimestampSecondArray>(array)?.value(row);
                    DateTime::from_timestamp(secs, 0)
                }
                TimeUnit::Millisecond => {
                    let millis = downcast::<TimestampMillisecondArray>(array)?.value(row);
                    DateTime::from_timestamp_millis(millis)
                }
                TimeUnit::Microsecond => {
                    let micros = downcast::<TimestampMicrosecondArray>(array)?.value(row);
                    DateTime::from_timestamp_micros(micros)
                }
                TimeUnit::Nanosecond => {
                    let nanos = downcast::<TimestampNanosecondArray>(array)?.value(row);
                    DateTime::from_timestamp(
                        nanos.div_euclid(1_000_000_000),
                        nanos.rem_euclid(1_000_000_000) as u32,
                    )
                }
            };
            DataCell::DateTime(timestamp(dt)?)
        }
        _ => DataCell::Blank,
    };

    Ok(cell)
}

/// Fills `cells` with row `row` of `batch`, reusing its allocation.
pub fn batch_row_cells(batch: &RecordBatch, row: usize, cells: &mut Vec<DataCell>) -> Result<()> {
    cells.clear();
    for column in batch.columns() {
        cells.push(array_cell(column.as_ref(), row)?);
    }
    Ok(())
}

impl<W: AsyncWrite + Unpin> RowStream<W> {
    /// Writes the field names of `schema` as a row of text cells.
    pub async fn add_header_row(&mut self, schema: &Schema) -> Result<()> {
        let names: Vec<DataCell> = schema
            .fields()
            .iter()
            .map(|field| DataCell::from(field.name().as_str()))
            .collect();
        self.add_row(&names).await
    }

    /// Writes every row of `batch` in order.
    pub async fn add_record_batch(&mut self, batch: &RecordBatch) -> Result<()> {
        validate_column_count(batch.num_columns()).map_err(WriteError::Validation)?;

        let mut cells = Vec::with_capacity(batch.num_columns());
        for row in 0..batch.num_rows() {
            batch_row_cells(batch, row, &mut cells)?;
            self.add_row(&cells).await?;
        }
        Ok(())
    }
}
