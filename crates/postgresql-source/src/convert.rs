//! Conversion of PostgreSQL rows into `RawRow`s.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sync_core::{RawRow, RowValue};
use tokio_postgres::types::Type;
use tokio_postgres::Row;
use tracing::warn;

/// Convert every column of `row`.
pub fn convert_row(row: &Row) -> Result<RawRow, tokio_postgres::Error> {
    let mut raw = RawRow::default();
    for (index, column) in row.columns().iter().enumerate() {
        let value = convert_postgres_value(row, index, column.type_())?;
        raw.insert(column.name(), value);
    }
    Ok(raw)
}

/// Convert one column by its native type. Types the poller does not read are
/// kept as `Unsupported` so validation can name them.
fn convert_postgres_value(
    row: &Row,
    index: usize,
    pg_type: &Type,
) -> Result<RowValue, tokio_postgres::Error> {
    let value = match *pg_type {
        Type::BOOL => row.try_get::<_, Option<bool>>(index)?.map(RowValue::Bool),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)?
            .map(|i| RowValue::Int(i as i64)),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(index)?
            .map(|i| RowValue::Int(i as i64)),
        Type::INT8 => row.try_get::<_, Option<i64>>(index)?.map(RowValue::Int),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)?
            .map(|f| RowValue::Float(f as f64)),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(index)?.map(RowValue::Float),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(index)?
            .map(|d| match d.to_f64() {
                Some(f) => RowValue::Float(f),
                None => {
                    warn!("NUMERIC value {d} does not fit in f64");
                    RowValue::Unsupported("numeric".to_string())
                }
            }),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(index)?.map(RowValue::Text)
        }
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(index)?
            .map(RowValue::Timestamp),
        // Naive timestamps are taken as UTC.
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(index)?
            .map(|ts| RowValue::Timestamp(DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc))),
        _ => Some(RowValue::Unsupported(pg_type.name().to_string())),
    };
    Ok(value.unwrap_or(RowValue::Null))
}
