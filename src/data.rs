//! Transaction loading from CSV using Polars

use crate::error::{SegmentError, SegmentResult};
use crate::features::{CustomerId, TransactionRow};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;

pub const CUSTOMER_ID_COLUMN: &str = "Customer ID";
pub const INVOICE_COLUMN: &str = "Invoice";
pub const INVOICE_DATE_COLUMN: &str = "InvoiceDate";
pub const QUANTITY_COLUMN: &str = "Quantity";
pub const PRICE_COLUMN: &str = "Price";

/// Columns every input file must carry
pub const REQUIRED_COLUMNS: [&str; 5] = [
    CUSTOMER_ID_COLUMN,
    INVOICE_COLUMN,
    INVOICE_DATE_COLUMN,
    QUANTITY_COLUMN,
    PRICE_COLUMN,
];

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Load and clean transactions from a CSV file
///
/// Rows without a customer id are dropped. Any other missing or malformed
/// required value rejects the file with the offending 1-based data row.
pub fn load_transactions(file_path: impl AsRef<Path>) -> SegmentResult<Vec<TransactionRow>> {
    let path = file_path.as_ref();
    tracing::info!(path = %path.display(), "reading transactions");

    // identifier columns stay text whatever the first rows look like;
    // only columns present in the header may be overwritten
    let header = CsvReadOptions::default()
        .with_has_header(true)
        .with_n_rows(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    let id_columns: Schema = [CUSTOMER_ID_COLUMN, INVOICE_COLUMN]
        .into_iter()
        .filter(|name| header.column(name).is_ok())
        .map(|name| Field::new(name.into(), DataType::String))
        .collect();

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .with_schema_overwrite(Some(Arc::new(id_columns)))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    transactions_from_frame(&df)
}

/// Convert an in-memory frame holding the required columns into transactions
pub fn transactions_from_frame(df: &DataFrame) -> SegmentResult<Vec<TransactionRow>> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SegmentError::MissingColumns(missing));
    }

    let customer_ids = customer_id_strings(df.column(CUSTOMER_ID_COLUMN)?)?;
    let invoices = df.column(INVOICE_COLUMN)?.cast(&DataType::String)?;
    let invoices = invoices.str()?;
    let dates = df.column(INVOICE_DATE_COLUMN)?.cast(&DataType::String)?;
    let dates = dates.str()?;
    let quantities = df.column(QUANTITY_COLUMN)?.cast(&DataType::Float64)?;
    let quantities = quantities.f64()?;
    let prices = df.column(PRICE_COLUMN)?.cast(&DataType::Float64)?;
    let prices = prices.f64()?;

    let mut rows = Vec::with_capacity(df.height());
    let mut dropped = 0usize;

    for (idx, customer) in customer_ids.into_iter().enumerate() {
        let row_number = idx + 1;
        let Some(customer) = customer else {
            dropped += 1;
            continue;
        };

        let invoice = invoices
            .get(idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing_value(row_number, INVOICE_COLUMN))?;
        let raw_date = dates
            .get(idx)
            .ok_or_else(|| missing_value(row_number, INVOICE_DATE_COLUMN))?;
        let invoice_timestamp = parse_timestamp(raw_date).ok_or_else(|| SegmentError::InvalidRow {
            row: row_number,
            reason: format!("unrecognised {INVOICE_DATE_COLUMN} '{raw_date}'"),
        })?;
        let quantity = quantities
            .get(idx)
            .ok_or_else(|| missing_value(row_number, QUANTITY_COLUMN))?;
        let unit_price = prices
            .get(idx)
            .ok_or_else(|| missing_value(row_number, PRICE_COLUMN))?;

        rows.push(TransactionRow {
            customer_id: CustomerId::new(customer),
            invoice_id: invoice.to_string(),
            invoice_timestamp,
            quantity,
            unit_price,
        });
    }

    if dropped > 0 {
        tracing::info!(dropped, "dropped rows without a customer id");
    }
    tracing::debug!(rows = rows.len(), "transactions loaded");

    Ok(rows)
}

fn missing_value(row: usize, column: &str) -> SegmentError {
    SegmentError::InvalidRow {
        row,
        reason: format!("missing or non-numeric {column}"),
    }
}

/// Customer ids as text; float-typed ids (`13085.0`) are rendered as integers
fn customer_id_strings(column: &Column) -> SegmentResult<Vec<Option<String>>> {
    let as_text = if column.dtype().is_float() {
        column.cast(&DataType::Int64)?.cast(&DataType::String)?
    } else {
        column.cast(&DataType::String)?
    };
    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| v.and_then(normalize_customer_id))
        .collect())
}

/// Trim an id and drop a zero fraction from integral ids: `13085.0` -> `13085`
pub fn normalize_customer_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    if id.is_empty() {
        return None;
    }
    if let Some((whole, fraction)) = id.split_once('.') {
        let integral = !whole.is_empty()
            && whole.bytes().all(|b| b.is_ascii_digit())
            && !fraction.is_empty()
            && fraction.bytes().all(|b| b == b'0');
        if integral {
            return Some(whole.to_string());
        }
    }
    Some(id.to_string())
}

/// Parse an invoice timestamp in one of the accepted layouts
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    // trailing Z without offset arithmetic
    let raw = raw.strip_suffix('Z').unwrap_or(raw);
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
