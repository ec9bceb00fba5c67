//! Aligned column store for one series group
//!
//! A [`SeriesStore`] holds the shared `Day` index and every column of a feed,
//! each column exactly as long as the index. It is built once from raw rows and
//! is read-only afterwards.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::na::NA;

/// Date format of the index column.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Header names plus raw string rows, as delivered by a data source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        RawTable { headers, rows }
    }
}

/// Replaces a zero with one so it can be used as a divisor.
///
/// The literal `"0"` cell is passed through here when the store parses it, and
/// the forecast-error scorer guards its denominator with the same function.
/// Zero readings are therefore scored as if they were `1`.
pub fn safe_denominator(value: f64) -> f64 {
    if value == 0.0 {
        1.0
    } else {
        value
    }
}

/// Values of one column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    /// Scored column; unparseable cells are `NA`
    Numeric(Vec<NA<f64>>),
    /// Pass-through column with no numeric content
    Text(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named column aligned to the store index
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: ColumnValues,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    /// Numeric values, or `None` for a pass-through column.
    pub fn numeric(&self) -> Option<&[NA<f64>]> {
        match &self.values {
            ColumnValues::Numeric(v) => Some(v),
            ColumnValues::Text(_) => None,
        }
    }

    /// Cell as written to artifact tables.
    pub fn cell(&self, row: usize) -> String {
        match &self.values {
            ColumnValues::Numeric(v) => v.get(row).map(NA::to_cell).unwrap_or_default(),
            ColumnValues::Text(v) => v.get(row).cloned().unwrap_or_default(),
        }
    }
}

/// Aligned series of one group
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStore {
    /// Header order as received, index column included
    headers: Vec<String>,
    /// Name of the index column
    timestamp_column: String,
    /// Index values (`Day`)
    index: Vec<String>,
    /// Non-index columns in header order
    columns: Vec<Column>,
}

impl SeriesStore {
    /// Builds a store from raw rows.
    ///
    /// Rows whose non-index fields are all blank are dropped; this removes the
    /// empty trailing rows a live feed often ends with. Retained rows must have
    /// exactly one field per header.
    pub fn build(headers: &[String], rows: &[Vec<String>], timestamp_column: &str) -> Result<Self> {
        let ts_pos = headers
            .iter()
            .position(|h| h.trim() == timestamp_column)
            .ok_or_else(|| {
                Error::MalformedInput(format!(
                    "headers do not include the timestamp column '{}'",
                    timestamp_column
                ))
            })?;

        let mut seen = HashSet::new();
        for header in headers {
            if !seen.insert(header.trim()) {
                return Err(Error::MalformedInput(format!(
                    "duplicate column name '{}'",
                    header
                )));
            }
        }

        // 空行を除外
        let mut retained: Vec<&Vec<String>> = Vec::with_capacity(rows.len());
        for (row_no, row) in rows.iter().enumerate() {
            let has_data = row
                .iter()
                .enumerate()
                .any(|(i, field)| i != ts_pos && !field.trim().is_empty());
            if !has_data {
                continue;
            }
            if row.len() != headers.len() {
                return Err(Error::MalformedInput(format!(
                    "row {} has {} fields, expected {}",
                    row_no,
                    row.len(),
                    headers.len()
                )));
            }
            retained.push(row);
        }

        let dropped = rows.len() - retained.len();
        if dropped > 0 {
            log::debug!("dropped {} blank row(s)", dropped);
        }

        let index: Vec<String> = retained.iter().map(|r| r[ts_pos].trim().to_string()).collect();
        validate_index(&index)?;

        let columns = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ts_pos)
            .map(|(i, name)| {
                let cells: Vec<&str> = retained.iter().map(|r| r[i].as_str()).collect();
                Column {
                    name: name.trim().to_string(),
                    values: parse_column(&cells),
                }
            })
            .collect();

        Ok(SeriesStore {
            headers: headers.iter().map(|h| h.trim().to_string()).collect(),
            timestamp_column: timestamp_column.to_string(),
            index,
            columns,
        })
    }

    /// Builds a store from a [`RawTable`].
    pub fn from_raw(table: &RawTable, timestamp_column: &str) -> Result<Self> {
        Self::build(&table.headers, &table.rows, timestamp_column)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    /// Index values in row order
    pub fn index(&self) -> &[String] {
        &self.index
    }

    /// Number of retained rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Reference day of a run: the last index value
    pub fn last_day(&self) -> Option<&str> {
        self.index.last().map(String::as_str)
    }

    /// Non-index columns in header order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Columns that take part in scoring
    pub fn numeric_columns(&self) -> impl Iterator<Item = (&str, &[NA<f64>])> {
        self.columns
            .iter()
            .filter_map(|c| c.numeric().map(|v| (c.name(), v)))
    }
}

/// Parses one numeric cell. The literal `"0"` goes through [`safe_denominator`].
fn parse_cell(raw: &str) -> NA<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return NA::NA;
    }
    if raw == "0" {
        return NA::Value(safe_denominator(0.0));
    }
    match raw.parse::<f64>() {
        Ok(v) => NA::finite(v),
        Err(_) => NA::NA,
    }
}

/// `true` for cells a metric column may hold: blank or any float spelling,
/// `NaN` and `inf` included.
fn is_numeric_like(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || raw.parse::<f64>().is_ok()
}

/// A column is text only when it has no usable number and at least one cell
/// that is not numeric. An all-blank metric column stays numeric so scoring
/// reports it as skipped.
fn parse_column(cells: &[&str]) -> ColumnValues {
    let parsed: Vec<NA<f64>> = cells.iter().map(|c| parse_cell(c)).collect();
    if parsed.iter().any(NA::is_value) || cells.iter().all(|c| is_numeric_like(c)) {
        ColumnValues::Numeric(parsed)
    } else {
        ColumnValues::Text(cells.iter().map(|c| c.to_string()).collect())
    }
}

/// Index values must be unique; when they are all dates they must also increase.
fn validate_index(index: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(index.len());
    for (row, day) in index.iter().enumerate() {
        if day.is_empty() {
            return Err(Error::MalformedInput(format!("row {} has an empty timestamp", row)));
        }
        if !seen.insert(day.as_str()) {
            return Err(Error::MalformedInput(format!("duplicate timestamp '{}'", day)));
        }
    }

    let dates: Option<Vec<NaiveDate>> = index
        .iter()
        .map(|d| NaiveDate::parse_from_str(d, DAY_FORMAT).ok())
        .collect();
    if let Some(dates) = dates {
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::MalformedInput(format!(
                "timestamps are not strictly increasing: {} then {}",
                w[0], w[1]
            )));
        }
    }
    Ok(())
}
