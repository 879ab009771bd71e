//! Typed cell access over a [`ResultTable`].

use runway_warehouse::ResultTable;

use crate::error::{ReportError, Result};

/// Column positions resolved once per table.
pub(crate) struct Columns<'a> {
    query: &'a str,
    indexes: Vec<usize>,
}

impl<'a> Columns<'a> {
    /// Resolves `names` in `table`, failing on the first missing column.
    pub(crate) fn resolve(query: &'a str, table: &ResultTable, names: &[&str]) -> Result<Self> {
        let indexes = names
            .iter()
            .map(|name| {
                table
                    .column_index(name)
                    .ok_or_else(|| ReportError::MissingColumn {
                        query: query.to_string(),
                        column: (*name).to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { query, indexes })
    }

    /// Returns the trimmed cell for the `slot`-th resolved column, treating
    /// blank strings as `NULL`.
    pub(crate) fn cell<'r>(&self, row: &'r [Option<String>], slot: usize) -> Option<&'r str> {
        self.indexes
            .get(slot)
            .and_then(|&i| row.get(i))
            .and_then(Option::as_deref)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Parses a non-negative integer cell.
    pub(crate) fn quantity(
        &self,
        row: &[Option<String>],
        slot: usize,
        row_index: usize,
        column: &str,
    ) -> Result<u64> {
        let raw = self
            .cell(row, slot)
            .ok_or_else(|| ReportError::invalid_row(self.query, row_index, format!("{column} is NULL")))?;
        parse_quantity(raw).ok_or_else(|| {
            ReportError::invalid_row(
                self.query,
                row_index,
                format!("{column} is not a non-negative integer: {raw:?}"),
            )
        })
    }
}

/// Parses `"12"` or an integral decimal such as `"12.0"`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
fn parse_quantity(raw: &str) -> Option<u64> {
    if let Ok(value) = raw.parse::<u64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64)
        .then(|| value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integral_quantities() {
        assert_eq!(parse_quantity("12"), Some(12));
        assert_eq!(parse_quantity("12.0"), Some(12));
        assert_eq!(parse_quantity("-1"), None);
        assert_eq!(parse_quantity("1.5"), None);
        assert_eq!(parse_quantity("abc"), None);
    }

    #[test]
    fn missing_column_is_typed() {
        let table = ResultTable::from_strs(&["a"], &[]).expect("table");
        let err = Columns::resolve("sales", &table, &["a", "b"]).err().map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("sales result is missing column \"b\""));
    }
}
