//! Tabular query results.

use serde::Serialize;

use crate::error::{QueryError, Result};

/// Ordered column names plus rows of nullable string cells.
///
/// Athena returns every value as `VarCharValue`; a missing value is SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl ResultTable {
    /// Creates a table, checking every row has one cell per column.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Decode`] on a ragged row.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(QueryError::Decode(format!(
                "row {index} has {} cells but the result has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Builds a table from string literals; empty cells become `NULL`.
    ///
    /// Intended for fixtures.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Decode`] on a ragged row.
    pub fn from_strs(columns: &[&str], rows: &[&[&str]]) -> Result<Self> {
        Self::new(
            columns.iter().map(|c| (*c).to_string()).collect(),
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| (!cell.is_empty()).then(|| (*cell).to_string()))
                        .collect()
                })
                .collect(),
        )
    }

    /// Column names in result order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of `name`, if present.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Replaces the column names positionally.
    ///
    /// Unnamed aggregates (`_col2`) come back with generated names, so callers
    /// assign the names they expect.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Decode`] if the count does not match.
    pub fn with_column_names(mut self, names: &[&str]) -> Result<Self> {
        if names.len() != self.columns.len() {
            return Err(QueryError::Decode(format!(
                "expected {} columns ({}) but the result has {} ({})",
                names.len(),
                names.join(","),
                self.columns.len(),
                self.columns.join(",")
            )));
        }
        self.columns = names.iter().map(|n| (*n).to_string()).collect();
        Ok(self)
    }

    /// Appends rows from another page of the same result.
    pub(crate) fn extend_rows(&mut self, rows: Vec<Vec<Option<String>>>) -> Result<()> {
        if let Some(row) = rows.iter().find(|row| row.len() != self.columns.len()) {
            return Err(QueryError::Decode(format!(
                "page row has {} cells but the result has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.extend(rows);
        Ok(())
    }
}
