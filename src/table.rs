//! Fixed-width text tables for listing commands.
//!
//! The main entry point is the [`Table`] struct, built from an iterator of items and a set of
//! [`TableColumn`] definitions.
use std::{fmt::Display, iter};

/// Table representation.
///
/// Every column is as wide as its widest cell plus a padding of 4 spaces.
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Column definition: a name and a function to get the value of the column for a given item.
pub type TableColumn<S, T> = (S, fn(&T) -> String);

const COLUMN_PADDING: usize = 4;

impl Table {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Create a new table from an iterator of items.
    pub fn from_iter<'a, S, Iter, Item>(iter: Iter, columns: &[TableColumn<S, Item>]) -> Self
    where
        S: Display,
        Iter: IntoIterator<Item = &'a Item>,
        Item: 'a,
    {
        let header = columns.iter().map(|(name, _)| name.to_string()).collect();

        let rows = iter
            .into_iter()
            .map(|item| columns.iter().map(|(_, f)| f(item)).collect())
            .collect();

        Self::new(header, rows)
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths = vec![0; self.header.len()];
        for row in iter::once(&self.header).chain(self.rows.iter()) {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count() + COLUMN_PADDING);
            }
        }
        widths
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let widths = self.column_widths();

        for row in iter::once(&self.header).chain(self.rows.iter()) {
            for (cell, width) in row.iter().zip(widths.iter()) {
                write!(f, "{:<width$}", cell, width = width)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        id: &'static str,
        status: &'static str,
    }

    fn columns() -> Vec<TableColumn<&'static str, Row>> {
        let columns: [TableColumn<&'static str, Row>; 2] = [
            ("ID", |r: &Row| r.id.to_string()),
            ("STATUS", |r: &Row| r.status.to_string()),
        ];
        Vec::from(columns)
    }

    #[test]
    fn test_columns_use_widest_cell() {
        let rows = [
            Row {
                id: "main",
                status: "active",
            },
            Row {
                id: "feature-login",
                status: "inactive",
            },
        ];

        let output = Table::from_iter(rows.iter(), &columns()).to_string();

        assert_eq!(
            output,
            "ID               STATUS      \n\
             main             active      \n\
             feature-login    inactive    \n"
        );
    }

    #[test]
    fn test_empty_table_prints_header() {
        let rows: Vec<Row> = vec![];

        let output = Table::from_iter(rows.iter(), &columns()).to_string();

        assert_eq!(output, "ID    STATUS    \n");
    }
}
