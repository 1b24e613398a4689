//! In-memory tabular record set threaded through the pipeline.
//!
//! Row-major: each row holds exactly one value per column. Columns are
//! addressed by exact name; a missing column is a schema error.

use std::borrow::Cow;
use std::fmt;

use crate::error::ReconError;
use crate::model::Origin;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric reading of a cell. Text that parses as a number counts;
    /// anything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null => None,
        }
    }

    /// String form used when the value takes part in a join key.
    ///
    /// Whole numbers render without a decimal part so `1001.0` keys as `"1001"`.
    pub fn key_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Self::Number(n) => Some(Cow::Owned(format_number(*n))),
        }
    }
}

/// Integers without decimals, everything else as `f64` displays.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map_or(Self::Null, Self::Number)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub origin: Origin,
}

impl Column {
    pub fn new(name: impl Into<String>, origin: impl Into<Origin>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Empty table with the given columns.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table whose columns all share one origin. Short rows are
    /// padded with nulls, long rows truncated.
    pub fn from_rows(
        name: impl Into<String>,
        origin: impl Into<Origin>,
        headers: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        let origin = origin.into();
        let columns: Vec<Column> = headers.into_iter().map(|h| Column::new(h, origin)).collect();
        let mut table = Self::new(name, columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<Value>] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, ReconError> {
        self.find_column(name)
            .ok_or_else(|| ReconError::missing_column(&self.name, name))
    }

    /// Fail with the first of `names` the table does not carry.
    pub fn require_columns(&self, names: &[&str]) -> Result<(), ReconError> {
        for name in names {
            self.column_index(name)?;
        }
        Ok(())
    }

    /// Value at `row` in the named column; `None` if either is out of range.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.find_column(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Append a column. `values` must hold one entry per row.
    pub fn push_column(&mut self, column: Column, values: Vec<Value>) {
        debug_assert_eq!(values.len(), self.rows.len(), "column '{}' length", column.name);
        self.columns.push(column);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Drop the named columns that exist. Returns how many were removed.
    pub fn drop_columns(&mut self, names: &[&str]) -> usize {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.contains(&c.name.as_str()))
            .collect();
        let removed = keep.iter().filter(|k| !**k).count();
        if removed == 0 {
            return 0;
        }

        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&true));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
        removed
    }

    /// Keep only `names`, in that order. Every name must exist.
    pub fn select_columns(self, names: &[&str]) -> Result<Table, ReconError> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<Vec<_>, _>>()?;

        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Table {
            name: self.name,
            columns,
            rows,
        })
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Value]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Rewrite every value of one column in place.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<(), ReconError>
    where
        F: FnMut(&Value) -> Value,
    {
        let idx = self.column_index(name)?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(())
    }

    pub fn rename_columns<F>(&mut self, mut rename: F)
    where
        F: FnMut(&Column) -> String,
    {
        for column in &mut self.columns {
            column.name = rename(column);
        }
    }

    pub(crate) fn into_parts(self) -> (String, Vec<Column>, Vec<Vec<Value>>) {
        (self.name, self.columns, self.rows)
    }

    pub(crate) fn from_parts(name: String, columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Self {
        Self { name, columns, rows }
    }
}
