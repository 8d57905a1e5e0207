use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Display format for datetime cells and full-precision chart labels.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Structural problems with a table or a column reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("column '{column}' has {found} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
}

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common DataFrame dtypes.
/// Used as a `BTreeSet` / `HashMap` key downstream, so it is `Ord + Hash`.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Null,
}

// -- Manual Eq/Ord so floats can live in ordered sets --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                DateTime(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::DateTime(dt) => dt.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Interpret the value as an `f64` (integers and floats only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// A named sequence of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Distinct values in order of first appearance, missing values included.
    pub fn distinct(&self) -> Vec<Value> {
        let mut seen = HashSet::new();
        self.values
            .iter()
            .filter(|v| seen.insert(*v))
            .cloned()
            .collect()
    }

    /// Distinct non-missing values in order of first appearance.
    pub fn distinct_present(&self) -> Vec<Value> {
        let mut distinct = self.distinct();
        distinct.retain(|v| !v.is_null());
        distinct
    }

    pub fn has_missing(&self) -> bool {
        self.values.iter().any(Value::is_null)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// An ordered set of uniquely named, equal-length columns.
///
/// The only way to build a `Table` is through [`Table::new`] (or methods
/// that derive one table from another), so every value of this type upholds
/// the equal-length invariant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Validate column lengths and names, then build the table.
    pub fn new(columns: Vec<Column>) -> Result<Self, DataError> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut names = HashSet::new();
        for col in &columns {
            if !names.insert(col.name.as_str()) {
                return Err(DataError::DuplicateColumn(col.name.clone()));
            }
            if col.len() != num_rows {
                return Err(DataError::RaggedColumn {
                    column: col.name.clone(),
                    expected: num_rows,
                    found: col.len(),
                });
            }
        }
        Ok(Self { columns, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Like [`Table::column`] but reports a missing column as an error.
    pub fn require(&self, name: &str) -> Result<&Column, DataError> {
        self.column(name)
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))
    }

    /// Build a new table holding only the given rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|col| Column {
                name: col.name.clone(),
                values: rows.iter().map(|&r| col.values[r].clone()).collect(),
            })
            .collect();
        Self {
            columns,
            num_rows: rows.len(),
        }
    }

    /// Replace the column with the same name. Lengths must match.
    pub fn replace_column(&mut self, column: Column) -> Result<(), DataError> {
        if column.len() != self.num_rows {
            return Err(DataError::RaggedColumn {
                column: column.name,
                expected: self.num_rows,
                found: column.values.len(),
            });
        }
        let slot = self
            .columns
            .iter_mut()
            .find(|c| c.name == column.name)
            .ok_or_else(|| DataError::UnknownColumn(column.name.clone()))?;
        *slot = column;
        Ok(())
    }
}
