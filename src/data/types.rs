use std::collections::BTreeMap;
use std::fmt;

use super::model::{Column, Table, Value};

/// Inferred semantic kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    DateTime,
    Numeric,
    Categorical,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::DateTime => write!(f, "datetime"),
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::Categorical => write!(f, "categorical"),
        }
    }
}

/// column_name → inferred type.
pub type ColumnTypes = BTreeMap<String, ColumnType>;

/// Classify every column of the table.
pub fn classify(table: &Table) -> ColumnTypes {
    table
        .columns()
        .iter()
        .map(|col| (col.name.clone(), classify_column(col)))
        .collect()
}

/// Datetime is checked before numeric. Missing cells carry no signal, and a
/// column without any present cell falls back to categorical.
pub fn classify_column(column: &Column) -> ColumnType {
    let mut present = column.values.iter().filter(|v| !v.is_null()).peekable();
    if present.peek().is_none() {
        return ColumnType::Categorical;
    }
    let present: Vec<&Value> = present.collect();
    if present.iter().all(|v| matches!(v, Value::DateTime(_))) {
        ColumnType::DateTime
    } else if present.iter().all(|v| v.is_numeric()) {
        ColumnType::Numeric
    } else {
        ColumnType::Categorical
    }
}

/// Names of the columns of a given type, in table order.
pub fn columns_of_type(table: &Table, types: &ColumnTypes, wanted: ColumnType) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| types.get(&c.name) == Some(&wanted))
        .map(|c| c.name.clone())
        .collect()
}
