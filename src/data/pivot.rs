use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::{Column, DataError, Table, Value};
use super::reduce::Reducer;

/// How to resolve an (index, group) pair that occurs on several rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the whole pivot.
    #[default]
    Reject,
    /// The row that comes last wins.
    KeepLast,
    /// Collapse the colliding cells with a reducer.
    Reduce(Reducer),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PivotError {
    #[error("group ('{group}'), index ('{index}') and value ('{value}') columns must all differ")]
    Degenerate {
        group: String,
        index: String,
        value: String,
    },
    #[error("index '{index}' has more than one value for group '{group}'; pick a duplicate policy")]
    DuplicateEntry { index: String, group: String },
    #[error(transparent)]
    Data(#[from] DataError),
}

/// A wide table produced by [`pivot`], together with the group value each
/// non-index column was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Pivoted {
    pub table: Table,
    pub index_column: String,
    /// One entry per group column, in column order after the index.
    pub groups: Vec<Value>,
}

impl Pivoted {
    pub fn into_table(self) -> Table {
        self.table
    }
}

/// Reshape a long table into a wide one.
///
/// The result has the index column first (sorted distinct index values),
/// then one column per distinct group value, also sorted, named after the
/// value's display form. Cells hold `value_column` for that (index, group)
/// pair, or `Null` when the pair never occurs. Rows whose index or group
/// cell is missing are dropped.
pub fn pivot(
    table: &Table,
    group_column: &str,
    index_column: &str,
    value_column: &str,
    policy: DuplicatePolicy,
) -> Result<Pivoted, PivotError> {
    if group_column == index_column || group_column == value_column || index_column == value_column
    {
        return Err(PivotError::Degenerate {
            group: group_column.to_string(),
            index: index_column.to_string(),
            value: value_column.to_string(),
        });
    }
    let groups = table.require(group_column)?;
    let index = table.require(index_column)?;
    let values = table.require(value_column)?;

    let mut cells: BTreeMap<(&Value, &Value), Vec<&Value>> = BTreeMap::new();
    let mut index_keys = BTreeSet::new();
    let mut group_keys = BTreeSet::new();
    for row in 0..table.num_rows() {
        let (i, g) = (&index.values[row], &groups.values[row]);
        if i.is_null() || g.is_null() {
            continue;
        }
        index_keys.insert(i);
        group_keys.insert(g);
        let entry = cells.entry((i, g)).or_default();
        if !entry.is_empty() && policy == DuplicatePolicy::Reject {
            return Err(PivotError::DuplicateEntry {
                index: i.to_string(),
                group: g.to_string(),
            });
        }
        entry.push(&values.values[row]);
    }

    let mut columns = Vec::with_capacity(group_keys.len() + 1);
    columns.push(Column::new(
        index_column,
        index_keys.iter().map(|v| (*v).clone()).collect(),
    ));
    for g in &group_keys {
        let column_values = index_keys
            .iter()
            .map(|i| match cells.get(&(*i, *g)) {
                Some(found) => resolve(found, policy),
                None => Value::Null,
            })
            .collect();
        columns.push(Column::new(g.to_string(), column_values));
    }

    let wide = Table::new(columns)?;
    log::info!(
        "Pivoted {} rows into {} x {} (index '{index_column}', groups '{group_column}')",
        table.num_rows(),
        wide.num_rows(),
        group_keys.len()
    );
    Ok(Pivoted {
        table: wide,
        index_column: index_column.to_string(),
        groups: group_keys.into_iter().cloned().collect(),
    })
}

fn resolve(found: &[&Value], policy: DuplicatePolicy) -> Value {
    match (found, policy) {
        ([single], _) => (*single).clone(),
        (_, DuplicatePolicy::Reduce(reducer)) => reducer
            .apply(found.iter().copied())
            .map_or(Value::Null, Value::Float),
        // Reject never gets here with more than one cell.
        (_, DuplicatePolicy::Reject | DuplicatePolicy::KeepLast) => {
            found.last().map_or(Value::Null, |v| (*v).clone())
        }
    }
}

/// Re-flatten a pivot result into (index, group, value) rows.
///
/// Group cells carry the original group values, so a pivot of unique
/// (index, group) pairs round-trips exactly. Missing cells produce no row.
pub fn unpivot(
    pivoted: &Pivoted,
    group_name: &str,
    value_name: &str,
) -> Result<Table, PivotError> {
    let index_column = pivoted.index_column.as_str();
    if group_name == index_column || group_name == value_name || index_column == value_name {
        return Err(PivotError::Degenerate {
            group: group_name.to_string(),
            index: index_column.to_string(),
            value: value_name.to_string(),
        });
    }
    let table = &pivoted.table;
    let index = table.require(index_column)?;
    let group_columns: Vec<(&Column, &Value)> = table
        .columns()
        .iter()
        .filter(|c| c.name != index_column)
        .zip(&pivoted.groups)
        .collect();

    let (mut idx, mut grp, mut val) = (Vec::new(), Vec::new(), Vec::new());
    for row in 0..table.num_rows() {
        for (col, group) in &group_columns {
            let cell = &col.values[row];
            if cell.is_null() {
                continue;
            }
            idx.push(index.values[row].clone());
            grp.push((*group).clone());
            val.push(cell.clone());
        }
    }
    Ok(Table::new(vec![
        Column::new(index_column, idx),
        Column::new(group_name, grp),
        Column::new(value_name, val),
    ])?)
}
