use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use super::model::{Column, DataError, Table, Value};
use super::types::{ColumnType, ColumnTypes};

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// A row predicate over one column's cells.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Inclusive `[start, end]`.
    DateRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// Inclusive `[min, max]`.
    NumericRange { min: f64, max: f64 },
    /// Cell must be one of the listed values. `Value::Null` in the set keeps
    /// rows with a missing cell.
    OneOf(BTreeSet<Value>),
}

impl Predicate {
    /// Ranges with equal bounds are never offered and are skipped.
    pub fn is_noop(&self) -> bool {
        match self {
            Predicate::DateRange { start, end } => start == end,
            Predicate::NumericRange { min, max } => min == max,
            Predicate::OneOf(_) => false,
        }
    }

    /// Whether one cell passes. Missing cells never fall inside a range.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::DateRange { start, end } => value
                .as_datetime()
                .is_some_and(|dt| *start <= dt && dt <= *end),
            Predicate::NumericRange { min, max } => value
                .as_f64()
                .is_some_and(|x| *min <= x && x <= *max),
            Predicate::OneOf(allowed) => allowed.contains(value),
        }
    }
}

/// A predicate bound to a column name.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    pub column: String,
    pub predicate: Predicate,
}

impl ColumnFilter {
    pub fn new(column: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            column: column.into(),
            predicate,
        }
    }
}

/// The active filter set, applied conjunctively.
pub type FilterState = Vec<ColumnFilter>;

// ---------------------------------------------------------------------------
// Defaults offered to the user
// ---------------------------------------------------------------------------

/// Initialise a [`FilterState`] spanning every present value.
///
/// Numeric and datetime columns get their full extent, unless min == max, in
/// which case no control is offered. Categorical columns start with every
/// distinct value selected, including `Null` when the column has gaps.
/// Range defaults still drop rows whose cell in that column is missing.
pub fn init_filter_state(table: &Table, types: &ColumnTypes) -> FilterState {
    table
        .columns()
        .iter()
        .filter_map(|col| {
            let predicate = match types.get(&col.name)? {
                ColumnType::Numeric => {
                    let (min, max) = numeric_extent(col)?;
                    Predicate::NumericRange { min, max }
                }
                ColumnType::DateTime => {
                    let (start, end) = datetime_extent(col)?;
                    Predicate::DateRange { start, end }
                }
                ColumnType::Categorical => Predicate::OneOf(col.distinct().into_iter().collect()),
            };
            (!predicate.is_noop()).then(|| ColumnFilter::new(col.name.clone(), predicate))
        })
        .collect()
}

/// `(min, max)` of the numeric cells.
pub fn numeric_extent(column: &Column) -> Option<(f64, f64)> {
    column
        .values
        .iter()
        .filter_map(Value::as_f64)
        .filter(|x| !x.is_nan())
        .fold(None, |acc, x| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((f64::min(lo, x), f64::max(hi, x))),
        })
}

/// Earliest and latest datetime cells.
pub fn datetime_extent(column: &Column) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let mut dates = column.values.iter().filter_map(Value::as_datetime);
    let first = dates.next()?;
    Some(dates.fold((first, first), |(lo, hi), dt| (lo.min(dt), hi.max(dt))))
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Return indices of rows that pass all active filters.
pub fn filtered_indices(table: &Table, filters: &[ColumnFilter]) -> Result<Vec<usize>, DataError> {
    let active: Vec<(&Column, &Predicate)> = filters
        .iter()
        .filter(|f| !f.predicate.is_noop())
        .map(|f| table.require(&f.column).map(|col| (col, &f.predicate)))
        .collect::<Result<_, DataError>>()?;

    Ok((0..table.num_rows())
        .filter(|&row| {
            active
                .iter()
                .all(|(col, predicate)| predicate.matches(&col.values[row]))
        })
        .collect())
}

/// Keep only the rows that satisfy every filter. No filters returns the
/// table unchanged; an empty result is a valid table with zero rows.
pub fn apply_filters(table: &Table, filters: &[ColumnFilter]) -> Result<Table, DataError> {
    if filters.is_empty() {
        return Ok(table.clone());
    }
    let rows = filtered_indices(table, filters)?;
    log::debug!(
        "Filters kept {} of {} rows ({} filters)",
        rows.len(),
        table.num_rows(),
        filters.len()
    );
    Ok(table.take_rows(&rows))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::data::types::classify;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn table() -> Table {
        Table::new(vec![
            Column::new(
                "amount",
                vec![1i64.into(), 5i64.into(), 10i64.into(), 50i64.into(), Value::Null],
            ),
            Column::new(
                "region",
                vec!["n".into(), "s".into(), "n".into(), Value::Null, "e".into()],
            ),
            Column::new(
                "day",
                vec![day(1).into(), day(2).into(), day(3).into(), day(4).into(), day(5).into()],
            ),
        ])
        .unwrap()
    }

    fn amounts(t: &Table) -> Vec<Value> {
        t.column("amount").unwrap().values.clone()
    }

    #[test]
    fn numeric_range_is_inclusive() {
        let out = apply_filters(
            &table(),
            &[ColumnFilter::new("amount", Predicate::NumericRange { min: 5.0, max: 10.0 })],
        )
        .unwrap();
        assert_eq!(amounts(&out), vec![Value::Integer(5), Value::Integer(10)]);
    }

    #[test]
    fn filters_are_conjunctive() {
        let filters = vec![
            ColumnFilter::new("amount", Predicate::NumericRange { min: 1.0, max: 10.0 }),
            ColumnFilter::new("region", Predicate::OneOf(BTreeSet::from([Value::from("n")]))),
        ];
        let out = apply_filters(&table(), &filters).unwrap();
        assert_eq!(amounts(&out), vec![Value::Integer(1), Value::Integer(10)]);

        let mut reversed = filters.clone();
        reversed.reverse();
        assert_eq!(apply_filters(&table(), &reversed).unwrap(), out);
    }

    #[test]
    fn date_range_is_inclusive() {
        let out = apply_filters(
            &table(),
            &[ColumnFilter::new("day", Predicate::DateRange { start: day(2), end: day(3) })],
        )
        .unwrap();
        assert_eq!(amounts(&out), vec![Value::Integer(5), Value::Integer(10)]);
    }

    #[test]
    fn equal_bounds_are_skipped() {
        let out = apply_filters(
            &table(),
            &[ColumnFilter::new("amount", Predicate::NumericRange { min: 5.0, max: 5.0 })],
        )
        .unwrap();
        assert_eq!(out, table());
    }

    #[test]
    fn missing_cells_fail_ranges_and_need_explicit_membership() {
        let range = apply_filters(
            &table(),
            &[ColumnFilter::new("amount", Predicate::NumericRange { min: 0.0, max: 100.0 })],
        )
        .unwrap();
        assert_eq!(range.num_rows(), 4);

        let without_null = ColumnFilter::new(
            "region",
            Predicate::OneOf(BTreeSet::from(["n".into(), "s".into(), Value::from("e")])),
        );
        assert_eq!(apply_filters(&table(), &[without_null]).unwrap().num_rows(), 4);

        let with_null = ColumnFilter::new("region", Predicate::OneOf(BTreeSet::from([Value::Null])));
        assert_eq!(
            amounts(&apply_filters(&table(), &[with_null]).unwrap()),
            vec![Value::Integer(50)]
        );
    }

    #[test]
    fn no_filters_and_empty_results() {
        assert_eq!(apply_filters(&table(), &[]).unwrap(), table());

        let none = apply_filters(
            &table(),
            &[ColumnFilter::new("region", Predicate::OneOf(BTreeSet::new()))],
        )
        .unwrap();
        assert_eq!(none.num_rows(), 0);
        assert_eq!(none.num_columns(), 3);
    }

    #[test]
    fn refiltering_is_idempotent() {
        let filters = vec![ColumnFilter::new("amount", Predicate::NumericRange { min: 2.0, max: 60.0 })];
        let once = apply_filters(&table(), &filters).unwrap();
        let twice = apply_filters(&once, &filters).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn unknown_column_is_reported() {
        let err = apply_filters(&table(), &[ColumnFilter::new("nope", Predicate::OneOf(BTreeSet::new()))])
            .unwrap_err();
        assert_eq!(err, DataError::UnknownColumn("nope".into()));
    }

    #[test]
    fn default_state_only_drops_missing_range_cells() {
        let t = table();
        let state = init_filter_state(&t, &classify(&t));
        assert_eq!(state.len(), 3);
        assert_eq!(
            state[0].predicate,
            Predicate::NumericRange { min: 1.0, max: 50.0 }
        );
        assert!(matches!(&state[1].predicate, Predicate::OneOf(s) if s.contains(&Value::Null)));
        assert_eq!(apply_filters(&t, &state).unwrap().num_rows(), 4);
    }

    #[test]
    fn degenerate_columns_get_no_control() {
        let t = Table::new(vec![Column::new("k", vec![3i64.into(), 3i64.into()])]).unwrap();
        assert!(init_filter_state(&t, &classify(&t)).is_empty());
    }
}
