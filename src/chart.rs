//! Series aggregation: turn a table into chart-ready categories and series.

use std::collections::HashMap;
use std::fmt;

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::model::{Column, DataError, Table, Value, DATETIME_FORMAT};
use crate::data::reduce::Reducer;
use crate::data::types::{classify_column, ColumnType, ColumnTypes};

/// Value plotted for a category that has no rows.
pub const FILL_VALUE: f64 = 0.0;

// ---------------------------------------------------------------------------
// Chart kind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Scatter,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [ChartKind::Bar, ChartKind::Line, ChartKind::Scatter];

    /// Unrecognised labels render as bars.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "bar" => ChartKind::Bar,
            "line" => ChartKind::Line,
            "scatter" => ChartKind::Scatter,
            other => {
                log::debug!("unknown chart kind '{other}', falling back to bar");
                ChartKind::Bar
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
        }
    }

    /// Tooltip pointer style: bars get a shaded band, everything else a line.
    pub fn axis_pointer(self) -> &'static str {
        match self {
            ChartKind::Bar => "shadow",
            ChartKind::Line | ChartKind::Scatter => "line",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Chart option
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("series '{series}' has {found} values for {expected} categories")]
    Misaligned {
        series: String,
        expected: usize,
        found: usize,
    },
}

/// One plotted field.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub kind: ChartKind,
    pub values: Vec<f64>,
}

/// Category axis plus aligned series. Construction checks that every series
/// has exactly one value per category.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOption {
    kind: ChartKind,
    categories: Vec<Value>,
    labels: Vec<String>,
    series: Vec<Series>,
}

impl ChartOption {
    pub fn new(
        kind: ChartKind,
        categories: Vec<Value>,
        labels: Vec<String>,
        series: Vec<Series>,
    ) -> Result<Self, ChartError> {
        if labels.len() != categories.len() {
            return Err(ChartError::Misaligned {
                series: "<labels>".to_string(),
                expected: categories.len(),
                found: labels.len(),
            });
        }
        if let Some(bad) = series.iter().find(|s| s.values.len() != categories.len()) {
            return Err(ChartError::Misaligned {
                series: bad.name.clone(),
                expected: categories.len(),
                found: bad.values.len(),
            });
        }
        Ok(Self {
            kind,
            categories,
            labels,
            series,
        })
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    /// Category values in axis order.
    pub fn categories(&self) -> &[Value] {
        &self.categories
    }

    /// Display labels, one per category.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Render as an ECharts option object.
    pub fn to_echarts(&self) -> serde_json::Result<serde_json::Value> {
        let option = EChartsOption {
            tooltip: Tooltip {
                trigger: "axis",
                axis_pointer: TypeTag {
                    kind: self.kind.axis_pointer(),
                },
            },
            legend: Legend {
                data: self.series.iter().map(|s| s.name.as_str()).collect(),
            },
            x_axis: XAxis {
                kind: "category",
                data: &self.labels,
                axis_label: AxisLabel {
                    rotate: 45,
                    interval: 0,
                },
            },
            y_axis: TypeTag { kind: "value" },
            series: self
                .series
                .iter()
                .map(|s| EChartsSeries {
                    name: &s.name,
                    kind: s.kind.label(),
                    data: &s.values,
                })
                .collect(),
        };
        serde_json::to_value(option)
    }
}

// -- ECharts wire shapes --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EChartsOption<'a> {
    tooltip: Tooltip,
    legend: Legend<'a>,
    x_axis: XAxis<'a>,
    y_axis: TypeTag,
    series: Vec<EChartsSeries<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tooltip {
    trigger: &'static str,
    axis_pointer: TypeTag,
}

#[derive(Serialize)]
struct TypeTag {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct Legend<'a> {
    data: Vec<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct XAxis<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a [String],
    axis_label: AxisLabel,
}

#[derive(Serialize)]
struct AxisLabel {
    rotate: i32,
    interval: i32,
}

#[derive(Serialize)]
struct EChartsSeries<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a [f64],
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Group `table` by `x_column`, reduce each of `y_columns` per group and
/// align the results onto the ordered category axis.
///
/// `column_types` decides the axis order; a column missing from the map is
/// classified on the spot. Missing x cells form no category.
pub fn build_chart(
    table: &Table,
    x_column: &str,
    y_columns: &[String],
    column_types: &ColumnTypes,
    kind: ChartKind,
    reducer: Reducer,
) -> Result<ChartOption, ChartError> {
    let x = table.require(x_column)?;
    let x_type = column_types
        .get(x_column)
        .copied()
        .unwrap_or_else(|| classify_column(x));

    let categories = ordered_categories(x, x_type);
    let labels = category_labels(&categories, x_type);

    let mut groups: HashMap<&Value, Vec<usize>> = HashMap::new();
    for (row, cell) in x.values.iter().enumerate() {
        if !cell.is_null() {
            groups.entry(cell).or_default().push(row);
        }
    }

    let series = y_columns
        .iter()
        .map(|name| -> Result<Series, ChartError> {
            let y = table.require(name)?;
            let values = categories
                .iter()
                .map(|category| {
                    groups
                        .get(category)
                        .and_then(|rows| reducer.apply(rows.iter().map(|&r| &y.values[r])))
                        .unwrap_or(FILL_VALUE)
                })
                .collect();
            Ok(Series {
                name: name.clone(),
                kind,
                values,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "Built {kind} chart over '{x_column}': {} categories, {} series ({reducer})",
        categories.len(),
        series.len()
    );
    ChartOption::new(kind, categories, labels, series)
}

/// Distinct non-missing values of the column in axis order: chronological for
/// datetimes, ascending for numbers, first appearance otherwise.
pub fn ordered_categories(column: &Column, column_type: ColumnType) -> Vec<Value> {
    let mut categories = column.distinct_present();
    match column_type {
        ColumnType::DateTime => categories.sort_by_key(Value::as_datetime),
        ColumnType::Numeric => categories.sort_by(|a, b| match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.cmp(b),
        }),
        ColumnType::Categorical => {}
    }
    categories
}

/// Axis labels. Datetime axes drop the time part when every category sits
/// at midnight.
pub fn category_labels(categories: &[Value], column_type: ColumnType) -> Vec<String> {
    if column_type != ColumnType::DateTime {
        return categories.iter().map(Value::to_string).collect();
    }
    let date_only = categories
        .iter()
        .filter_map(Value::as_datetime)
        .all(|dt| dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0);
    let format = if date_only { "%Y-%m-%d" } else { DATETIME_FORMAT };
    categories
        .iter()
        .map(|v| match v.as_datetime() {
            Some(dt) => dt.format(format).to_string(),
            None => v.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::classify;

    fn chart(table: &Table, x: &str, ys: &[&str], reducer: Reducer) -> ChartOption {
        let ys: Vec<String> = ys.iter().map(|s| s.to_string()).collect();
        build_chart(table, x, &ys, &classify(table), ChartKind::Bar, reducer).unwrap()
    }

    fn abab() -> Table {
        Table::new(vec![
            Column::new("x", vec!["A".into(), "A".into(), "B".into()]),
            Column::new("y", vec![2i64.into(), 4i64.into(), 10i64.into()]),
        ])
        .unwrap()
    }

    #[test]
    fn aggregates_per_category() {
        let t = abab();
        let mean = chart(&t, "x", &["y"], Reducer::Mean);
        assert_eq!(mean.labels(), ["A", "B"]);
        assert_eq!(mean.series()[0].values, vec![3.0, 10.0]);
        assert_eq!(chart(&t, "x", &["y"], Reducer::Count).series()[0].values, vec![2.0, 1.0]);
        assert_eq!(chart(&t, "x", &["y"], Reducer::Sum).series()[0].values, vec![6.0, 10.0]);
        assert_eq!(chart(&t, "x", &["y"], Reducer::Max).series()[0].values, vec![4.0, 10.0]);
        assert_eq!(chart(&t, "x", &["y"], Reducer::Min).series()[0].values, vec![2.0, 10.0]);
        assert_eq!(chart(&t, "x", &["y"], Reducer::Median).series()[0].values, vec![3.0, 10.0]);
    }

    #[test]
    fn categories_without_values_fill_with_zero() {
        let t = Table::new(vec![
            Column::new("x", vec!["A".into(), "B".into(), "C".into()]),
            Column::new("y", vec![3i64.into(), Value::Null, 7i64.into()]),
        ])
        .unwrap();
        let option = chart(&t, "x", &["y"], Reducer::Sum);
        assert_eq!(option.labels(), ["A", "B", "C"]);
        assert_eq!(option.series()[0].values, vec![3.0, 0.0, 7.0]);

        let mean = chart(&t, "x", &["y"], Reducer::Mean);
        assert_eq!(mean.series()[0].values, vec![3.0, 0.0, 7.0]);
    }

    #[test]
    fn categorical_axis_keeps_first_appearance() {
        let t = Table::new(vec![
            Column::new("x", vec!["pear".into(), "apple".into(), "pear".into(), "fig".into()]),
            Column::new("y", vec![1i64.into(), 1i64.into(), 1i64.into(), 1i64.into()]),
        ])
        .unwrap();
        assert_eq!(chart(&t, "x", &["y"], Reducer::Sum).labels(), ["pear", "apple", "fig"]);
    }

    #[test]
    fn numeric_axis_sorts_by_value() {
        let t = Table::new(vec![
            Column::new("x", vec![10i64.into(), 2i64.into(), 2.5.into(), Value::Null]),
            Column::new("y", vec![1i64.into(), 1i64.into(), 1i64.into(), 1i64.into()]),
        ])
        .unwrap();
        let option = chart(&t, "x", &["y"], Reducer::Count);
        assert_eq!(option.labels(), ["2", "2.5", "10"]);
        assert_eq!(option.series()[0].values, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn integer_and_float_spellings_form_one_category() {
        let t = crate::data::loader::read_csv("x,y\n2,1\n2.0,3\n5,1\n".as_bytes()).unwrap();
        let option = chart(&t, "x", &["y"], Reducer::Sum);
        assert_eq!(option.labels(), ["2", "5"]);
        assert_eq!(option.series()[0].values, vec![4.0, 1.0]);
    }

    #[test]
    fn datetime_axis_sorts_chronologically() {
        let day = |m: u32, h: u32| {
            Value::DateTime(
                chrono::NaiveDate::from_ymd_opt(2023, m, 1)
                    .unwrap()
                    .and_hms_opt(h, 0, 0)
                    .unwrap(),
            )
        };
        let t = Table::new(vec![
            Column::new("when", vec![day(3, 0), day(1, 0), day(2, 0)]),
            Column::new("y", vec![3i64.into(), 1i64.into(), 2i64.into()]),
        ])
        .unwrap();
        let option = chart(&t, "when", &["y"], Reducer::Sum);
        assert_eq!(option.labels(), ["2023-01-01", "2023-02-01", "2023-03-01"]);
        assert_eq!(option.series()[0].values, vec![1.0, 2.0, 3.0]);

        let with_time = Table::new(vec![
            Column::new("when", vec![day(1, 12), day(1, 0)]),
            Column::new("y", vec![1i64.into(), 1i64.into()]),
        ])
        .unwrap();
        assert_eq!(
            chart(&with_time, "when", &["y"], Reducer::Sum).labels(),
            ["2023-01-01 00:00:00", "2023-01-01 12:00:00"]
        );
    }

    #[test]
    fn no_y_columns_yields_no_series() {
        let option = chart(&abab(), "x", &[], Reducer::Sum);
        assert_eq!(option.labels().len(), 2);
        assert!(option.series().is_empty());
    }

    #[test]
    fn single_category() {
        let t = Table::new(vec![
            Column::new("x", vec!["only".into(), "only".into()]),
            Column::new("y", vec![1i64.into(), 2i64.into()]),
        ])
        .unwrap();
        let option = chart(&t, "x", &["y"], Reducer::Sum);
        assert_eq!(option.categories().len(), 1);
        assert_eq!(option.series()[0].values, vec![3.0]);
    }

    #[test]
    fn unknown_reducer_label_behaves_like_sum() {
        let t = abab();
        assert_eq!(
            chart(&t, "x", &["y"], Reducer::from_label("geometric mean")),
            chart(&t, "x", &["y"], Reducer::Sum)
        );
    }

    #[test]
    fn every_series_matches_category_count() {
        let t = Table::new(vec![
            Column::new("x", vec!["a".into(), "b".into(), "c".into(), Value::Null]),
            Column::new("y1", vec![1i64.into(), Value::Null, 2i64.into(), 5i64.into()]),
            Column::new("y2", vec![Value::Null, Value::Null, 1.5.into(), 1.0.into()]),
        ])
        .unwrap();
        let option = chart(&t, "x", &["y1", "y2"], Reducer::Max);
        for s in option.series() {
            assert_eq!(s.values.len(), option.categories().len());
            assert!(s.values.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn misaligned_series_are_rejected() {
        let err = ChartOption::new(
            ChartKind::Line,
            vec!["a".into()],
            vec!["a".into()],
            vec![Series {
                name: "y".into(),
                kind: ChartKind::Line,
                values: vec![],
            }],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ChartError::Misaligned {
                series: "y".into(),
                expected: 1,
                found: 0
            }
        );
    }

    #[test]
    fn unknown_columns_are_reported() {
        let t = abab();
        let err = build_chart(&t, "x", &["nope".to_string()], &classify(&t), ChartKind::Bar, Reducer::Sum)
            .unwrap_err();
        assert_eq!(err, ChartError::Data(DataError::UnknownColumn("nope".into())));
    }

    #[test]
    fn exports_echarts_schema() {
        let t = abab();
        let ys = vec!["y".to_string()];
        let option = build_chart(&t, "x", &ys, &classify(&t), ChartKind::Line, Reducer::Sum).unwrap();
        let json = option.to_echarts().unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tooltip": {"trigger": "axis", "axisPointer": {"type": "line"}},
                "legend": {"data": ["y"]},
                "xAxis": {"type": "category", "data": ["A", "B"], "axisLabel": {"rotate": 45, "interval": 0}},
                "yAxis": {"type": "value"},
                "series": [{"name": "y", "type": "line", "data": [6.0, 10.0]}]
            })
        );
    }

    #[test]
    fn chart_kind_labels() {
        assert_eq!(ChartKind::from_label("Scatter"), ChartKind::Scatter);
        assert_eq!(ChartKind::from_label("pie"), ChartKind::Bar);
        assert_eq!(ChartKind::Bar.axis_pointer(), "shadow");
        assert_eq!(ChartKind::Line.axis_pointer(), "line");
    }
}
