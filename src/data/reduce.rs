use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::Value;

/// Collapses a group of cells into one scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    #[default]
    Sum,
    Mean,
    Max,
    Min,
    Median,
    Count,
}

impl Reducer {
    pub const ALL: [Reducer; 6] = [
        Reducer::Sum,
        Reducer::Mean,
        Reducer::Max,
        Reducer::Min,
        Reducer::Median,
        Reducer::Count,
    ];

    /// Map a selector label (English or the dashboard's Chinese labels) to a
    /// reducer. Anything unrecognised reduces with [`Reducer::Sum`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "sum" | "求和" => Reducer::Sum,
            "mean" | "avg" | "average" | "平均值" => Reducer::Mean,
            "max" | "最大值" => Reducer::Max,
            "min" | "最小值" => Reducer::Min,
            "median" | "中位数" => Reducer::Median,
            "count" | "计数" => Reducer::Count,
            other => {
                log::debug!("unknown reducer label '{other}', falling back to sum");
                Reducer::Sum
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Max => "max",
            Reducer::Min => "min",
            Reducer::Median => "median",
            Reducer::Count => "count",
        }
    }

    /// Reduce a group of cells.
    ///
    /// `Count` counts non-missing cells of any kind; the other reducers only
    /// look at numeric cells. `None` means the group has nothing to reduce
    /// (e.g. the mean of no numbers); callers decide how to fill it.
    pub fn apply<'a, I>(self, values: I) -> Option<f64>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let values = values.into_iter();
        match self {
            Reducer::Count => Some(values.filter(|v| !v.is_null()).count() as f64),
            Reducer::Sum => Some(values.filter_map(Value::as_f64).sum()),
            Reducer::Mean => {
                let (total, n) = values
                    .filter_map(Value::as_f64)
                    .fold((0.0, 0usize), |(t, n), x| (t + x, n + 1));
                (n > 0).then(|| total / n as f64)
            }
            Reducer::Max => values.filter_map(Value::as_f64).reduce(f64::max),
            Reducer::Min => values.filter_map(Value::as_f64).reduce(f64::min),
            Reducer::Median => median(values.filter_map(Value::as_f64).collect()),
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn median(mut numbers: Vec<f64>) -> Option<f64> {
    if numbers.is_empty() {
        return None;
    }
    numbers.sort_by(f64::total_cmp);
    let mid = numbers.len() / 2;
    if numbers.len() % 2 == 0 {
        Some((numbers[mid - 1] + numbers[mid]) / 2.0)
    } else {
        Some(numbers[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(xs: &[f64]) -> Vec<Value> {
        xs.iter().copied().map(Value::Float).collect()
    }

    #[test]
    fn reduces_numbers() {
        let v = cells(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(Reducer::Sum.apply(&v), Some(10.0));
        assert_eq!(Reducer::Mean.apply(&v), Some(2.5));
        assert_eq!(Reducer::Max.apply(&v), Some(4.0));
        assert_eq!(Reducer::Min.apply(&v), Some(1.0));
        assert_eq!(Reducer::Median.apply(&v), Some(2.5));
        assert_eq!(Reducer::Count.apply(&v), Some(4.0));
    }

    #[test]
    fn odd_median_picks_middle() {
        assert_eq!(Reducer::Median.apply(&cells(&[9.0, 1.0, 5.0])), Some(5.0));
    }

    #[test]
    fn missing_cells_are_skipped() {
        let v = vec![Value::Integer(2), Value::Null, Value::Integer(4)];
        assert_eq!(Reducer::Mean.apply(&v), Some(3.0));
        assert_eq!(Reducer::Count.apply(&v), Some(2.0));
    }

    #[test]
    fn empty_groups() {
        let v: Vec<Value> = vec![Value::Null];
        assert_eq!(Reducer::Sum.apply(&v), Some(0.0));
        assert_eq!(Reducer::Mean.apply(&v), None);
        assert_eq!(Reducer::Median.apply(&v), None);
        assert_eq!(Reducer::Count.apply(&v), Some(0.0));
    }

    #[test]
    fn labels_map_to_reducers() {
        assert_eq!(Reducer::from_label("平均值"), Reducer::Mean);
        assert_eq!(Reducer::from_label("计数"), Reducer::Count);
        assert_eq!(Reducer::from_label(" Median "), Reducer::Median);
        assert_eq!(Reducer::from_label("variance"), Reducer::Sum);
        assert_eq!(Reducer::from_label(""), Reducer::Sum);
    }
}
