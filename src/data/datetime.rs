use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

use super::model::{Column, Table, Value};
use crate::config::DashboardConfig;

/// What happened to one candidate column during normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOutcome {
    /// Every cell was processed; `nulled` cells could not be parsed.
    Converted {
        column: String,
        converted: usize,
        nulled: usize,
    },
    /// The column holds cells that cannot be coerced at all; left untouched.
    Failed { column: String, reason: String },
}

impl ColumnOutcome {
    pub fn column(&self) -> &str {
        match self {
            ColumnOutcome::Converted { column, .. } | ColumnOutcome::Failed { column, .. } => {
                column
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ColumnOutcome::Converted { .. })
    }
}

/// A cell kind with no datetime interpretation at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} values are not convertible to datetime")]
pub struct StructuralError {
    kind: &'static str,
}

/// Whether a column name contains one of the datetime tokens.
pub fn is_datetime_candidate(name: &str, tokens: &[String]) -> bool {
    let lowered = name.to_lowercase();
    tokens
        .iter()
        .any(|t| !t.is_empty() && lowered.contains(&t.to_lowercase()))
}

/// Coerce every candidate column to datetimes; other columns pass through.
///
/// Per-cell failures become [`Value::Null`]. A structural failure, or a
/// column where no present cell parses, leaves the whole column as it was
/// and is reported as [`ColumnOutcome::Failed`].
pub fn normalize(mut table: Table, config: &DashboardConfig) -> (Table, Vec<ColumnOutcome>) {
    let candidates: Vec<Column> = table
        .columns()
        .iter()
        .filter(|c| is_datetime_candidate(&c.name, &config.datetime_tokens))
        .cloned()
        .collect();

    let mut outcomes = Vec::with_capacity(candidates.len());
    for column in candidates {
        match coerce_column(&column.values, &config.datetime_formats) {
            Ok(values) => {
                let missing_before = column.values.iter().filter(|v| v.is_null()).count();
                let converted = values.iter().filter(|v| !v.is_null()).count();
                let nulled = values.len() - converted - missing_before;
                let name = column.name.clone();
                if converted == 0 && nulled > 0 {
                    log::warn!("Column '{name}' left unchanged: no value parses as a datetime");
                    outcomes.push(ColumnOutcome::Failed {
                        column: name,
                        reason: format!("none of {nulled} values parse as a datetime"),
                    });
                    continue;
                }
                if let Err(e) = table.replace_column(Column::new(name.clone(), values)) {
                    outcomes.push(ColumnOutcome::Failed {
                        column: name,
                        reason: e.to_string(),
                    });
                    continue;
                }
                log::info!("Converted column '{name}' to datetime ({nulled} unparseable)");
                outcomes.push(ColumnOutcome::Converted {
                    column: name,
                    converted,
                    nulled,
                });
            }
            Err(e) => {
                log::warn!("Column '{}' left unchanged: {e}", column.name);
                outcomes.push(ColumnOutcome::Failed {
                    column: column.name,
                    reason: e.to_string(),
                });
            }
        }
    }
    (table, outcomes)
}

fn coerce_column(values: &[Value], formats: &[String]) -> Result<Vec<Value>, StructuralError> {
    values
        .iter()
        .map(|v| coerce_value(v, formats).map(|dt| dt.map_or(Value::Null, Value::DateTime)))
        .collect()
}

/// `Ok(None)` is a per-cell miss, `Err` a kind that can never convert.
pub fn coerce_value(
    value: &Value,
    formats: &[String],
) -> Result<Option<NaiveDateTime>, StructuralError> {
    match value {
        Value::DateTime(dt) => Ok(Some(*dt)),
        Value::String(s) => Ok(parse_datetime(s, formats)),
        Value::Integer(i) => Ok(compact_date(*i)),
        Value::Float(_) | Value::Null => Ok(None),
        Value::Bool(_) => Err(StructuralError { kind: "boolean" }),
    }
}

/// `20230105` style integers.
fn compact_date(i: i64) -> Option<NaiveDateTime> {
    if !(10_000_101..=99_991_231).contains(&i) {
        return None;
    }
    let year = i32::try_from(i / 10_000).ok()?;
    let month = u32::try_from(i / 100 % 100).ok()?;
    let day = u32::try_from(i % 100).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
}

/// Try every format, first as a datetime then as a bare date at midnight.
pub fn parse_datetime(text: &str, formats: &[String]) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    formats.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(text, fmt).ok().or_else(|| {
            NaiveDate::parse_from_str(text, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn midnight(y: i32, m: u32, d: u32) -> Value {
        Value::DateTime(NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn matches_tokens_case_insensitively() {
        let tokens = DashboardConfig::default().datetime_tokens;
        assert!(is_datetime_candidate("下单日期", &tokens));
        assert!(is_datetime_candidate("创建时间", &tokens));
        assert!(is_datetime_candidate("Order Date", &tokens));
        assert!(!is_datetime_candidate("amount", &tokens));
    }

    #[test]
    fn converts_cells_independently() {
        let table = Table::new(vec![
            Column::new(
                "日期",
                vec!["2023-01-05".into(), "garbage".into(), Value::Null, "2023/02/01 08:30:00".into()],
            ),
            Column::new("amount", vec![1i64.into(), 2i64.into(), 3i64.into(), 4i64.into()]),
        ])
        .unwrap();

        let (out, outcomes) = normalize(table.clone(), &DashboardConfig::default());

        let dates = &out.column("日期").unwrap().values;
        assert_eq!(dates[0], midnight(2023, 1, 5));
        assert_eq!(dates[1], Value::Null);
        assert_eq!(dates[2], Value::Null);
        assert_eq!(
            dates[3],
            Value::DateTime(
                NaiveDate::from_ymd_opt(2023, 2, 1).unwrap().and_hms_opt(8, 30, 0).unwrap()
            )
        );
        assert_eq!(out.column("amount"), table.column("amount"));
        assert_eq!(
            outcomes,
            vec![ColumnOutcome::Converted {
                column: "日期".into(),
                converted: 2,
                nulled: 1
            }]
        );
    }

    #[test]
    fn boolean_column_is_left_unchanged() {
        let table = Table::new(vec![Column::new(
            "is_daytime",
            vec![Value::Bool(true), Value::Bool(false)],
        )])
        .unwrap();
        let (out, outcomes) = normalize(table.clone(), &DashboardConfig::default());
        assert_eq!(out, table);
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].is_success());
        assert_eq!(outcomes[0].column(), "is_daytime");
    }

    #[test]
    fn numeric_column_named_like_a_time_is_kept() {
        let table = Table::new(vec![
            Column::new("response_time_ms", vec![120i64.into(), 450i64.into()]),
            Column::new("update_count", vec![3i64.into(), Value::Null]),
        ])
        .unwrap();
        let (out, outcomes) = normalize(table.clone(), &DashboardConfig::default());
        assert_eq!(out, table);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.is_success()));
    }

    #[test]
    fn all_missing_candidate_is_converted_trivially() {
        let table = Table::new(vec![Column::new("date", vec![Value::Null])]).unwrap();
        let (_, outcomes) = normalize(table, &DashboardConfig::default());
        assert!(outcomes[0].is_success());
    }

    #[test]
    fn compact_integer_dates_parse() {
        let formats = DashboardConfig::default().datetime_formats;
        assert_eq!(
            coerce_value(&Value::Integer(20230101), &formats).unwrap(),
            midnight(2023, 1, 1).as_datetime()
        );
        assert_eq!(coerce_value(&Value::Float(1.5), &formats).unwrap(), None);
    }

    #[test]
    fn rfc3339_is_accepted() {
        let parsed = parse_datetime("2024-03-01T12:00:00Z", &[]).unwrap();
        assert_eq!(parsed.to_string(), "2024-03-01 12:00:00");
    }
}
