use crate::error::{PlaybookError, Result};
use crate::schema::*;
use crate::utils::sort_periods;
use log::debug;
use serde::{Deserialize, Serialize};

/// A column lookup that falls back to a fixed series when the column is
/// absent from the table. Making the fallback explicit keeps "column
/// missing" distinct from "column present but empty".
#[derive(Debug, Clone, Copy)]
pub struct ColumnOrDefault<'a> {
    pub name: &'a str,
    pub default: &'a [f64],
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Present(Vec<Option<f64>>),
    Defaulted(Vec<f64>),
}

impl<'a> ColumnOrDefault<'a> {
    pub const fn new(name: &'a str, default: &'a [f64]) -> Self {
        Self { name, default }
    }

    pub fn resolve(&self, table: &Table, rows: &[usize]) -> ColumnValues {
        if table.has_column(self.name) {
            ColumnValues::Present(numeric_values(table, rows, self.name))
        } else {
            ColumnValues::Defaulted(self.default.to_vec())
        }
    }
}

impl ColumnValues {
    pub fn is_defaulted(&self) -> bool {
        matches!(self, ColumnValues::Defaulted(_))
    }

    pub fn mean(&self) -> Option<f64> {
        match self {
            ColumnValues::Present(values) => nan_mean(values.iter().copied()),
            ColumnValues::Defaulted(values) => nan_mean(values.iter().copied().map(Some)),
        }
    }
}

const ZERO_SERIES: &[f64] = &[0.0];
const TEMPERATURE_SERIES: &[f64] = &[DEFAULT_AVG_TEMPERATURE];
const EVENT_SERIES: &[f64] = &[DEFAULT_EVENT_COUNT];

pub const AVG_TEMPERATURE_COLUMN: ColumnOrDefault<'static> =
    ColumnOrDefault::new(AVG_TEMPERATURE, TEMPERATURE_SERIES);
pub const EVENT_COUNT_COLUMN: ColumnOrDefault<'static> =
    ColumnOrDefault::new(EVENT_COUNT, EVENT_SERIES);

/// Parses a cell as a number; blanks, missing tokens and garbage are `None`.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    if is_missing(raw) {
        return None;
    }
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Mean of the present values, or `None` when there are none.
pub fn nan_mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn numeric_values(table: &Table, rows: &[usize], column: &str) -> Vec<Option<f64>> {
    rows.iter()
        .map(|&r| table.value(r, column).and_then(coerce_numeric))
        .collect()
}

fn required_mean(table: &Table, rows: &[usize], column: &str) -> Result<Option<f64>> {
    if !table.has_column(column) {
        return Err(PlaybookError::MissingColumn {
            column: column.to_string(),
        });
    }
    Ok(nan_mean(numeric_values(table, rows, column)))
}

/// Each sub-ratio is averaged on its own, then the four means are averaged.
fn youth_rate(table: &Table, rows: &[usize]) -> Option<f64> {
    nan_mean(
        YOUTH_RATIO_COLUMNS
            .iter()
            .map(|name| ColumnOrDefault::new(name, ZERO_SERIES).resolve(table, rows).mean()),
    )
}

fn first_category(table: &Table, rows: &[usize]) -> String {
    rows.iter()
        .find_map(|&r| table.value(r, CATEGORY))
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
}

/// Computes the metric set over the given rows of the merged table.
pub fn summarize(table: &Table, rows: &[usize]) -> Result<MetricSummary> {
    Ok(MetricSummary {
        delivery_rate: required_mean(table, rows, DELIVERY_RATIO)?,
        young_rate: youth_rate(table, rows),
        revisit: required_mean(table, rows, REVISIT_RATIO)?,
        avg_temp: AVG_TEMPERATURE_COLUMN.resolve(table, rows).mean(),
        event_count: EVENT_COUNT_COLUMN.resolve(table, rows).mean(),
        store_type: first_category(table, rows),
    })
}

/// One merchant's metrics next to the population baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantComparison {
    pub code: String,
    pub display_name: String,
    pub periods: Vec<String>,
    pub merchant: MetricSummary,
    pub population: MetricSummary,
}

/// `code` must already be trimmed and upper-cased.
pub fn compare_merchant(table: &Table, code: &str) -> Result<MerchantComparison> {
    let rows = table.merchant_rows(code);
    if rows.is_empty() {
        return Err(PlaybookError::MerchantNotFound(code.to_string()));
    }

    let merchant = summarize(table, &rows)?;
    let population = summarize(table, &table.all_rows())?;
    debug!(
        "Merchant {} has {} rows; population has {}",
        code,
        rows.len(),
        table.len()
    );

    let display_name = match table.value(rows[0], MERCHANT_NAME) {
        Some(name) => format!("{} · {}", name.trim(), code),
        None => code.to_string(),
    };

    let periods = sort_periods(rows.iter().filter_map(|&r| table.value(r, PERIOD)));

    Ok(MerchantComparison {
        code: code.to_string(),
        display_name,
        periods,
        merchant,
        population,
    })
}
