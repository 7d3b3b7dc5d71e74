use crate::error::{PlaybookError, Result};
use serde::{Deserialize, Serialize};

/// Merchant identifier column shared by all three sources.
pub const MERCHANT_ID: &str = "ENCODED_MCT";
/// Year-month reporting period, e.g. `202401`.
pub const PERIOD: &str = "TA_YM";
pub const MERCHANT_NAME: &str = "MCT_NM";
pub const CATEGORY: &str = "HPSN_MCT_BZN_CD_NM";
pub const DELIVERY_RATIO: &str = "DLV_SAA_RAT";
pub const REVISIT_RATIO: &str = "MCT_UE_CLN_REU_RAT";
pub const MALE_1020_RATIO: &str = "M12_MAL_1020_RAT";
pub const MALE_30_RATIO: &str = "M12_MAL_30_RAT";
pub const FEMALE_1020_RATIO: &str = "M12_FME_1020_RAT";
pub const FEMALE_30_RATIO: &str = "M12_FME_30_RAT";
pub const AVG_TEMPERATURE: &str = "평균기온";
pub const EVENT_COUNT: &str = "지역이벤트발생횟수";

pub const YOUTH_RATIO_COLUMNS: [&str; 4] = [
    MALE_1020_RATIO,
    MALE_30_RATIO,
    FEMALE_1020_RATIO,
    FEMALE_30_RATIO,
];

/// Columns whose values are treated as string keys and trimmed on load.
pub const KEY_COLUMNS: [&str; 2] = [MERCHANT_ID, PERIOD];

pub const UNKNOWN_CATEGORY: &str = "업종불명";
pub const DEFAULT_AVG_TEMPERATURE: f64 = 24.6;
pub const DEFAULT_EVENT_COUNT: f64 = 1.0;

/// A rectangular string table. Every row has exactly `columns.len()` cells;
/// an empty cell is a missing value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TryFrom<RawTable> for Table {
    type Error = PlaybookError;

    fn try_from(raw: RawTable) -> Result<Self> {
        Table::try_new(raw.columns, raw.rows)
    }
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self { columns, rows }
    }

    /// Like [`Table::new`], but rejects rows whose length differs from the
    /// header.
    pub fn try_new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(PlaybookError::RaggedRow {
                row,
                expected: columns.len(),
                found: cells.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell value, `None` when the column is absent or the cell is missing.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows
            .get(row)
            .and_then(|r| r.get(idx))
            .map(String::as_str)
            .filter(|v| !is_missing(v))
    }

    /// Indices of the rows whose merchant identifier, trimmed and
    /// upper-cased, equals `code`.
    pub fn merchant_rows(&self, code: &str) -> Vec<usize> {
        let Some(idx) = self.column_index(MERCHANT_ID) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                row.get(idx)
                    .is_some_and(|cell| normalize_merchant_code(cell) == code)
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn all_rows(&self) -> Vec<usize> {
        (0..self.rows.len()).collect()
    }
}

/// Trims and upper-cases a merchant code the way queries are matched.
pub fn normalize_merchant_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Tokens treated as missing cells, on top of blank strings.
pub fn is_missing(value: &str) -> bool {
    matches!(
        value.trim(),
        "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None"
    )
}

/// Scalar metrics for one merchant or for the whole population. `None`
/// marks an undefined mean (no numeric values to average).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub delivery_rate: Option<f64>,
    pub young_rate: Option<f64>,
    pub revisit: Option<f64>,
    pub avg_temp: Option<f64>,
    pub event_count: Option<f64>,
    pub store_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Cafe,
    RevisitRecovery,
    FoodService,
    DeliveryUplift,
    YouthSns,
}

impl StrategyKind {
    pub fn marker_category(&self) -> MarkerCategory {
        match self {
            StrategyKind::Cafe => MarkerCategory::Cafe,
            StrategyKind::RevisitRecovery => MarkerCategory::Down,
            StrategyKind::FoodService => MarkerCategory::Food,
            StrategyKind::DeliveryUplift => MarkerCategory::Delivery,
            StrategyKind::YouthSns => MarkerCategory::Sns,
        }
    }
}

/// Groups of decorative markers sprinkled into template bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerCategory {
    Delivery,
    Sns,
    Down,
    Cafe,
    Food,
}

impl MarkerCategory {
    pub fn markers(&self) -> &'static [&'static str] {
        match self {
            MarkerCategory::Delivery => &["🚚", "🍱", "🛵", "📦"],
            MarkerCategory::Sns => &["📱", "💬", "📸", "🔥", "🎯"],
            MarkerCategory::Down => &["📉", "🫤", "💤"],
            MarkerCategory::Cafe => &["☕", "🍰", "🪑", "📷"],
            MarkerCategory::Food => &["🍜", "🍱", "🥘", "🍣"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPrompt {
    pub kind: StrategyKind,
    pub title: String,
    pub body: String,
}
