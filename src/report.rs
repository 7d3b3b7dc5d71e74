use crate::metrics::MerchantComparison;
use crate::schema::{MetricSummary, StrategyPrompt};
use crate::utils::format_metric;
use serde::{Deserialize, Serialize};

pub const NOT_FOUND_MESSAGE: &str = "❌ 해당 가맹점코드로 등록된 매장이 없습니다.";
pub const AWAITING_INPUT_MESSAGE: &str = "가맹점 코드를 입력하면 분석이 시작됩니다.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SummaryValue {
    Number(Option<f64>),
    Text(String),
}

impl SummaryValue {
    pub fn display(&self) -> String {
        match self {
            SummaryValue::Number(v) => format_metric(*v),
            SummaryValue::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub label: String,
    pub value: SummaryValue,
}

/// Merchant vs. population values for one bar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonChart {
    pub title: String,
    pub merchant_label: String,
    pub population_label: String,
    pub merchant: Option<f64>,
    pub population: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantAnalysis {
    pub comparison: MerchantComparison,
    pub summary: Vec<SummaryRow>,
    pub charts: Vec<ComparisonChart>,
    /// Share of customers outside the 20-30 bracket, `100 - young_rate`.
    pub other_age_share: Option<f64>,
    pub prompts: Vec<StrategyPrompt>,
}

impl MerchantAnalysis {
    pub fn new(comparison: MerchantComparison, prompts: Vec<StrategyPrompt>) -> Self {
        let summary = summary_rows(&comparison.merchant);
        let charts = comparison_charts(&comparison.merchant, &comparison.population);
        let other_age_share = comparison.merchant.young_rate.map(|y| 100.0 - y);
        Self {
            comparison,
            summary,
            charts,
            other_age_share,
            prompts,
        }
    }
}

pub fn summary_rows(merchant: &MetricSummary) -> Vec<SummaryRow> {
    let row = |label: &str, value: SummaryValue| SummaryRow {
        label: label.to_string(),
        value,
    };
    vec![
        row("배달 매출(%)", SummaryValue::Number(merchant.delivery_rate)),
        row("20~30대 고객 비중(%)", SummaryValue::Number(merchant.young_rate)),
        row("재방문율(%)", SummaryValue::Number(merchant.revisit)),
        row("평균 기온(°C)", SummaryValue::Number(merchant.avg_temp)),
        row("이벤트 횟수(회)", SummaryValue::Number(merchant.event_count)),
        row("업종", SummaryValue::Text(merchant.store_type.clone())),
    ]
}

pub fn comparison_charts(
    merchant: &MetricSummary,
    population: &MetricSummary,
) -> Vec<ComparisonChart> {
    let chart = |title: &str, m: Option<f64>, p: Option<f64>| ComparisonChart {
        title: title.to_string(),
        merchant_label: "매장".to_string(),
        population_label: "평균".to_string(),
        merchant: m,
        population: p,
    };
    vec![
        chart("🚚 배달 비중", merchant.delivery_rate, population.delivery_rate),
        chart("🎯 연령대", merchant.young_rate, population.young_rate),
        chart("🔁 재방문율", merchant.revisit, population.revisit),
    ]
}

/// Result of one merchant query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    AwaitingInput,
    NotFound { code: String },
    Ready(Box<MerchantAnalysis>),
}

impl QueryOutcome {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            QueryOutcome::AwaitingInput => Some(AWAITING_INPUT_MESSAGE),
            QueryOutcome::NotFound { .. } => Some(NOT_FOUND_MESSAGE),
            QueryOutcome::Ready(_) => None,
        }
    }
}
