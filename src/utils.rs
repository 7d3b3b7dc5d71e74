use chrono::NaiveDate;
use std::cmp::Ordering;

/// Parses a reporting period token into the first day of that month.
/// Accepts "YYYYMM" and "YYYY-MM".
pub fn parse_period_token(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    let normalized = match token.len() {
        6 if token.chars().all(|c| c.is_ascii_digit()) => {
            format!("{}-{}-01", &token[..4], &token[4..])
        }
        7 => format!("{}-01", token),
        _ => return None,
    };
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d").ok()
}

/// Distinct period tokens in chronological order. Tokens that don't parse
/// as a month come last, in lexical order.
pub fn sort_periods<'a, I>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut periods: Vec<String> = tokens.into_iter().map(|t| t.trim().to_string()).collect();
    periods.sort_by(|a, b| match (parse_period_token(a), parse_period_token(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    });
    periods.dedup();
    periods
}

/// One decimal place, as used inside strategy prompts.
pub fn format_rate(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}", v),
        None => "N/A".to_string(),
    }
}

/// Two decimal places, as used in the summary table.
pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => "N/A".to_string(),
    }
}
