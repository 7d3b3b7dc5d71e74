use crate::error::{PlaybookError, Result};
use crate::schema::{Table, MERCHANT_ID, PERIOD};
use log::{debug, info};
use std::collections::HashMap;

pub const LEFT_SUFFIX: &str = "_x";
pub const RIGHT_SUFFIX: &str = "_y";

/// Inner join of `left` and `right` on equality of every column in `keys`.
///
/// Output columns are the left columns followed by the right non-key
/// columns. A non-key name present on both sides becomes `<name>_x` on the
/// left and `<name>_y` on the right. Rows follow left order, and for each
/// left row its matches follow right order. Rows without a match on the
/// other side are dropped.
pub fn inner_join(left: &Table, right: &Table, keys: &[&str]) -> Result<Table> {
    let left_keys = key_indices(left, keys)?;
    let right_keys = key_indices(right, keys)?;

    let right_extra: Vec<usize> = (0..right.columns().len())
        .filter(|i| !right_keys.contains(i))
        .collect();

    let mut columns: Vec<String> = left
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let collides = !left_keys.contains(&i)
                && right_extra.iter().any(|&j| &right.columns()[j] == name);
            if collides {
                format!("{}{}", name, LEFT_SUFFIX)
            } else {
                name.clone()
            }
        })
        .collect();

    for &j in &right_extra {
        let name = &right.columns()[j];
        let collides = left
            .columns()
            .iter()
            .enumerate()
            .any(|(i, l)| l == name && !left_keys.contains(&i));
        if collides {
            columns.push(format!("{}{}", name, RIGHT_SUFFIX));
        } else {
            columns.push(name.clone());
        }
    }

    let mut index: HashMap<Vec<&str>, Vec<usize>> = HashMap::new();
    for (r, row) in right.rows().iter().enumerate() {
        let key: Vec<&str> = right_keys.iter().map(|&k| cell(row, k)).collect();
        index.entry(key).or_default().push(r);
    }

    let mut rows = Vec::new();
    for row in left.rows() {
        let key: Vec<&str> = left_keys.iter().map(|&k| cell(row, k)).collect();
        let Some(matches) = index.get(&key) else {
            continue;
        };
        for &r in matches {
            let right_row = &right.rows()[r];
            let mut merged = row.clone();
            merged.resize(left.columns().len(), String::new());
            merged.extend(right_extra.iter().map(|&j| cell(right_row, j).to_string()));
            rows.push(merged);
        }
    }

    debug!(
        "Joined {} x {} rows on {:?} -> {} rows",
        left.len(),
        right.len(),
        keys,
        rows.len()
    );

    Ok(Table::new(columns, rows))
}

/// Joins merchants with usage on merchant id, then the result with the
/// monthly table on merchant id and period.
pub fn merge_sources(merchants: &Table, usage: &Table, monthly: &Table) -> Result<Table> {
    let merged = inner_join(merchants, usage, &[MERCHANT_ID])?;
    let merged = inner_join(&merged, monthly, &[MERCHANT_ID, PERIOD])?;
    info!("Merged dataset has {} rows", merged.len());
    Ok(merged)
}

/// Short rows read as missing cells.
fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map_or("", String::as_str)
}

fn key_indices(table: &Table, keys: &[&str]) -> Result<Vec<usize>> {
    keys.iter()
        .map(|key| {
            table
                .column_index(key)
                .ok_or_else(|| PlaybookError::MissingColumn {
                    column: key.to_string(),
                })
        })
        .collect()
}
