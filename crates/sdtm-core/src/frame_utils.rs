//! Row-level DataFrame operations shared by pipeline steps and processors.
//!
//! Every operation keeps the hidden [`LINEAGE_COLUMN`] aligned with the data,
//! so output rows can always be traced back to source rows.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use anyhow::{Context, Result};
use polars::prelude::{
    BooleanChunked, Column, DataFrame, DataType, IdxCa, IdxSize, NamedFrom, NewChunkedArray,
    Series,
};

use crate::data_utils::{has_column, numeric_column, string_column};

/// Hidden column carrying the source row index of every canonical row.
pub const LINEAGE_COLUMN: &str = "__source_row";

pub fn filter_rows(df: &mut DataFrame, keep: &[bool]) -> Result<()> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    *df = df.filter(&mask)?;
    Ok(())
}

/// Reorder (or subset) rows by position.
pub fn take_rows(df: &mut DataFrame, order: &[usize]) -> Result<()> {
    let indices: Vec<IdxSize> = order.iter().map(|idx| *idx as IdxSize).collect();
    let indices = IdxCa::from_vec("order".into(), indices);
    *df = df.take(&indices)?;
    Ok(())
}

/// Keep the first row for each distinct key. Key columns absent from `df` are ignored.
///
/// Returns the number of rows removed.
pub fn deduplicate<S: AsRef<str>>(df: &mut DataFrame, keys: &[S]) -> Result<usize> {
    if keys.is_empty() || df.height() == 0 {
        return Ok(0);
    }
    let mut key_columns = Vec::with_capacity(keys.len());
    for key in keys {
        let key = key.as_ref();
        if !has_column(df, key) {
            continue;
        }
        key_columns.push(string_column(df, key)?);
    }
    if key_columns.is_empty() {
        return Ok(0);
    }
    let mut seen: BTreeSet<Vec<&str>> = BTreeSet::new();
    let mut keep = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let key: Vec<&str> = key_columns.iter().map(|values| values[idx].as_str()).collect();
        keep.push(seen.insert(key));
    }
    let removed = keep.iter().filter(|kept| !**kept).count();
    if removed > 0 {
        filter_rows(df, &keep)?;
    }
    Ok(removed)
}

/// One sortable cell. Missing values sort after present ones.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Number(f64),
    Text(String),
    Missing,
}

impl SortValue {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Missing, Self::Missing) => Ordering::Equal,
            (Self::Missing, _) => Ordering::Greater,
            (_, Self::Missing) => Ordering::Less,
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        }
    }
}

/// Sort values of a column: numeric columns compare as numbers, others as text.
pub fn sort_values(df: &DataFrame, name: &str) -> Result<Vec<SortValue>> {
    let column = df.column(name)?;
    let values = if column.dtype().is_float() || column.dtype().is_integer() {
        numeric_column(df, name)?
            .into_iter()
            .map(|value| value.map_or(SortValue::Missing, SortValue::Number))
            .collect()
    } else {
        string_column(df, name)?
            .into_iter()
            .map(|value| {
                if value.is_empty() {
                    SortValue::Missing
                } else {
                    SortValue::Text(value)
                }
            })
            .collect()
    };
    Ok(values)
}

/// Stable sort by the given columns. Absent columns are skipped.
pub fn sort_rows<S: AsRef<str>>(df: &mut DataFrame, keys: &[S]) -> Result<()> {
    let mut columns = Vec::with_capacity(keys.len());
    for key in keys {
        if has_column(df, key.as_ref()) {
            columns.push(sort_values(df, key.as_ref())?);
        }
    }
    if columns.is_empty() || df.height() < 2 {
        return Ok(());
    }
    let mut order: Vec<usize> = (0..df.height()).collect();
    order.sort_by(|a, b| {
        columns
            .iter()
            .map(|values| values[*a].compare(&values[*b]))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    if order.iter().enumerate().any(|(pos, idx)| pos != *idx) {
        take_rows(df, &order)?;
    }
    Ok(())
}

/// A synthesized row: text per column name; unnamed columns stay empty or null.
pub type NewRow = Vec<(String, String)>;

/// Append synthesized rows, typed to match the existing columns.
///
/// Numeric columns parse the given text; the lineage column is left null.
pub fn append_rows(df: &mut DataFrame, rows: &[NewRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = column.name().clone();
        let cells = rows.iter().map(|row| {
            row.iter()
                .find(|(key, _)| key.as_str() == name.as_str())
                .map(|(_, value)| value.as_str())
        });
        let series = if name.as_str() == LINEAGE_COLUMN {
            Series::new(name, vec![None::<i64>; rows.len()])
        } else if matches!(column.dtype(), DataType::Float64) {
            let values: Vec<Option<f64>> = cells
                .map(|cell| cell.and_then(crate::data_utils::parse_f64))
                .collect();
            Series::new(name, values)
        } else {
            let values: Vec<String> = cells.map(|cell| cell.unwrap_or("").to_string()).collect();
            Series::new(name, values)
        };
        columns.push(series.into());
    }
    let extra = DataFrame::new(columns)?;
    df.vstack_mut(&extra).context("append synthesized rows")?;
    Ok(())
}

/// Source row index of every row; `None` for synthesized rows.
pub fn lineage(df: &DataFrame) -> Result<Vec<Option<usize>>> {
    if !has_column(df, LINEAGE_COLUMN) {
        return Ok(vec![None; df.height()]);
    }
    Ok(numeric_column(df, LINEAGE_COLUMN)?
        .into_iter()
        .map(|value| value.map(|idx| idx as usize))
        .collect())
}

pub fn drop_column(df: &mut DataFrame, name: &str) -> Result<()> {
    if has_column(df, name) {
        df.drop_in_place(name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("USUBJID".into(), vec!["S-2", "S-1", "S-1", "S-2"]).into(),
            Series::new("DTC".into(), vec!["2024-01-02", "", "2024-01-01", "2024-01-01"]).into(),
            Series::new("N".into(), vec![Some(1.0), None, Some(3.0), Some(1.0)]).into(),
            Series::new(LINEAGE_COLUMN.into(), vec![Some(0i64), Some(1), Some(2), Some(3)]).into(),
        ])
        .expect("frame")
    }

    #[test]
    fn sort_is_stable_with_missing_last() {
        let mut df = frame();
        sort_rows(&mut df, &["USUBJID", "DTC"]).expect("sort");
        assert_eq!(lineage(&df).expect("lineage"), vec![Some(2), Some(1), Some(3), Some(0)]);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let mut df = frame();
        let removed = deduplicate(&mut df, &["USUBJID", "N", "MISSING"]).expect("dedupe");
        assert_eq!(removed, 1);
        assert_eq!(lineage(&df).expect("lineage"), vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn appended_rows_have_no_lineage() {
        let mut df = frame();
        let row: NewRow = vec![
            ("USUBJID".to_string(), "S-3".to_string()),
            ("N".to_string(), "4".to_string()),
        ];
        append_rows(&mut df, &[row]).expect("append");
        assert_eq!(df.height(), 5);
        assert_eq!(lineage(&df).expect("lineage")[4], None);
        assert_eq!(numeric_column(&df, "N").expect("n")[4], Some(4.0));
        assert_eq!(string_column(&df, "DTC").expect("dtc")[4], "");
    }
}
