use anyhow::Result;
use polars::prelude::{DataFrame, DataType, IntoSeries, NamedFrom, Series, StringChunkedBuilder};

/// Whole numbers print without a fractional part (`3.0` -> `"3"`).
pub fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Column name in `df` matching `name` exactly, else case-insensitively with
/// surrounding whitespace ignored on both sides.
pub fn find_column(df: &DataFrame, name: &str) -> Option<String> {
    if has_column(df, name) {
        return Some(name.to_string());
    }
    let wanted = name.trim();
    df.get_column_names()
        .into_iter()
        .find(|column| column.as_str().trim().eq_ignore_ascii_case(wanted))
        .map(ToString::to_string)
}

/// Trimmed text values of a column; nulls read as empty.
///
/// Float columns render whole numbers without a fractional part.
pub fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df.column(name)?;
    if column.dtype().is_float() {
        let numbers = column.cast(&DataType::Float64)?;
        return Ok(numbers
            .f64()?
            .into_iter()
            .map(|value| value.map(format_numeric).unwrap_or_default())
            .collect());
    }
    let text = column.cast(&DataType::String)?;
    Ok(text
        .str()?
        .into_iter()
        .map(|value| value.unwrap_or("").trim().to_string())
        .collect())
}

/// Numeric values of a column; text is parsed and anything unparsable is null.
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?;
    if column.dtype().is_float() || column.dtype().is_integer() {
        let numbers = column.cast(&DataType::Float64)?;
        return Ok(numbers
            .f64()?
            .into_iter()
            .map(|value| value.filter(|number| number.is_finite()))
            .collect());
    }
    let text = column.cast(&DataType::String)?;
    Ok(text
        .str()?
        .into_iter()
        .map(|value| value.and_then(parse_f64))
        .collect())
}

/// Rewrite a String column value by value; `f` sees trimmed text, `""` for null.
pub fn map_string_column(
    df: &mut DataFrame,
    name: &str,
    mut f: impl FnMut(&str) -> String,
) -> Result<()> {
    let rewritten = {
        let values = df.column(name)?.str()?;
        let mut builder = StringChunkedBuilder::new(name.into(), values.len());
        for value in values {
            builder.append_value(f(value.unwrap_or("").trim()));
        }
        builder.finish().into_series()
    };
    df.with_column(rewritten)?;
    Ok(())
}

pub fn set_string_column(df: &mut DataFrame, name: &str, values: Vec<String>) -> Result<()> {
    let series = Series::new(name.into(), values);
    df.with_column(series)?;
    Ok(())
}

pub fn set_f64_column(df: &mut DataFrame, name: &str, values: Vec<Option<f64>>) -> Result<()> {
    let series = Series::new(name.into(), values);
    df.with_column(series)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use polars::prelude::Column;

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(format_numeric(3.0), "3");
        assert_eq!(format_numeric(-2.0), "-2");
        assert_eq!(format_numeric(98.6), "98.6");
    }

    #[test]
    fn columns_read_as_trimmed_text_or_numbers() {
        let df = DataFrame::new(vec![
            Column::new("TEXT".into(), [Some(" a "), None, Some("7.5")]),
            Column::new("FLOAT".into(), [Some(12.0), None, Some(2.5)]),
            Column::new("INT".into(), [1i64, 2, 3]),
        ])
        .expect("df");
        assert_eq!(string_column(&df, "TEXT").expect("text"), vec!["a", "", "7.5"]);
        assert_eq!(string_column(&df, "FLOAT").expect("float"), vec!["12", "", "2.5"]);
        assert_eq!(string_column(&df, "INT").expect("int"), vec!["1", "2", "3"]);
        assert_eq!(
            numeric_column(&df, "TEXT").expect("text"),
            vec![None, None, Some(7.5)]
        );
        assert_eq!(
            numeric_column(&df, "INT").expect("int"),
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );
    }

    #[test]
    fn column_lookup_ignores_case_and_padding() {
        let df = DataFrame::new(vec![
            Column::new("Subject Id ".into(), ["S01"]),
            Column::new("AETERM".into(), ["HEADACHE"]),
        ])
        .expect("df");
        assert_eq!(find_column(&df, "Subject Id ").as_deref(), Some("Subject Id "));
        assert_eq!(find_column(&df, "subject id").as_deref(), Some("Subject Id "));
        assert_eq!(find_column(&df, " aeterm").as_deref(), Some("AETERM"));
        assert_eq!(find_column(&df, "AESTDTC"), None);
    }

    #[test]
    fn mapped_rewrite_keeps_column_name() {
        let mut df = DataFrame::new(vec![Column::new("X".into(), [Some(" a"), None])])
            .expect("df");
        map_string_column(&mut df, "X", str::to_uppercase).expect("rewrite");
        assert_eq!(string_column(&df, "X").expect("X"), vec!["A", ""]);
    }

    #[test]
    fn parse_rejects_blank_and_non_finite() {
        assert_eq!(parse_f64(" 7.5 "), Some(7.5));
        assert_eq!(parse_f64(""), None);
        assert_eq!(parse_f64("NaN"), None);
        assert_eq!(parse_f64("abc"), None);
    }
}
