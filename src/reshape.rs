//! Positional-to-named remapping of scraped quote rows.
//!
//! The sources hand back wide tables (change, bid/ask variants, volume); only
//! the date and one measurement survive into the destination layout
//! `(BASE_DATE, CODE, <measurement>)`. The code is injected as a constant,
//! never scraped.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::debug;

use crate::dataset::DatasetSpec;

/// One persisted observation of a quote dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRow {
    /// ISO `YYYY-MM-DD`.
    pub base_date: String,
    pub code: String,
    pub value: f64,
}

/// Normalize the sources' `YYYY.MM.DD` date format to ISO `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Option<String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y.%m.%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Parse a numeric cell, tolerating thousands separators.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().replace(',', "").parse().ok()
}

/// Map raw harvested rows into [`QuoteRow`]s per `spec`.
///
/// Rows whose cell count does not match the declared raw layout are dropped
/// (the sources interleave navigation fragments with data rows). A data row
/// with an unparsable date or measurement aborts the code's run.
pub fn reshape_quotes(spec: &DatasetSpec, code: &str, rows: &[Vec<String>]) -> Result<Vec<QuoteRow>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() != spec.raw_columns.len() {
            debug!(
                table = spec.table.name,
                cells = row.len(),
                expected = spec.raw_columns.len(),
                "dropping row with unexpected layout"
            );
            continue;
        }
        let base_date = normalize_date(&row[spec.date_col])
            .with_context(|| format!("unparsable date `{}` for code {}", row[spec.date_col], code))?;
        let value = parse_number(&row[spec.value_col]).with_context(|| {
            format!(
                "unparsable {} `{}` for code {}",
                spec.measurement(),
                row[spec.value_col],
                code
            )
        })?;
        out.push(QuoteRow {
            base_date,
            code: code.to_string(),
            value,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::OIL_PRICE;

    #[test]
    fn date_normalization() {
        assert_eq!(normalize_date("2021.03.05").as_deref(), Some("2021-03-05"));
        assert_eq!(normalize_date(" 2021.12.31 ").as_deref(), Some("2021-12-31"));
        assert_eq!(normalize_date("2021-03-05"), None);
        assert_eq!(normalize_date("2021.13.05"), None);
    }

    #[test]
    fn number_parsing_strips_separators() {
        assert_eq!(parse_number("1,085.50"), Some(1085.5));
        assert_eq!(parse_number(" 52.25 "), Some(52.25));
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn keeps_only_date_code_and_measurement() {
        let rows = vec![vec![
            "2021.03.05".to_string(),
            "66.09".to_string(),
            "+1.23".to_string(),
            "+1.90%".to_string(),
        ]];
        let out = reshape_quotes(&OIL_PRICE, "OIL_CL", &rows).unwrap();
        assert_eq!(
            out,
            vec![QuoteRow {
                base_date: "2021-03-05".to_string(),
                code: "OIL_CL".to_string(),
                value: 66.09,
            }]
        );
    }

    #[test]
    fn mismatched_layout_is_dropped_not_fatal() {
        let rows = vec![
            vec!["prev".to_string(), "next".to_string()],
            vec![
                "2021.03.04".to_string(),
                "64.86".to_string(),
                "-1.23".to_string(),
                "-1.86%".to_string(),
            ],
        ];
        let out = reshape_quotes(&OIL_PRICE, "OIL_CL", &rows).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].base_date, "2021-03-04");
    }

    #[test]
    fn unparsable_date_in_data_row_is_fatal() {
        let rows = vec![vec![
            "03/05/2021".to_string(),
            "66.09".to_string(),
            "+1.23".to_string(),
            "+1.90%".to_string(),
        ]];
        assert!(reshape_quotes(&OIL_PRICE, "OIL_CL", &rows).is_err());
    }
}
