use crate::data::bar::Bar;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date")]
    date: String,
    #[serde(alias = "Close")]
    close: Option<f64>,
}

//loads daily closes from a csv file with `date` and `close` columns
//rows are returned in file order, ordering problems are left to validate_series
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(format!("Failed to open CSV file: {:?}", path))?;

    let mut bars = Vec::new();

    for (index, result) in reader.deserialize().enumerate() {
        let line = index + 2;
        let record: CsvRecord =
            result.context(format!("Failed to parse CSV record at line {}", line))?;

        let date = parse_date(&record.date).ok_or_else(|| {
            anyhow!(
                "Failed to parse date '{}' at line {}",
                record.date,
                line
            )
        })?;

        //missing closes are rejected here rather than silently dropped
        let close = match record.close {
            Some(close) if !close.is_nan() => close,
            _ => anyhow::bail!("Missing close price at line {}", line),
        };

        bars.push(Bar::new_unchecked(date, close));
    }

    Ok(bars)
}

//accepts plain dates, rfc3339 timestamps and "YYYY-MM-DD hh:mm:ss" style stamps
fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.date_naive());
    }

    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
