// ============================================================
// Layer 4 — CSV Series Loader
// ============================================================
// Loads one OHLCV series from a CSV file using the csv crate.
//
// Expected header (extra columns such as Date or Adj Close are
// ignored):
//   Date,Open,High,Low,Close,Adj Close,Volume
//
// Rows must already be in chronological ascending order and
// calendar-aligned with the other series of the same run; the
// loader does not reorder or resample anything.

use anyhow::Result;
use serde::Deserialize;
use std::{fs::File, io::Read, path::PathBuf};

use crate::domain::series::{Asset, Bar, Frequency, TimeSeries};
use crate::domain::traits::SeriesSource;
use crate::error::DataError;

/// The five columns the model consumes. Serde matches by header name,
/// so column order in the file does not matter.
#[derive(Debug, Deserialize)]
struct OhlcvRecord {
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: f64,
}

/// Loads a single (asset, frequency) series from a CSV file.
pub struct CsvSeriesLoader {
    path:      PathBuf,
    asset:     Asset,
    frequency: Frequency,
}

impl CsvSeriesLoader {
    pub fn new(path: impl Into<PathBuf>, asset: Asset, frequency: Frequency) -> Self {
        Self { path: path.into(), asset, frequency }
    }
}

impl SeriesSource for CsvSeriesLoader {
    fn load_series(&self) -> Result<TimeSeries> {
        let path_str = self.path.display().to_string();
        let file = File::open(&self.path).map_err(|e| DataError::Io {
            path:   path_str.clone(),
            source: e,
        })?;

        let bars = read_bars(file, &path_str)?;
        let series = TimeSeries::new(self.asset, self.frequency, bars);
        if series.is_empty() {
            return Err(DataError::EmptySeries(path_str).into());
        }

        tracing::info!("Loaded {} bars of {} from '{}'", series.len(), series.label(), path_str);
        Ok(series)
    }
}

/// Parse every record from `reader`; any malformed row is an error
/// carrying the file path and line number.
fn read_bars<R: Read>(reader: R, path: &str) -> Result<Vec<Bar>, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut bars = Vec::new();
    // Line 1 is the header
    let mut line = 2;

    for result in csv_reader.deserialize() {
        let record: OhlcvRecord = result.map_err(|e| DataError::CsvParse {
            path:   path.to_string(),
            line,
            source: e,
        })?;
        bars.push(Bar::new(record.open, record.high, record.low, record.close, record.volume));
        line += 1;
    }

    Ok(bars)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reads_named_columns_and_ignores_extras() {
        let csv = "Date,Open,High,Low,Close,Adj Close,Volume\n\
                   2017-11-09,308.6,329.4,307.0,320.8,320.8,893249984\n\
                   2017-11-10,320.6,324.7,294.5,299.2,299.2,885985984\n";
        let bars = read_bars(csv.as_bytes(), "inline").unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].open, 308.6);
        assert_eq!(bars[1].close, 299.2);
        assert_eq!(bars[1].volume, 885985984.0);
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let csv = "Open,High,Low,Close,Volume\n1,2,3,4,5\n1,2,null,4,5\n";
        let err = read_bars(csv.as_bytes(), "bad.csv").unwrap_err();
        match err {
            DataError::CsvParse { line, path, .. } => {
                assert_eq!(line, 3);
                assert_eq!(path, "bad.csv");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_loader_reads_file_and_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();

        let full = dir.path().join("eth_daily.csv");
        let mut f = File::create(&full).unwrap();
        writeln!(f, "Open,High,Low,Close,Volume").unwrap();
        writeln!(f, "1,2,0.5,1.5,10").unwrap();
        let series = CsvSeriesLoader::new(&full, Asset::Eth, Frequency::Daily)
            .load_series()
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.asset, Asset::Eth);

        let empty = dir.path().join("empty.csv");
        let mut f = File::create(&empty).unwrap();
        writeln!(f, "Open,High,Low,Close,Volume").unwrap();
        assert!(CsvSeriesLoader::new(&empty, Asset::Eth, Frequency::Daily)
            .load_series()
            .is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = CsvSeriesLoader::new("/definitely/not/here.csv", Asset::Btc, Frequency::Weekly);
        let err = loader.load_series().unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }
}
