//! CSV file market data adapter.
//!
//! Reads `<dir>/<TICKER>.csv` with a `date,open,high,low,close,volume`
//! header (any column order, case-insensitive). Empty cells are missing
//! values. The lookback window is measured back from the newest row.
//! Tickers are restricted to `[A-Za-z0-9.^=-]` so a file name can never
//! leave the data directory.

use std::fs;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::domain::error::AgentError;
use crate::domain::ohlcv::{ColumnSet, Lookback, PriceBar, PriceSeries};
use crate::ports::data_port::MarketDataPort;

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn csv_path(&self, ticker: &str) -> Result<PathBuf, AgentError> {
        if !is_valid_ticker(ticker) {
            return Err(provider_error(format!(
                "invalid ticker '{}': only letters, digits and . ^ = - are allowed",
                ticker
            )));
        }
        Ok(self.base_path.join(format!("{}.csv", ticker)))
    }
}

fn is_valid_ticker(ticker: &str) -> bool {
    !ticker.is_empty()
        && !ticker.starts_with('.')
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-'))
}

struct HeaderIndex {
    date: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: Option<usize>,
    volume: Option<usize>,
}

impl HeaderIndex {
    fn from_headers(headers: &StringRecord) -> Option<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Some(Self {
            date: find("date")?,
            open: find("open"),
            high: find("high"),
            low: find("low"),
            close: find("close"),
            volume: find("volume"),
        })
    }

    fn supplied(&self) -> ColumnSet {
        ColumnSet {
            open: self.open.is_some(),
            high: self.high.is_some(),
            low: self.low.is_some(),
            close: self.close.is_some(),
            volume: self.volume.is_some(),
        }
    }
}

fn provider_error(reason: String) -> AgentError {
    AgentError::Provider { reason }
}

fn parse_price(
    record: &StringRecord,
    idx: Option<usize>,
    line: u64,
) -> Result<Option<f64>, AgentError> {
    let Some(raw) = idx.and_then(|i| record.get(i)).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| provider_error(format!("line {}: invalid number '{}': {}", line, raw, e)))
}

fn parse_volume(
    record: &StringRecord,
    idx: Option<usize>,
    line: u64,
) -> Result<Option<u64>, AgentError> {
    let Some(raw) = idx.and_then(|i| record.get(i)).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(v) = raw.parse::<u64>() {
        return Ok(Some(v));
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(Some(v as u64)),
        _ => Err(provider_error(format!("line {}: invalid volume '{}'", line, raw))),
    }
}

impl MarketDataPort for CsvDataAdapter {
    fn daily_bars(&self, ticker: &str, lookback: Lookback) -> Result<PriceSeries, AgentError> {
        let path = self.csv_path(ticker)?;
        if !path.exists() {
            debug!(path = %path.display(), "no csv file for ticker");
            return Ok(PriceSeries::new(ticker, Vec::new()));
        }
        let content = fs::read_to_string(&path)
            .map_err(|e| provider_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| provider_error(format!("CSV parse error: {}", e)))?
            .clone();
        let columns = HeaderIndex::from_headers(&headers).ok_or_else(|| {
            provider_error(format!("{}: missing date column", path.display()))
        })?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| provider_error(format!("CSV parse error: {}", e)))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let date_str = record.get(columns.date).unwrap_or("");
            if date_str.is_empty() {
                continue;
            }
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                provider_error(format!("line {}: invalid date '{}': {}", line, date_str, e))
            })?;

            bars.push(PriceBar {
                date,
                open: parse_price(&record, columns.open, line)?,
                high: parse_price(&record, columns.high, line)?,
                low: parse_price(&record, columns.low, line)?,
                close: parse_price(&record, columns.close, line)?,
                volume: parse_volume(&record, columns.volume, line)?,
            });
        }

        let mut series = PriceSeries::new(ticker, bars).with_columns(columns.supplied());
        if let Some(newest) = series.bars.last().map(|b| b.date) {
            let cutoff = newest - Duration::days(lookback.days());
            series.bars.retain(|b| b.date > cutoff);
        }
        debug!(ticker, %lookback, bars = series.len(), "read csv series");
        Ok(series)
    }
}
