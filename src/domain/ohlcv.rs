//! Daily price bars and the series a data provider returns.

use chrono::NaiveDate;
use std::fmt;

/// Lookback window requested from a market data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    OneYear,
    SixMonths,
}

impl Lookback {
    /// Provider range token (`1y`, `6mo`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Lookback::OneYear => "1y",
            Lookback::SixMonths => "6mo",
        }
    }

    /// Calendar days covered by the window.
    pub fn days(&self) -> i64 {
        match self {
            Lookback::OneYear => 365,
            Lookback::SixMonths => 182,
        }
    }
}

impl fmt::Display for Lookback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One daily row. Providers may leave any field missing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

impl PriceBar {
    /// A bar with every field present; close doubles as open/high/low.
    pub fn from_close(date: NaiveDate, close: f64, volume: u64) -> Self {
        Self {
            date,
            open: Some(close),
            high: Some(close),
            low: Some(close),
            close: Some(close),
            volume: Some(volume),
        }
    }

    /// True when none of the `columns` is missing (NaN counts as missing).
    pub fn is_complete(&self, columns: ColumnSet) -> bool {
        let present =
            |supplied: bool, v: Option<f64>| !supplied || v.is_some_and(|x| !x.is_nan());
        present(columns.open, self.open)
            && present(columns.high, self.high)
            && present(columns.low, self.low)
            && present(columns.close, self.close)
            && (!columns.volume || self.volume.is_some())
    }
}

/// Which fields a provider actually supplies.
///
/// A field the source never had is not "missing" on any row, so the
/// row-wise drop ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSet {
    pub open: bool,
    pub high: bool,
    pub low: bool,
    pub close: bool,
    pub volume: bool,
}

impl ColumnSet {
    pub const ALL: ColumnSet = ColumnSet {
        open: true,
        high: true,
        low: true,
        close: true,
        volume: true,
    };
}

/// Ordered daily bars for one ticker, strictly increasing by date.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    pub bars: Vec<PriceBar>,
    pub columns: ColumnSet,
}

impl PriceSeries {
    /// Builds a series, sorting by date and keeping the last row for duplicate dates.
    pub fn new(ticker: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self {
            ticker: ticker.into(),
            bars: deduped,
            columns: ColumnSet::ALL,
        }
    }

    /// Restricts the completeness check to the columns the source supplied.
    pub fn with_columns(mut self, columns: ColumnSet) -> Self {
        self.columns = columns;
        self
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// True when at least one row carries a close value.
    pub fn has_close(&self) -> bool {
        self.bars.iter().any(|b| b.close.is_some())
    }

    /// Row-wise drop of bars with any missing supplied field.
    pub fn complete_rows(&self) -> PriceSeries {
        PriceSeries {
            ticker: self.ticker.clone(),
            bars: self
                .bars
                .iter()
                .filter(|b| b.is_complete(self.columns))
                .cloned()
                .collect(),
            columns: self.columns,
        }
    }

    /// Closing prices; missing closes become NaN so positions stay aligned.
    pub fn closes(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.close.unwrap_or(f64::NAN))
            .collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    /// The last `n` bars (fewer when the series is shorter).
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }
}
