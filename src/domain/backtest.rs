//! Signal backtest engine.
//!
//! Pipeline for the SMA strategy:
//! 1. drop incomplete rows, require closes
//! 2. SMA(20), drop the warmup rows
//! 3. signal[t] = 1 if close[t] > sma[t] else 0
//! 4. market[t] = close[t] / close[t-1] - 1, market[0] = 0
//! 5. strategy[t] = signal[t-1] * market[t], strategy[0] = 0
//! 6. equity curves are cumulative sums of 4 and 5
//!
//! Returns stay fractional (0.01 = 1%) everywhere in this module.

use chrono::NaiveDate;
use std::fmt;

use crate::domain::error::AgentError;
use crate::domain::indicator::{IndicatorType, SMA_PERIOD};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::trades::{extract_trades, win_rate_pct, Trade};

/// Rows shown in the textual equity-curve summary.
pub const SUMMARY_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Sma,
}

impl StrategyKind {
    /// Resolve a strategy name from a command; case-insensitive.
    pub fn from_name(name: &str) -> Option<StrategyKind> {
        match name.trim().to_uppercase().as_str() {
            "SMA" => Some(StrategyKind::Sma),
            _ => None,
        }
    }

    pub fn indicator(&self) -> IndicatorType {
        match self {
            StrategyKind::Sma => IndicatorType::Sma(SMA_PERIOD),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Sma => write!(f, "SMA"),
        }
    }
}

/// One aligned row of the backtest frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRow {
    pub date: NaiveDate,
    pub close: f64,
    pub sma: f64,
    pub signal: u8,
    pub market_return: f64,
    pub strategy_return: f64,
    pub cum_market: f64,
    pub cum_strategy: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub ticker: String,
    pub strategy: StrategyKind,
    pub rows: Vec<BacktestRow>,
    pub trades: Vec<Trade>,
    pub win_rate_pct: f64,
}

impl BacktestResult {
    pub fn final_market_return(&self) -> f64 {
        self.rows.last().map(|r| r.cum_market).unwrap_or(0.0)
    }

    pub fn final_strategy_return(&self) -> f64 {
        self.rows.last().map(|r| r.cum_strategy).unwrap_or(0.0)
    }

    /// Tail of the buy-and-hold and strategy equity curves as a text table.
    pub fn equity_tail(&self, n: usize) -> String {
        let start = self.rows.len().saturating_sub(n);
        let mut out = format!("{:<12}{:>12}{:>12}\n", "Date", "Returns", "Strategy");
        for row in &self.rows[start..] {
            out.push_str(&format!(
                "{:<12}{:>12.6}{:>12.6}\n",
                row.date.format("%Y-%m-%d").to_string(),
                row.cum_market,
                row.cum_strategy
            ));
        }
        out.trim_end().to_string()
    }
}

/// Daily simple returns; the first element is 0.
pub fn market_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| if i == 0 { 0.0 } else { c / closes[i - 1] - 1.0 })
        .collect()
}

/// Strategy returns with the signal lagged one row.
///
/// The signal known at the close of t-1 is the position held through t.
pub fn strategy_returns(signal: &[u8], market: &[f64]) -> Vec<f64> {
    market
        .iter()
        .enumerate()
        .map(|(t, &r)| {
            if t == 0 {
                0.0
            } else {
                f64::from(signal[t - 1]) * r
            }
        })
        .collect()
}

/// Running sum.
pub fn cumulative(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(0.0, |acc, &r| {
            *acc += r;
            Some(*acc)
        })
        .collect()
}

pub fn run_backtest(
    series: &PriceSeries,
    strategy: StrategyKind,
) -> Result<BacktestResult, AgentError> {
    if series.is_empty() {
        return Err(AgentError::NoData {
            ticker: series.ticker.clone(),
        });
    }
    if !series.has_close() {
        return Err(AgentError::MissingColumn {
            ticker: series.ticker.clone(),
            column: "Close".into(),
        });
    }

    let clean = series.complete_rows();
    let indicator = strategy.indicator().calculate(&clean);

    let aligned: Vec<(NaiveDate, f64, f64)> = clean
        .bars
        .iter()
        .zip(&indicator.values)
        .filter_map(|(bar, point)| Some((bar.date, bar.close?, point.get()?)))
        .collect();

    if aligned.is_empty() {
        return Err(AgentError::InsufficientData {
            ticker: series.ticker.clone(),
            bars: clean.len(),
            minimum: SMA_PERIOD,
        });
    }

    let closes: Vec<f64> = aligned.iter().map(|&(_, c, _)| c).collect();
    let signal: Vec<u8> = aligned
        .iter()
        .map(|&(_, close, sma)| u8::from(close > sma))
        .collect();
    let market = market_returns(&closes);
    let strat = strategy_returns(&signal, &market);
    let cum_market = cumulative(&market);
    let cum_strategy = cumulative(&strat);

    let rows: Vec<BacktestRow> = aligned
        .iter()
        .enumerate()
        .map(|(i, &(date, close, sma))| BacktestRow {
            date,
            close,
            sma,
            signal: signal[i],
            market_return: market[i],
            strategy_return: strat[i],
            cum_market: cum_market[i],
            cum_strategy: cum_strategy[i],
        })
        .collect();

    let trades = extract_trades(&rows);
    let win_rate_pct = win_rate_pct(&trades);

    Ok(BacktestResult {
        ticker: series.ticker.clone(),
        strategy,
        rows,
        trades,
        win_rate_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::PriceBar;
    use approx::assert_relative_eq;

    fn make_series(prices: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = prices
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                PriceBar::from_close(start + chrono::Duration::days(i as i64), close, 1000)
            })
            .collect();
        PriceSeries::new("TEST", bars)
    }

    #[test]
    fn strategy_name_lookup() {
        assert_eq!(StrategyKind::from_name("sma"), Some(StrategyKind::Sma));
        assert_eq!(StrategyKind::from_name("MACD"), None);
    }

    #[test]
    fn market_returns_first_is_zero() {
        let r = market_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r[0], 0.0);
        assert_relative_eq!(r[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(r[2], -0.1, epsilon = 1e-12);
    }

    #[test]
    fn strategy_returns_are_lagged() {
        let signal = [1, 0, 1, 1];
        let market = [0.0, 0.05, 0.02, -0.01];
        let s = strategy_returns(&signal, &market);
        assert_eq!(s, vec![0.0, 0.05, 0.0, -0.01]);
    }

    #[test]
    fn cumulative_sums() {
        assert_eq!(cumulative(&[0.0, 0.5, -0.25]), vec![0.0, 0.5, 0.25]);
    }

    #[test]
    fn drops_sma_warmup_rows() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let result = run_backtest(&make_series(&prices), StrategyKind::Sma).unwrap();
        assert_eq!(result.rows.len(), 30 - 19);
        assert_eq!(result.rows[0].market_return, 0.0);
        assert_eq!(result.rows[0].strategy_return, 0.0);
    }

    #[test]
    fn rising_prices_signal_long() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let result = run_backtest(&make_series(&prices), StrategyKind::Sma).unwrap();
        assert!(result.rows.iter().all(|r| r.signal == 1));
        // Long from the first aligned row on, and row 0 carries no return.
        assert_relative_eq!(
            result.final_strategy_return(),
            result.final_market_return(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn empty_series_is_no_data() {
        let err = run_backtest(&make_series(&[]), StrategyKind::Sma).unwrap_err();
        assert!(matches!(err, AgentError::NoData { .. }));
    }

    #[test]
    fn missing_close_column_is_reported() {
        let mut series = make_series(&[1.0, 2.0]);
        for bar in &mut series.bars {
            bar.close = None;
        }
        let err = run_backtest(&series, StrategyKind::Sma).unwrap_err();
        assert_eq!(err.to_string(), "No 'Close' column found for TEST");
    }

    #[test]
    fn too_short_series_is_insufficient() {
        let err = run_backtest(&make_series(&[1.0; 10]), StrategyKind::Sma).unwrap_err();
        assert!(matches!(err, AgentError::InsufficientData { bars: 10, .. }));
    }

    #[test]
    fn equity_tail_has_header_and_five_rows() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + (i % 6) as f64).collect();
        let result = run_backtest(&make_series(&prices), StrategyKind::Sma).unwrap();
        let table = result.equity_tail(SUMMARY_ROWS);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].contains("Returns"));
        assert!(lines[0].contains("Strategy"));
        assert!(lines[5].starts_with("2024-02-09"));
    }
}
