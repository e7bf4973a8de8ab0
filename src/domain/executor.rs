//! Action executor.
//!
//! Dispatches a typed [`Action`] to its handler and always returns text.
//! Failures never cross this boundary as errors: they come back as strings
//! starting with `ERROR:` (or `ERROR in backtest:`) so the control loop can
//! record them and let the oracle react.

use tracing::{debug, warn};

use crate::domain::action::Action;
use crate::domain::backtest::{run_backtest, StrategyKind, SUMMARY_ROWS};
use crate::domain::command_parser;
use crate::domain::error::AgentError;
use crate::domain::indicator::IndicatorType;
use crate::domain::ohlcv::{Lookback, PriceSeries};
use crate::ports::chart_port::ChartPort;
use crate::ports::data_port::MarketDataPort;

pub const TAIL_ROWS: usize = 5;
pub const INDICATOR_NOT_SUPPORTED: &str = "Indicator not supported.";
pub const STRATEGY_NOT_SUPPORTED: &str = "Strategy not supported.";

pub struct Executor<'a> {
    data: &'a dyn MarketDataPort,
    charts: &'a dyn ChartPort,
}

impl<'a> Executor<'a> {
    pub fn new(data: &'a dyn MarketDataPort, charts: &'a dyn ChartPort) -> Self {
        Self { data, charts }
    }

    pub fn execute(&self, action: &Action) -> String {
        debug!(%action, "executing action");
        match action {
            Action::Fetch { ticker } => self.fetch(ticker).unwrap_or_else(|e| {
                warn!(ticker = %ticker, error = %e, "fetch failed");
                format!("ERROR: {e}")
            }),
            Action::Indicator { ticker, name } => {
                self.indicator(ticker, name).unwrap_or_else(|e| {
                    warn!(ticker = %ticker, indicator = %name, error = %e, "indicator failed");
                    format!("ERROR: {e}")
                })
            }
            Action::Backtest { ticker, strategy } => {
                self.backtest(ticker, strategy).unwrap_or_else(|e| {
                    warn!(ticker = %ticker, strategy = %strategy, error = %e, "backtest failed");
                    format!("ERROR in backtest: {e}")
                })
            }
            Action::Finish { message } => message.clone(),
        }
    }

    /// Parse and execute raw command text. A parse failure yields `None` and an `ERROR:` result.
    pub fn execute_command(&self, raw: &str) -> (Option<Action>, String) {
        match command_parser::parse(raw) {
            Ok(action) => {
                let result = self.execute(&action);
                (Some(action), result)
            }
            Err(e) => {
                warn!(command = %raw, error = %e, "rejected command");
                (None, format!("ERROR: {e}"))
            }
        }
    }

    fn load(&self, ticker: &str, lookback: Lookback) -> Result<PriceSeries, AgentError> {
        let series = self.data.daily_bars(ticker, lookback)?;
        debug!(ticker, %lookback, bars = series.len(), "loaded price series");
        if series.is_empty() {
            return Err(AgentError::NoData {
                ticker: ticker.to_string(),
            });
        }
        Ok(series)
    }

    fn fetch(&self, ticker: &str) -> Result<String, AgentError> {
        let series = self.load(ticker, Lookback::OneYear)?;
        let mut out = format!("{:<12}{:>14}{:>14}\n", "Date", "Close", "Volume");
        for bar in series.tail(TAIL_ROWS) {
            out.push_str(&format!(
                "{:<12}{:>14}{:>14}\n",
                bar.date.format("%Y-%m-%d").to_string(),
                fmt_value(bar.close),
                bar.volume
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "NaN".to_string())
            ));
        }
        Ok(out.trim_end().to_string())
    }

    fn indicator(&self, ticker: &str, name: &str) -> Result<String, AgentError> {
        let Some(indicator) = IndicatorType::from_name(name) else {
            return Ok(INDICATOR_NOT_SUPPORTED.to_string());
        };
        let series = self.load(ticker, Lookback::SixMonths)?;
        let values = indicator.calculate(&series);
        debug!(ticker, %indicator, valid = values.valid_count(), "computed indicator");

        let start = series.len().saturating_sub(TAIL_ROWS);
        let mut out = format!("{:<12}{:>14}{:>14}\n", "Date", "Close", indicator.column());
        for (bar, point) in series.bars[start..].iter().zip(&values.values[start..]) {
            out.push_str(&format!(
                "{:<12}{:>14}{:>14}\n",
                bar.date.format("%Y-%m-%d").to_string(),
                fmt_value(bar.close),
                fmt_value(point.get())
            ));
        }
        Ok(out.trim_end().to_string())
    }

    fn backtest(&self, ticker: &str, strategy: &str) -> Result<String, AgentError> {
        let Some(kind) = StrategyKind::from_name(strategy) else {
            return Ok(STRATEGY_NOT_SUPPORTED.to_string());
        };
        let series = self.load(ticker, Lookback::OneYear)?;
        let result = run_backtest(&series, kind)?;
        let chart = self.charts.render(&result)?;
        debug!(
            ticker,
            %chart,
            trades = result.trades.len(),
            market = result.final_market_return(),
            strategy = result.final_strategy_return(),
            "backtest finished"
        );

        Ok(format!(
            "Backtest completed for {} ({}).\nChart saved: {}\n\n{}",
            ticker,
            strategy,
            chart,
            result.equity_tail(SUMMARY_ROWS)
        ))
    }
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{:.6}", v),
        _ => "NaN".to_string(),
    }
}
