#![allow(dead_code)]

use chrono::NaiveDate;
use quantagent::domain::backtest::BacktestResult;
use quantagent::domain::error::AgentError;
pub use quantagent::domain::ohlcv::{Lookback, PriceBar, PriceSeries};
use quantagent::ports::chart_port::ChartPort;
use quantagent::ports::data_port::MarketDataPort;
use quantagent::ports::decision_port::DecisionPort;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
    pub requests: RefCell<Vec<(String, Lookback)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn daily_bars(&self, ticker: &str, lookback: Lookback) -> Result<PriceSeries, AgentError> {
        self.requests
            .borrow_mut()
            .push((ticker.to_string(), lookback));
        if let Some(reason) = self.errors.get(ticker) {
            return Err(AgentError::Provider {
                reason: reason.clone(),
            });
        }
        Ok(PriceSeries::new(
            ticker,
            self.data.get(ticker).cloned().unwrap_or_default(),
        ))
    }
}

/// Oracle that replays a fixed list of replies and records every context it saw.
pub struct ScriptedOracle {
    replies: RefCell<VecDeque<Result<String, String>>>,
    pub contexts: RefCell<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: RefCell::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            contexts: RefCell::new(Vec::new()),
        }
    }

    pub fn then_fail(self, reason: &str) -> Self {
        self.replies.borrow_mut().push_back(Err(reason.to_string()));
        self
    }

    pub fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl DecisionPort for ScriptedOracle {
    fn decide(&self, context: &str) -> Result<String, AgentError> {
        self.contexts.borrow_mut().push(context.to_string());
        match self.replies.borrow_mut().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(AgentError::Oracle { reason }),
            None => Err(AgentError::Oracle {
                reason: "no more scripted replies".into(),
            }),
        }
    }
}

/// Chart port that keeps every rendered result instead of writing files.
pub struct RecordingChartPort {
    pub rendered: RefCell<Vec<BacktestResult>>,
}

impl RecordingChartPort {
    pub fn new() -> Self {
        Self {
            rendered: RefCell::new(Vec::new()),
        }
    }
}

impl ChartPort for RecordingChartPort {
    fn render(&self, result: &BacktestResult) -> Result<String, AgentError> {
        self.rendered.borrow_mut().push(result.clone());
        Ok(format!(
            "charts/chart_{}_{:06}.svg",
            result.ticker,
            self.rendered.borrow().len()
        ))
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily bars from explicit closes, one calendar day apart.
pub fn bars_from_closes(start_date: &str, closes: &[f64]) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar::from_close(start + chrono::Duration::days(i as i64), c, 1000))
        .collect()
}

/// Oscillating closes around `base`; produces several signal flips.
pub fn generate_wave(start_date: &str, count: usize, base: f64) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| base + 10.0 * ((i as f64) / 6.0).sin() + i as f64 * 0.05)
        .collect();
    bars_from_closes(start_date, &closes)
}
