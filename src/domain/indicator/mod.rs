//! Technical indicator types.
//!
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorPoint`: one dated value, `valid == false` during warmup
//! - `IndicatorSeries`: a series aligned 1:1 with the input bars

pub mod rsi;
pub mod sma;

use chrono::NaiveDate;
use std::fmt;

use crate::domain::ohlcv::PriceSeries;

pub const SMA_PERIOD: usize = 20;
pub const RSI_PERIOD: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn get(&self) -> Option<f64> {
        if self.valid { Some(self.value) } else { None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Rsi(usize),
}

impl IndicatorType {
    /// Resolve an indicator name from a command; case-insensitive.
    pub fn from_name(name: &str) -> Option<IndicatorType> {
        match name.trim().to_uppercase().as_str() {
            "SMA" => Some(IndicatorType::Sma(SMA_PERIOD)),
            "RSI" => Some(IndicatorType::Rsi(RSI_PERIOD)),
            _ => None,
        }
    }

    /// Column label used in result tables, e.g. `SMA20`.
    pub fn column(&self) -> String {
        match self {
            IndicatorType::Sma(period) => format!("SMA{}", period),
            IndicatorType::Rsi(period) => format!("RSI{}", period),
        }
    }

    pub fn calculate(&self, series: &PriceSeries) -> IndicatorSeries {
        match *self {
            IndicatorType::Sma(period) => sma::calculate_sma(series, period),
            IndicatorType::Rsi(period) => rsi::calculate_rsi(series, period),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|p| p.valid).count()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
        }
    }
}
