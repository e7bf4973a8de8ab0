//! Market data access port.

use crate::domain::error::AgentError;
use crate::domain::ohlcv::{Lookback, PriceSeries};

pub trait MarketDataPort {
    /// Daily bars for `ticker` over the trailing `lookback` window.
    ///
    /// An unknown ticker may yield an empty series rather than an error.
    fn daily_bars(&self, ticker: &str, lookback: Lookback) -> Result<PriceSeries, AgentError>;
}
