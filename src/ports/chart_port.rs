//! Chart rendering port.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::AgentError;

/// Renders a backtest to durable storage and returns an opaque artifact reference.
pub trait ChartPort {
    fn render(&self, result: &BacktestResult) -> Result<String, AgentError>;
}
