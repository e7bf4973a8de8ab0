//! Simple Moving Average.
//!
//! SMA[i] = mean(close[i-n+1..=i]). Warmup: first (n-1) bars are invalid.
//! A window containing a missing close is invalid as well.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceSeries;

pub fn calculate_sma(series: &PriceSeries, period: usize) -> IndicatorSeries {
    let closes = series.closes();
    let mut values = Vec::with_capacity(closes.len());

    for (i, bar) in series.bars.iter().enumerate() {
        let point = if period == 0 || i + 1 < period {
            None
        } else {
            let window = &closes[i + 1 - period..=i];
            if window.iter().any(|c| c.is_nan()) {
                None
            } else {
                Some(window.iter().sum::<f64>() / period as f64)
            }
        };
        values.push(IndicatorPoint {
            date: bar.date,
            valid: point.is_some(),
            value: point.unwrap_or(0.0),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}
