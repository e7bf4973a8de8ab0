//! RSI (Relative Strength Index).
//!
//! delta[i] = close[i] - close[i-1]; gains and losses are averaged with a
//! simple trailing mean over the last n deltas (no Wilder smoothing).
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: first n bars are invalid (need n price changes), so with n = 14 the
//! first value is at index 14. The change into bar 0 is undefined rather than
//! zero; counting it as a flat day would give a value one bar earlier.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::PriceSeries;

pub fn calculate_rsi(series: &PriceSeries, period: usize) -> IndicatorSeries {
    let closes = series.closes();
    let mut values = Vec::with_capacity(closes.len());

    // deltas[i] is the change into bar i; deltas[0] does not exist.
    let deltas: Vec<f64> = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| if i == 0 { f64::NAN } else { c - closes[i - 1] })
        .collect();

    for (i, bar) in series.bars.iter().enumerate() {
        let rsi = if period == 0 || i < period {
            None
        } else {
            let window = &deltas[i + 1 - period..=i];
            if window.iter().any(|d| d.is_nan()) {
                None
            } else {
                let avg_gain =
                    window.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64;
                let avg_loss =
                    window.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64;
                Some(if avg_loss == 0.0 {
                    100.0
                } else {
                    100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
                })
            }
        };
        values.push(IndicatorPoint {
            date: bar.date,
            valid: rsi.is_some(),
            value: rsi.unwrap_or(0.0),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::PriceBar;
    use chrono::NaiveDate;

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
    fn rsi_empty_series() {
        let series = calculate_rsi(&make_series(&[]), 14);
        assert_eq!(series.values.len(), 0);
    }

    #[test]
    fn rsi_warmup_period() {
        let prices: Vec<f64> = (1..=15).map(|i| 100.0 + (i as f64 % 5.0) * 2.0).collect();
        let series = calculate_rsi(&make_series(&prices), 14);

        assert_eq!(series.values.len(), 15);
        for i in 0..14 {
            assert!(!series.values[i].valid, "Bar {} should be invalid", i);
        }
        assert!(series.values[14].valid, "Bar 14 should be valid");
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&make_series(&prices), 14);
        assert!((series.values[14].value - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_flat_prices_is_100() {
        let series = calculate_rsi(&make_series(&[50.0; 16]), 14);
        assert!((series.values[15].value - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&make_series(&prices), 14);
        assert!(series.values[14].value.abs() < f64::EPSILON);
    }

    #[test]
    fn rsi_uses_simple_trailing_means() {
        // Alternating +2/-1 deltas over a period-4 window: gains 4/4, losses 2/4.
        let series = calculate_rsi(&make_series(&[10.0, 12.0, 11.0, 13.0, 12.0]), 4);
        let expected = 100.0 - 100.0 / (1.0 + 1.0 / 0.5);
        assert!((series.values[4].value - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_in_range() {
        let prices: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&make_series(&prices), 14);
        for point in series.values.iter().filter(|p| p.valid) {
            assert!((0.0..=100.0).contains(&point.value), "RSI {} out of range", point.value);
        }
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&make_series(&[100.0, 101.0]), 0);
        assert!(series.values.iter().all(|p| !p.valid));
    }
}
