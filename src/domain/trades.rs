//! Trade extraction from a 0/1 signal and win-rate statistics.
//!
//! A trade opens on the first row whose signal turns 1 while flat and closes
//! on the first later row whose signal is 0. Both legs fill at that row's
//! close. A trade still open at the end of the series is not counted.

use chrono::NaiveDate;

use crate::domain::backtest::BacktestRow;

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub buy_date: NaiveDate,
    pub buy_price: f64,
    pub sell_date: NaiveDate,
    pub sell_price: f64,
}

impl Trade {
    pub fn profit(&self) -> f64 {
        self.sell_price - self.buy_price
    }

    pub fn is_winner(&self) -> bool {
        self.profit() > 0.0
    }
}

pub fn extract_trades(rows: &[BacktestRow]) -> Vec<Trade> {
    let mut trades = Vec::new();
    let mut entry: Option<(NaiveDate, f64)> = None;

    for row in rows {
        match (row.signal, entry) {
            (1, None) => entry = Some((row.date, row.close)),
            (0, Some((buy_date, buy_price))) => {
                trades.push(Trade {
                    buy_date,
                    buy_price,
                    sell_date: row.date,
                    sell_price: row.close,
                });
                entry = None;
            }
            _ => {}
        }
    }

    trades
}

/// Percentage of winning trades in [0, 100]; 0 when there are no trades.
pub fn win_rate_pct(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64 * 100.0
}
