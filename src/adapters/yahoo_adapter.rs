//! Yahoo Finance market data adapter.
//!
//! Fetches daily bars from the v8 chart API with `range=1y|6mo&interval=1d`.
//! Rows where every field is null (holidays) are skipped; individually null
//! fields are kept as missing so the backtest's row-wise drop applies.
//! Bar dates are taken in the exchange's local time using `meta.gmtoffset`.

use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::error::AgentError;
use crate::domain::ohlcv::{Lookback, PriceBar, PriceSeries};
use crate::ports::data_port::MarketDataPort;

const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

pub struct YahooDataAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
}

impl YahooDataAdapter {
    pub fn new(timeout_secs: u64) -> Result<Self, AgentError> {
        Self::with_base_url(BASE_URL, timeout_secs)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, AgentError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AgentError::Provider {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: 2,
        })
    }

    /// Chart endpoint for `symbol`, with the symbol percent-encoded as one path segment.
    fn chart_url(&self, symbol: &str, lookback: Lookback) -> Result<Url, AgentError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| AgentError::Provider {
            reason: format!("invalid base URL {}: {}", self.base_url, e),
        })?;
        url.path_segments_mut()
            .map_err(|()| AgentError::Provider {
                reason: format!("base URL {} cannot take a path", self.base_url),
            })?
            .pop_if_empty()
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("range", lookback.as_str())
            .append_pair("interval", "1d");
        Ok(url)
    }

    fn fetch(&self, symbol: &str, lookback: Lookback) -> Result<PriceSeries, AgentError> {
        let url = self.chart_url(symbol, lookback)?;
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(Duration::from_millis(500 * 2u64.pow(attempt - 1)));
            }
            debug!(%url, attempt, "requesting chart data");

            let resp = match self.client.get(url.clone()).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    warn!(symbol, error = %e, "transient network failure");
                    last_error = Some(e.to_string());
                    continue;
                }
                Err(e) => {
                    return Err(AgentError::Provider {
                        reason: format!("request for {} failed: {}", symbol, e),
                    });
                }
            };

            let status = resp.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                warn!(symbol, %status, "retryable HTTP status");
                last_error = Some(format!("HTTP {} for {}", status, symbol));
                continue;
            }
            // Unknown symbols come back as 404 with a chart.error body.
            if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
                return Err(AgentError::Provider {
                    reason: format!("HTTP {} for {}", status, symbol),
                });
            }

            let chart: ChartResponse = resp.json().map_err(|e| AgentError::Provider {
                reason: format!("failed to parse response for {}: {}", symbol, e),
            })?;
            return parse_response(symbol, chart);
        }

        Err(AgentError::Provider {
            reason: last_error.unwrap_or_else(|| "max retries exceeded".into()),
        })
    }
}

impl MarketDataPort for YahooDataAdapter {
    fn daily_bars(&self, ticker: &str, lookback: Lookback) -> Result<PriceSeries, AgentError> {
        self.fetch(ticker, lookback)
    }
}

fn parse_response(symbol: &str, resp: ChartResponse) -> Result<PriceSeries, AgentError> {
    let empty = || PriceSeries::new(symbol, Vec::new());

    let Some(results) = resp.chart.result else {
        return match resp.chart.error {
            Some(err) if err.code == "Not Found" => Ok(empty()),
            Some(err) => Err(AgentError::Provider {
                reason: format!("{}: {}", err.code, err.description),
            }),
            None => Ok(empty()),
        };
    };

    let Some(data) = results.into_iter().next() else {
        return Ok(empty());
    };
    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = local_date(ts, offset).ok_or_else(|| AgentError::Provider {
            reason: format!("invalid timestamp: {}", ts),
        })?;

        let bar = PriceBar {
            date,
            open: quote.open.get(i).copied().flatten(),
            high: quote.high.get(i).copied().flatten(),
            low: quote.low.get(i).copied().flatten(),
            close: quote.close.get(i).copied().flatten(),
            volume: quote.volume.get(i).copied().flatten(),
        };

        if bar.open.is_none()
            && bar.high.is_none()
            && bar.low.is_none()
            && bar.close.is_none()
            && bar.volume.is_none()
        {
            continue;
        }
        bars.push(bar);
    }

    Ok(PriceSeries::new(symbol, bars))
}

fn local_date(ts: i64, gmtoffset: i64) -> Option<NaiveDate> {
    let local = ts.checked_add(gmtoffset)?;
    DateTime::from_timestamp(local, 0).map(|dt| dt.naive_utc().date())
}
