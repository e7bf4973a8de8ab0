//! SVG chart renderer for backtest results.
//!
//! Two stacked panels: close price with SMA and trade markers on top, the
//! buy-and-hold vs strategy equity curves below. Each call builds its own
//! canvas and writes one file; nothing is shared between calls.

use std::fs;
use std::path::PathBuf;

use tracing::debug;
use uuid::Uuid;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::AgentError;
use crate::ports::chart_port::ChartPort;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 640.0;
const PADDING: f64 = 48.0;
const PANEL_GAP: f64 = 40.0;

pub struct SvgChartAdapter {
    chart_dir: PathBuf,
}

impl SvgChartAdapter {
    pub fn new(chart_dir: impl Into<PathBuf>) -> Self {
        Self {
            chart_dir: chart_dir.into(),
        }
    }

    fn artifact_path(&self, ticker: &str) -> PathBuf {
        let safe: String = ticker
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let id = Uuid::new_v4().simple().to_string();
        self.chart_dir
            .join(format!("chart_{}_{}.svg", safe, &id[..6]))
    }
}

impl ChartPort for SvgChartAdapter {
    fn render(&self, result: &BacktestResult) -> Result<String, AgentError> {
        let svg = render_svg(result);
        let path = self.artifact_path(&result.ticker);
        fs::create_dir_all(&self.chart_dir).map_err(|e| AgentError::Chart {
            reason: format!("cannot create {}: {}", self.chart_dir.display(), e),
        })?;
        fs::write(&path, svg).map_err(|e| AgentError::Chart {
            reason: format!("cannot write {}: {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "chart written");
        Ok(path.display().to_string())
    }
}

/// Chart title, annotated with the trade win rate.
pub fn chart_title(result: &BacktestResult) -> String {
    format!(
        "{} Price & {} - Trade Accuracy: {:.2}%",
        result.ticker, result.strategy, result.win_rate_pct
    )
}

/// Maps data coordinates into one rectangular panel.
struct Panel {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    min: f64,
    max: f64,
    count: usize,
}

impl Panel {
    fn new(top: f64, height: f64, values: &[f64], count: usize) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (min, max) = if min.is_finite() && max.is_finite() {
            (min, max)
        } else {
            (0.0, 1.0)
        };
        Self {
            left: PADDING,
            top,
            width: WIDTH - 2.0 * PADDING,
            height,
            min,
            max,
            count,
        }
    }

    fn x(&self, i: usize) -> f64 {
        if self.count > 1 {
            self.left + i as f64 * self.width / (self.count - 1) as f64
        } else {
            self.left
        }
    }

    fn y(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range > 0.0 {
            self.top + self.height - (value - self.min) * self.height / range
        } else {
            self.top + self.height / 2.0
        }
    }

    fn polyline(&self, values: &[f64]) -> String {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| format!("{:.1},{:.1}", self.x(i), self.y(v)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

struct SvgCanvas {
    body: String,
}

impl SvgCanvas {
    fn new() -> Self {
        Self {
            body: String::new(),
        }
    }

    fn frame(&mut self, panel: &Panel) {
        self.body.push_str(&format!(
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"none\" stroke=\"#cccccc\"/>\n",
            panel.left, panel.top, panel.width, panel.height
        ));
    }

    fn line(&mut self, panel: &Panel, values: &[f64], color: &str) {
        if values.is_empty() {
            return;
        }
        self.body.push_str(&format!(
            "<polyline fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\" points=\"{}\"/>\n",
            color,
            panel.polyline(values)
        ));
    }

    fn marker(&mut self, x: f64, y: f64, up: bool, color: &str) {
        let (tip, base) = if up { (-6.0, 4.0) } else { (6.0, -4.0) };
        let points = format!(
            "{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
            x,
            y + tip,
            x - 5.0,
            y + base,
            x + 5.0,
            y + base
        );
        self.body.push_str(&format!(
            "<polygon points=\"{}\" fill=\"{}\"/>\n",
            points, color
        ));
    }

    fn text(&mut self, x: f64, y: f64, size: u32, content: &str) {
        self.body.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" font-family=\"sans-serif\" font-size=\"{}\">{}</text>\n",
            x,
            y,
            size,
            escape(content)
        ));
    }

    fn finish(self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.0}\" height=\"{h:.0}\" viewBox=\"0 0 {w:.0} {h:.0}\">\n\
             <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n{body}</svg>\n",
            w = WIDTH,
            h = HEIGHT,
            body = self.body
        )
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_svg(result: &BacktestResult) -> String {
    let rows = &result.rows;
    let mut canvas = SvgCanvas::new();

    let panel_height = (HEIGHT - 2.0 * PADDING - PANEL_GAP) / 2.0;
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let smas: Vec<f64> = rows.iter().map(|r| r.sma).collect();
    let market: Vec<f64> = rows.iter().map(|r| r.cum_market).collect();
    let strategy: Vec<f64> = rows.iter().map(|r| r.cum_strategy).collect();

    let price_values: Vec<f64> = closes.iter().chain(&smas).copied().collect();
    let price_panel = Panel::new(PADDING, panel_height, &price_values, rows.len());
    canvas.text(PADDING, PADDING - 12.0, 16, &chart_title(result));
    canvas.frame(&price_panel);
    canvas.line(&price_panel, &closes, "blue");
    canvas.line(&price_panel, &smas, "orange");

    for trade in &result.trades {
        let color = if trade.is_winner() { "green" } else { "red" };
        if let Some(i) = rows.iter().position(|r| r.date == trade.buy_date) {
            canvas.marker(price_panel.x(i), price_panel.y(trade.buy_price), true, color);
        }
        if let Some(i) = rows.iter().position(|r| r.date == trade.sell_date) {
            canvas.marker(price_panel.x(i), price_panel.y(trade.sell_price), false, color);
        }
    }

    let equity_top = PADDING + panel_height + PANEL_GAP;
    let equity_values: Vec<f64> = market.iter().chain(&strategy).copied().collect();
    let equity_panel = Panel::new(equity_top, panel_height, &equity_values, rows.len());
    canvas.text(PADDING, equity_top - 8.0, 14, "Equity Curve");
    canvas.frame(&equity_panel);
    canvas.line(&equity_panel, &market, "green");
    canvas.line(&equity_panel, &strategy, "red");
    canvas.text(
        PADDING + 8.0,
        equity_top + 16.0,
        12,
        &format!("Buy & Hold (green) / {} Strategy (red)", result.strategy),
    );

    canvas.finish()
}
