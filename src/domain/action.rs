//! Typed actions the agent can execute.

use std::fmt;

/// Message used when `FINISH` carries no quoted argument.
pub const DEFAULT_FINISH_MESSAGE: &str = "Finished.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Fetch { ticker: String },
    Indicator { ticker: String, name: String },
    Backtest { ticker: String, strategy: String },
    Finish { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Fetch,
    Indicator,
    Backtest,
    Finish,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Fetch,
        ActionKind::Indicator,
        ActionKind::Backtest,
        ActionKind::Finish,
    ];

    /// Command keyword, matched case-sensitively.
    pub fn keyword(&self) -> &'static str {
        match self {
            ActionKind::Fetch => "FETCH",
            ActionKind::Indicator => "INDICATOR",
            ActionKind::Backtest => "BACKTEST",
            ActionKind::Finish => "FINISH",
        }
    }

    /// Minimum number of quoted arguments the keyword requires.
    pub fn arity(&self) -> usize {
        match self {
            ActionKind::Fetch => 1,
            ActionKind::Indicator | ActionKind::Backtest => 2,
            ActionKind::Finish => 0,
        }
    }

    /// Grammar line shown to the decision oracle.
    pub fn usage(&self) -> &'static str {
        match self {
            ActionKind::Fetch => "FETCH \"TICKER\"",
            ActionKind::Indicator => "INDICATOR \"TICKER\" \"INDICATOR_NAME\"",
            ActionKind::Backtest => "BACKTEST \"TICKER\" \"STRATEGY_NAME\"",
            ActionKind::Finish => "FINISH \"final answer\"",
        }
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Fetch { .. } => ActionKind::Fetch,
            Action::Indicator { .. } => ActionKind::Indicator,
            Action::Backtest { .. } => ActionKind::Backtest,
            Action::Finish { .. } => ActionKind::Finish,
        }
    }

    pub fn finish(message: impl Into<String>) -> Self {
        Action::Finish {
            message: message.into(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Fetch { ticker } => write!(f, "FETCH \"{}\"", ticker),
            Action::Indicator { ticker, name } => {
                write!(f, "INDICATOR \"{}\" \"{}\"", ticker, name)
            }
            Action::Backtest { ticker, strategy } => {
                write!(f, "BACKTEST \"{}\" \"{}\"", ticker, strategy)
            }
            Action::Finish { message } => write!(f, "FINISH \"{}\"", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_command_syntax() {
        let action = Action::Indicator {
            ticker: "TSLA".into(),
            name: "SMA".into(),
        };
        assert_eq!(action.to_string(), "INDICATOR \"TSLA\" \"SMA\"");
        assert_eq!(Action::finish("done").to_string(), "FINISH \"done\"");
    }

    #[test]
    fn kind_matches_variant() {
        let action = Action::Backtest {
            ticker: "TSLA".into(),
            strategy: "SMA".into(),
        };
        assert_eq!(action.kind(), ActionKind::Backtest);
        assert_eq!(action.kind().keyword(), "BACKTEST");
    }

    #[test]
    fn arity_per_keyword() {
        assert_eq!(ActionKind::Fetch.arity(), 1);
        assert_eq!(ActionKind::Indicator.arity(), 2);
        assert_eq!(ActionKind::Backtest.arity(), 2);
        assert_eq!(ActionKind::Finish.arity(), 0);
    }
}
