//! Domain error types.

/// A command grammar error with position information.
///
/// `raw` keeps the command text exactly as the oracle produced it so the
/// error can be replayed into history verbatim.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
    pub raw: String,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the raw command.
    pub fn display_with_context(&self) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = self.raw,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for quantagent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    CommandParse(#[from] ParseError),

    #[error("data provider error: {reason}")]
    Provider { reason: String },

    #[error("no price data for {ticker}")]
    NoData { ticker: String },

    #[error("insufficient data for {ticker}: have {bars} bars, need {minimum}")]
    InsufficientData {
        ticker: String,
        bars: usize,
        minimum: usize,
    },

    #[error("No '{column}' column found for {ticker}")]
    MissingColumn { ticker: String, column: String },

    #[error("decision oracle error: {reason}")]
    Oracle { reason: String },

    #[error("missing credential {name}")]
    MissingCredential { name: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("chart rendering failed: {reason}")]
    Chart { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Setup errors stop the process before the control loop starts.
    pub fn is_fatal_setup(&self) -> bool {
        matches!(
            self,
            AgentError::MissingCredential { .. }
                | AgentError::ConfigParse { .. }
                | AgentError::ConfigInvalid { .. }
        )
    }
}

impl From<&AgentError> for std::process::ExitCode {
    fn from(err: &AgentError) -> Self {
        let code: u8 = match err {
            AgentError::Io(_) => 1,
            AgentError::MissingCredential { .. }
            | AgentError::ConfigParse { .. }
            | AgentError::ConfigInvalid { .. } => 2,
            AgentError::Oracle { .. } => 3,
            AgentError::CommandParse(_) => 4,
            AgentError::Provider { .. }
            | AgentError::NoData { .. }
            | AgentError::InsufficientData { .. }
            | AgentError::MissingColumn { .. }
            | AgentError::Chart { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
