//! Decision oracle port.

use crate::domain::error::AgentError;

/// Produces the next command line from the textual session context.
pub trait DecisionPort {
    fn decide(&self, context: &str) -> Result<String, AgentError>;
}
