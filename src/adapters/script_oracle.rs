//! Oracle that replays commands from a text file.
//!
//! One command per non-empty line; lines starting with `#` are comments.

use std::cell::Cell;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::domain::error::AgentError;
use crate::ports::decision_port::DecisionPort;

pub struct ScriptOracle {
    commands: Vec<String>,
    next: Cell<usize>,
}

impl ScriptOracle {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let commands = lines
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        Self {
            commands,
            next: Cell::new(0),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| AgentError::Oracle {
            reason: format!("cannot read script {}: {}", path.display(), e),
        })?;
        Ok(Self::from_lines(content.lines()))
    }

    pub fn remaining(&self) -> usize {
        self.commands.len().saturating_sub(self.next.get())
    }
}

impl DecisionPort for ScriptOracle {
    fn decide(&self, _context: &str) -> Result<String, AgentError> {
        let index = self.next.get();
        let command = self.commands.get(index).ok_or_else(|| AgentError::Oracle {
            reason: format!("script exhausted after {} commands", self.commands.len()),
        })?;
        self.next.set(index + 1);
        debug!(line = index + 1, %command, "replaying scripted command");
        Ok(command.clone())
    }
}
