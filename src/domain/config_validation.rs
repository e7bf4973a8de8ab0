//! Configuration validation.
//!
//! Validates config fields before the agent starts, so a bad file fails
//! before any oracle call.

use crate::domain::agent_config::{DataProvider, OracleProvider};
use crate::domain::error::AgentError;
use crate::ports::config_port::ConfigPort;

pub fn validate_agent_config(config: &dyn ConfigPort) -> Result<(), AgentError> {
    validate_max_steps(config)?;
    validate_oracle(config)?;
    validate_data(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> AgentError {
    AgentError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_max_steps(config: &dyn ConfigPort) -> Result<(), AgentError> {
    let value = config.get_int("agent", "max_steps", 0);
    if value < 0 {
        return Err(invalid(
            "agent",
            "max_steps",
            "max_steps must be non-negative (0 means unbounded)",
        ));
    }
    Ok(())
}

fn validate_oracle(config: &dyn ConfigPort) -> Result<(), AgentError> {
    let provider = match config.get_trimmed("oracle", "provider") {
        None => OracleProvider::OpenAi,
        Some(name) => OracleProvider::parse(&name)
            .ok_or_else(|| invalid("oracle", "provider", "provider must be openai or script"))?,
    };

    let temperature = config.get_double("oracle", "temperature", 0.0);
    if !(0.0..=2.0).contains(&temperature) {
        return Err(invalid(
            "oracle",
            "temperature",
            "temperature must be between 0 and 2",
        ));
    }

    if config.get_int("oracle", "timeout_secs", 60) <= 0 {
        return Err(invalid("oracle", "timeout_secs", "timeout_secs must be positive"));
    }

    if provider == OracleProvider::Script && config.get_trimmed("oracle", "script_path").is_none() {
        return Err(invalid(
            "oracle",
            "script_path",
            "script_path is required for the script provider",
        ));
    }
    Ok(())
}

fn validate_data(config: &dyn ConfigPort) -> Result<(), AgentError> {
    let provider = match config.get_trimmed("data", "provider") {
        None => DataProvider::Yahoo,
        Some(name) => DataProvider::parse(&name)
            .ok_or_else(|| invalid("data", "provider", "provider must be yahoo or csv"))?,
    };

    if config.get_int("data", "timeout_secs", 30) <= 0 {
        return Err(invalid("data", "timeout_secs", "timeout_secs must be positive"));
    }

    if provider == DataProvider::Csv && config.get_trimmed("data", "csv_dir").is_none() {
        return Err(invalid("data", "csv_dir", "csv_dir is required for the csv provider"));
    }
    Ok(())
}
