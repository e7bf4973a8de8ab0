//! Port traits for the collaborators the agent depends on.

pub mod chart_port;
pub mod config_port;
pub mod data_port;
pub mod decision_port;
