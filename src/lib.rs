//! quantagent — oracle-driven trading research agent.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], process bootstrap in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
