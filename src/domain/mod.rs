//! Core domain types and logic.

pub mod action;
pub mod agent_config;
pub mod backtest;
pub mod command_parser;
pub mod config_validation;
pub mod error;
pub mod executor;
pub mod indicator;
pub mod ohlcv;
pub mod session;
pub mod trades;
