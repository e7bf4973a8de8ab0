//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod openai_oracle;
pub mod script_oracle;
pub mod svg_chart_adapter;
pub mod yahoo_adapter;
