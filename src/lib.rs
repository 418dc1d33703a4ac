//! Conservation statistics for California urban water suppliers, built from
//! their monthly self-reported production figures.
pub mod cli;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod output;
pub mod reports;
pub mod stats;
pub mod types;
pub mod util;
