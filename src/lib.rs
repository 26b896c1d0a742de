// src/lib.rs - Library interface for the pendulum analysis pipeline

pub mod config;
pub mod constants;
pub mod data_analysis;
pub mod data_input;
pub mod error;
pub mod pipeline;
pub mod plot_framework;
pub mod plot_functions;

pub use error::{PendulumError, Result};

pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
