// src/plot_functions/mod.rs

pub mod plot_angle_vs_time;
pub mod plot_frequency_vs_length;
pub mod plot_frequency_vs_mass;
pub mod plot_period_squared_vs_length;
pub mod plot_relative_error;

// src/plot_functions/mod.rs
