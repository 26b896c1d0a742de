// src/data_analysis/mod.rs

pub mod fit_quality;
pub mod least_squares;
pub mod model_fit;
pub mod parameter_estimation;
pub mod peak_detection;
pub mod period_estimation;
pub mod regression;
pub mod smoothing;
pub mod uncertainty;

// src/data_analysis/mod.rs
