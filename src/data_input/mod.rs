// src/data_input/mod.rs

pub mod signal_data;
pub mod signal_parser;
pub mod trial_catalog;

// src/data_input/mod.rs
