// src/constants.rs

use plotters::style::colors::full_palette::{BLUE, GREEN, GREY, ORANGE, PURPLE, RED, TEAL};
use plotters::style::RGBColor;

// Input format: t x y theta omega.
pub const EXPECTED_COLUMN_COUNT: usize = 5;
pub const COLUMN_TIME: usize = 0;
pub const COLUMN_X: usize = 1;
pub const COLUMN_Y: usize = 2;
pub const COLUMN_ANGLE: usize = 3;
pub const COLUMN_ANGULAR_VELOCITY: usize = 4;

// Rest position sits at 90 degrees in the tracker's reference frame.
pub const REST_ANGLE_OFFSET_DEG: f64 = 90.0;

// Centered rolling median used for sensor jitter and amplitude estimation.
pub const ROLLING_MEDIAN_WINDOW: usize = 5;

// Physics.
pub const DEFAULT_GRAVITY_M_S2: f64 = 9.81;

// Model fitter bounds and budget.
pub const FREQUENCY_BOUND_FRACTION: f64 = 0.2;
pub const PHASE_BOUND_RAD: f64 = 2.0 * std::f64::consts::PI;
pub const MAX_FUNCTION_EVALUATIONS: usize = 10_000;
pub const SOFT_L1_SCALE: f64 = 1.0;

// Levenberg-Marquardt tolerances (same meaning as ftol/xtol/gtol in MINPACK).
pub const LM_COST_TOLERANCE: f64 = 1e-12;
pub const LM_STEP_TOLERANCE: f64 = 1e-12;
pub const LM_GRADIENT_TOLERANCE: f64 = 1e-12;
pub const LM_INITIAL_DAMPING: f64 = 1e-3;
pub const LM_MAX_DAMPING: f64 = 1e16;

// Relative error against the initial angle is floored to avoid dividing by ~0.
pub const RELATIVE_ERROR_ANGLE_FLOOR: f64 = 1e-2;

// Plot dimensions.
pub const PLOT_WIDTH: u32 = 1600;
pub const PLOT_HEIGHT: u32 = 1000;

// Fonts.
pub const FONT_SIZE_MAIN_TITLE: i32 = 24;
pub const FONT_SIZE_CHART_TITLE: i32 = 20;
pub const FONT_SIZE_AXIS_LABEL: i32 = 14;
pub const FONT_SIZE_LEGEND: i32 = 14;
pub const FONT_SIZE_MESSAGE: i32 = 18;

// --- Plot Color Assignments ---
pub const COLOR_MEASURED: &RGBColor = &BLUE;
pub const COLOR_MODEL: &RGBColor = &RED;
pub const COLOR_FREQUENCY: &RGBColor = &BLUE;
pub const COLOR_MASS: &RGBColor = &GREEN;
pub const COLOR_REGRESSION_POINTS: &RGBColor = &BLUE;
pub const COLOR_REGRESSION_LINE: &RGBColor = &RED;
pub const COLOR_RELATIVE_ERROR: &RGBColor = &PURPLE;
pub const COLOR_RESIDUAL: &RGBColor = &ORANGE;
pub const COLOR_ZERO_LINE: &RGBColor = &GREY;
pub const COLOR_ANGULAR_VELOCITY: &RGBColor = &TEAL;

// Series palette for per-condition lines.
pub const SERIES_PALETTE: [&RGBColor; 4] = [&BLUE, &ORANGE, &GREEN, &PURPLE];

// Stroke widths and marker sizes.
pub const LINE_WIDTH_PLOT: u32 = 2;
pub const LINE_WIDTH_LEGEND: u32 = 2;
pub const POINT_RADIUS: i32 = 5;
pub const POINT_RADIUS_DENSE: i32 = 2;

// src/constants.rs
