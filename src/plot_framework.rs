// src/plot_framework.rs

use ndarray::Array1;
use ndarray_stats::QuantileExt;
use plotters::backend::{BitMapBackend, DrawingBackend};
use plotters::chart::{ChartBuilder, SeriesLabelPosition};
use plotters::drawing::{DrawingArea, IntoDrawingArea};
use plotters::element::{Circle, PathElement, Text};
use plotters::series::LineSeries;
use plotters::style::colors::{BLACK, RED, WHITE};
use plotters::style::{Color, IntoFont, RGBColor};

use std::error::Error;
use std::ops::Range;

use crate::constants::{
    FONT_SIZE_AXIS_LABEL, FONT_SIZE_CHART_TITLE, FONT_SIZE_LEGEND, FONT_SIZE_MAIN_TITLE,
    FONT_SIZE_MESSAGE, LINE_WIDTH_LEGEND, PLOT_HEIGHT, PLOT_WIDTH,
};

/// Calculate plot range with padding.
/// Adds 15% padding, or a fixed padding for very small ranges.
pub fn calculate_range(min_val: f64, max_val: f64) -> (f64, f64) {
    let (min, max) = if min_val <= max_val {
        (min_val, max_val)
    } else {
        (max_val, min_val)
    };
    let range = (max - min).abs();
    let padding = if range < 1e-6 { 0.5 } else { range * 0.15 };
    (min - padding, max + padding)
}

/// Padded x and y ranges covering every finite point of `series`.
pub fn data_range(series: &[PlotSeries]) -> Option<(Range<f64>, Range<f64>)> {
    let finite = || {
        series
            .iter()
            .flat_map(|s| s.data.iter())
            .filter(|(x, y)| x.is_finite() && y.is_finite())
    };
    let xs: Array1<f64> = finite().map(|p| p.0).collect();
    let ys: Array1<f64> = finite().map(|p| p.1).collect();
    if xs.is_empty() {
        return None;
    }
    let (x_min, x_max) = calculate_range(*xs.min_skipnan(), *xs.max_skipnan());
    let (y_min, y_max) = calculate_range(*ys.min_skipnan(), *ys.max_skipnan());
    Some((x_min..x_max, y_min..y_max))
}

/// Draw a "Data Unavailable" message on a plot area.
pub fn draw_unavailable_message(
    area: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    panel_name: &str,
    plot_type: &str,
    reason: &str,
) -> Result<(), Box<dyn Error>> {
    const CHAR_WIDTH_RATIO: f32 = 0.6;
    const LINE_HEIGHT_SPACING: i32 = 4;

    let (x_range, y_range) = area.get_pixel_range();
    let (width, height) = (
        (x_range.end - x_range.start) as u32,
        (y_range.end - y_range.start) as u32,
    );
    let message = format!("{panel_name} {plot_type} Data Unavailable:\n{reason}");

    let estimated_char_width = (FONT_SIZE_MESSAGE as f32 * CHAR_WIDTH_RATIO) as i32;
    let estimated_line_height = FONT_SIZE_MESSAGE + LINE_HEIGHT_SPACING;

    let lines: Vec<&str> = message.split('\n').collect();
    let max_line_length = lines.iter().map(|line| line.len()).max().unwrap_or(0);
    let estimated_text_width = max_line_length.saturating_mul(estimated_char_width as usize) as i32;
    let estimated_text_height = lines.len().saturating_mul(estimated_line_height as usize) as i32;

    let center_x = width as i32 / 2 - estimated_text_width / 2;
    let center_y = height as i32 / 2 - estimated_text_height / 2;

    let text_style = ("sans-serif", FONT_SIZE_MESSAGE).into_font().color(&RED);
    area.draw(&Text::new(message, (center_x, center_y), text_style))?;
    Ok(())
}

/// How a series is rendered.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeriesStyle {
    Line,
    /// Filled circles of the given radius.
    Points(i32),
}

#[derive(Clone)]
pub struct PlotSeries {
    pub data: Vec<(f64, f64)>,
    pub label: String,
    pub color: RGBColor,
    pub stroke_width: u32,
    pub style: SeriesStyle,
}

impl PlotSeries {
    pub fn line(data: Vec<(f64, f64)>, label: impl Into<String>, color: RGBColor, stroke_width: u32) -> Self {
        Self {
            data,
            label: label.into(),
            color,
            stroke_width,
            style: SeriesStyle::Line,
        }
    }

    pub fn points(data: Vec<(f64, f64)>, label: impl Into<String>, color: RGBColor, radius: i32) -> Self {
        Self {
            data,
            label: label.into(),
            color,
            stroke_width: 1,
            style: SeriesStyle::Points(radius),
        }
    }
}

#[derive(Clone)]
pub struct PlotConfig {
    pub title: String,
    pub x_range: Range<f64>,
    pub y_range: Range<f64>,
    pub series: Vec<PlotSeries>,
    pub x_label: String,
    pub y_label: String,
}

impl PlotConfig {
    /// Config whose ranges are derived from the series data. `None` when nothing is finite.
    pub fn fitted_to_data(
        title: impl Into<String>,
        series: Vec<PlotSeries>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Option<Self> {
        let (x_range, y_range) = data_range(&series)?;
        Some(Self {
            title: title.into(),
            x_range,
            y_range,
            series,
            x_label: x_label.into(),
            y_label: y_label.into(),
        })
    }
}

fn format_tick(v: f64) -> String {
    if v.abs() >= 1000.0 {
        format!("{:.0}", v)
    } else if v.abs() >= 10.0 {
        format!("{:.1}", v)
    } else {
        format!("{:.3}", v)
    }
}

/// Draws a single chart using a PlotConfig struct.
fn draw_chart_with_config(
    area: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    plot_config: &PlotConfig,
) -> Result<(), Box<dyn Error>> {
    let mut chart = ChartBuilder::on(area)
        .caption(&plot_config.title, ("sans-serif", FONT_SIZE_CHART_TITLE))
        .margin(5)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(plot_config.x_range.clone(), plot_config.y_range.clone())?;

    chart
        .configure_mesh()
        .x_desc(&plot_config.x_label)
        .y_desc(&plot_config.y_label)
        .x_labels(15)
        .y_labels(10)
        .x_label_formatter(&|x| format_tick(*x))
        .y_label_formatter(&|y| format_tick(*y))
        .light_line_style(WHITE.mix(0.7))
        .label_style(("sans-serif", FONT_SIZE_AXIS_LABEL))
        .draw()?;

    let mut legend_series_count = 0;

    for s in &plot_config.series {
        if s.data.is_empty() {
            continue;
        }
        let finite = s
            .data
            .iter()
            .copied()
            .filter(|(x, y)| x.is_finite() && y.is_finite());

        match s.style {
            SeriesStyle::Line => {
                let series = chart.draw_series(LineSeries::new(
                    finite,
                    s.color.stroke_width(s.stroke_width),
                ))?;
                if !s.label.is_empty() {
                    series.label(&s.label).legend(move |(x, y)| {
                        PathElement::new(
                            vec![(x, y), (x + 20, y)],
                            s.color.stroke_width(LINE_WIDTH_LEGEND),
                        )
                    });
                    legend_series_count += 1;
                }
            }
            SeriesStyle::Points(radius) => {
                let series = chart.draw_series(
                    finite.map(|point| Circle::new(point, radius, s.color.filled())),
                )?;
                if !s.label.is_empty() {
                    series
                        .label(&s.label)
                        .legend(move |(x, y)| Circle::new((x + 10, y), radius.min(5), s.color.filled()));
                    legend_series_count += 1;
                }
            }
        }
    }

    if legend_series_count > 0 {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", FONT_SIZE_LEGEND))
            .draw()?;
    }

    Ok(())
}

fn panel_is_drawable(config: &PlotConfig) -> Result<(), &'static str> {
    let has_data = config.series.iter().any(|s| !s.data.is_empty());
    let valid_ranges =
        config.x_range.end > config.x_range.start && config.y_range.end > config.y_range.start;
    if !has_data {
        Err("No data points")
    } else if !valid_ranges {
        Err("Invalid ranges")
    } else {
        Ok(())
    }
}

/// Creates a stacked plot image with one row per panel.
///
/// `get_panel_plot_data` is called with each panel index; `None` renders a
/// placeholder message instead of a chart.
pub fn draw_stacked_plot<'a, F>(
    output_filename: &'a str,
    root_name: &str,
    plot_type_name: &str,
    panel_names: &[&str],
    mut get_panel_plot_data: F,
) -> Result<(), Box<dyn Error>>
where
    F: FnMut(usize) -> Option<PlotConfig>,
    <BitMapBackend<'a> as DrawingBackend>::ErrorType: 'static,
{
    let root_area =
        BitMapBackend::new(output_filename, (PLOT_WIDTH, PLOT_HEIGHT)).into_drawing_area();
    root_area.fill(&WHITE)?;
    root_area.draw(&Text::new(
        root_name,
        (10, 10),
        ("sans-serif", FONT_SIZE_MAIN_TITLE)
            .into_font()
            .color(&BLACK),
    ))?;
    let margined_root_area = root_area.margin(50, 5, 5, 5);
    let sub_plot_areas = margined_root_area.split_evenly((panel_names.len().max(1), 1));
    let mut any_panel_plotted = false;

    for (panel_index, (area, panel_name)) in sub_plot_areas.iter().zip(panel_names).enumerate() {
        match get_panel_plot_data(panel_index) {
            Some(config) => match panel_is_drawable(&config) {
                Ok(()) => {
                    draw_chart_with_config(area, &config)?;
                    any_panel_plotted = true;
                }
                Err(reason) => draw_unavailable_message(area, panel_name, plot_type_name, reason)?,
            },
            None => {
                let reason = "Calculation/Data Extraction Failed";
                draw_unavailable_message(area, panel_name, plot_type_name, reason)?;
            }
        }
    }

    root_area.present()?;
    if any_panel_plotted {
        println!("  Stacked plot saved as '{output_filename}'.");
    } else {
        println!("  '{output_filename}' has no data for any panel, only placeholder messages shown.");
    }
    Ok(())
}

/// Creates a single-chart plot image.
pub fn draw_single_plot<'a>(
    output_filename: &'a str,
    root_name: &str,
    plot_type_name: &str,
    plot_config: Option<PlotConfig>,
) -> Result<(), Box<dyn Error>>
where
    <BitMapBackend<'a> as DrawingBackend>::ErrorType: 'static,
{
    let mut plot_config = plot_config;
    draw_stacked_plot(output_filename, root_name, plot_type_name, &[""], move |_| {
        plot_config.take()
    })
}


// src/plot_framework.rs
