//! SVG line chart of a price series.
//!
//! Draws the daily closes and their five-day moving average. Synthetic
//! series are marked "(simulated)" in the caption.

use plotters::prelude::*;
use thiserror::Error;

use crate::PriceSeries;

/// Default canvas size in pixels.
pub const DEFAULT_CHART_SIZE: (u32, u32) = (960, 540);

const MA_WINDOW: usize = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChartError {
    #[error("not enough price data to draw a chart: {points} point(s), at least 2 required")]
    TooFewPoints { points: usize },
    #[error("chart rendering failed: {0}")]
    Render(String),
}

/// Renders `series` into an SVG document.
///
/// # Errors
///
/// Returns [`ChartError::TooFewPoints`] for series shorter than two points and
/// [`ChartError::Render`] when the plotting backend fails.
pub fn render_svg(series: &PriceSeries, size: (u32, u32)) -> Result<String, ChartError> {
    let points = series.points();
    if points.len() < 2 {
        return Err(ChartError::TooFewPoints {
            points: points.len(),
        });
    }

    let closes = series.closes().collect::<Vec<_>>();
    let averages = trailing_averages(&closes, MA_WINDOW);

    let min_price = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let max_price = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let padding = (max_price - min_price).max(1e-8) * 0.1;
    let y_min = (min_price - padding).max(0.0);
    let y_max = max_price + padding;

    let caption = if series.is_synthetic() {
        format!("{} (simulated)", series.ticker)
    } else {
        format!("{} ({})", series.ticker, series.source)
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(caption, ("sans-serif", 28).into_font())
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0..points.len() - 1, y_min..y_max)
            .map_err(render_error)?;

        chart
            .configure_mesh()
            .x_labels(points.len().min(10))
            .x_label_formatter(&|index| {
                points
                    .get(*index)
                    .map(|point| point.date.format_iso())
                    .unwrap_or_default()
            })
            .y_desc("Close")
            .draw()
            .map_err(render_error)?;

        chart
            .draw_series(LineSeries::new(closes.iter().copied().enumerate(), &BLUE))
            .map_err(render_error)?
            .label("Close")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

        chart
            .draw_series(LineSeries::new(averages.into_iter().enumerate(), &RED))
            .map_err(render_error)?
            .label(format!("MA{MA_WINDOW}"))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(render_error)?;

        root.present().map_err(render_error)?;
    }

    Ok(svg)
}

/// Moving average at every index over at most `window` trailing closes.
fn trailing_averages(closes: &[f64], window: usize) -> Vec<f64> {
    (0..closes.len())
        .map(|index| {
            let start = (index + 1).saturating_sub(window);
            let tail = &closes[start..=index];
            tail.iter().sum::<f64>() / tail.len() as f64
        })
        .collect()
}

fn render_error(error: impl std::fmt::Display) -> ChartError {
    ChartError::Render(error.to_string())
}
