use std::path::{Path, PathBuf};

use plotters::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("no loss values to plot")]
    Empty,
    #[error("Failed to draw loss curve to {path}: {message}")]
    Draw { path: PathBuf, message: String },
}

/// Draws mean log-loss per training pass as an SVG line chart.
pub fn plot_loss_curve(path: &Path, losses: &[f64]) -> Result<(), PlotError> {
    if losses.is_empty() {
        return Err(PlotError::Empty);
    }

    let draw_error = |error: &dyn std::fmt::Display| PlotError::Draw {
        path: path.to_path_buf(),
        message: error.to_string(),
    };

    let max_loss = losses
        .iter()
        .copied()
        .filter(|loss| loss.is_finite())
        .fold(0.0_f64, f64::max)
        .max(f64::EPSILON);

    let root = SVGBackend::new(path, (800, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(|error| draw_error(&error))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("training log-loss", ("sans-serif", 24))
        .margin(16)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(1..losses.len().max(2), 0.0..max_loss * 1.05)
        .map_err(|error| draw_error(&error))?;

    chart
        .configure_mesh()
        .x_desc("pass")
        .y_desc("mean log-loss")
        .draw()
        .map_err(|error| draw_error(&error))?;

    chart
        .draw_series(LineSeries::new(
            losses
                .iter()
                .enumerate()
                .map(|(pass, &loss)| (pass + 1, loss)),
            &BLUE,
        ))
        .map_err(|error| draw_error(&error))?;

    root.present().map_err(|error| draw_error(&error))?;
    tracing::info!(path = %path.display(), passes = losses.len(), "wrote loss curve");
    Ok(())
}
