//! Drowsiness Score Graph
//!
//! Renders the score log as a line-and-marker chart of score over time.
//! Runs offline against whatever the server has written so far.

use chrono::DateTime;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;
use storage::{DrowsinessRecord, StorageError};
use thiserror::Error;

/// Graph errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Score log error: {0}")]
    Storage(#[from] StorageError),

    #[error("Score log contains no records")]
    Empty,

    #[error("Rendering failed: {0}")]
    Render(String),
}

/// Output image settings
#[derive(Debug, Clone)]
pub struct GraphOptions {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            width: 1800,
            height: 900,
            title: "Drowsiness Score Over Time".to_string(),
        }
    }
}

/// Totals printed alongside the chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub records: usize,
    pub drowsy: usize,
    pub min_score: f32,
    pub max_score: f32,
}

pub fn summarize(records: &[DrowsinessRecord]) -> Result<Summary, GraphError> {
    let first = records.first().ok_or(GraphError::Empty)?;
    Ok(records.iter().fold(
        Summary {
            records: 0,
            drowsy: 0,
            min_score: first.score,
            max_score: first.score,
        },
        |acc, r| Summary {
            records: acc.records + 1,
            drowsy: acc.drowsy + r.is_drowsy as usize,
            min_score: acc.min_score.min(r.score),
            max_score: acc.max_score.max(r.score),
        },
    ))
}

/// Chart points as (unix seconds, score)
pub fn series(records: &[DrowsinessRecord]) -> Vec<(i64, f64)> {
    records
        .iter()
        .map(|r| (r.timestamp.and_utc().timestamp(), r.score as f64))
        .collect()
}

/// Axis ranges covering every point, padded so markers are not clipped
pub fn bounds(points: &[(i64, f64)]) -> Result<(Range<i64>, Range<f64>), GraphError> {
    let &(x0, y0) = points.first().ok_or(GraphError::Empty)?;
    let (mut x_min, mut x_max, mut y_min, mut y_max) = (x0, x0, y0, y0);
    for &(x, y) in points {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    if x_min == x_max {
        x_min -= 60;
        x_max += 60;
    }
    let pad = if y_max > y_min { (y_max - y_min) * 0.05 } else { 0.5 };

    Ok((x_min..x_max, (y_min - pad)..(y_max + pad)))
}

/// Format an x-axis tick (unix seconds of a local wall-clock time)
pub fn format_tick(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn render_err<E: std::fmt::Display>(e: E) -> GraphError {
    GraphError::Render(e.to_string())
}

/// Draw the chart to a PNG file
pub fn render(
    records: &[DrowsinessRecord],
    output: &Path,
    options: &GraphOptions,
) -> Result<(), GraphError> {
    let points = series(records);
    let (x_range, y_range) = bounds(&points)?;

    let root = BitMapBackend::new(output, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            &options.title,
            ("sans-serif", 32).into_font().style(FontStyle::Bold),
        )
        .margin(24)
        .x_label_area_size(80)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range, y_range)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc("Drowsiness Score")
        .x_labels(8)
        .x_label_formatter(&|secs: &i64| format_tick(*secs))
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(BLACK.mix(0.05))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(2)))
        .map_err(render_err)?;
    chart
        .draw_series(points.iter().map(|&p| Circle::new(p, 4, BLUE.filled())))
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use storage::TIMESTAMP_FORMAT;

    fn record(ts: &str, score: f32, is_drowsy: bool) -> DrowsinessRecord {
        DrowsinessRecord {
            timestamp: NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).unwrap(),
            score,
            is_drowsy,
        }
    }

    #[test]
    fn test_series_uses_wall_clock_seconds() {
        let points = series(&[record("2024-05-01 13:45:09", 0.25, false)]);
        assert_eq!(points.len(), 1);
        assert_eq!(format_tick(points[0].0), "05-01 13:45:09");
        assert_eq!(points[0].1, 0.25);
    }

    #[test]
    fn test_bounds_pad_scores() {
        let (x, y) = bounds(&[(100, 0.0), (200, 1.0)]).unwrap();
        assert_eq!(x, 100..200);
        assert!(y.start < 0.0 && y.end > 1.0);
    }

    #[test]
    fn test_bounds_widen_single_point() {
        let (x, y) = bounds(&[(1000, 0.5)]).unwrap();
        assert_eq!(x, 940..1060);
        assert_eq!(y, 0.0..1.0);
    }

    #[test]
    fn test_empty_log_is_an_error() {
        assert!(matches!(bounds(&[]), Err(GraphError::Empty)));
        assert!(matches!(summarize(&[]), Err(GraphError::Empty)));
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            render(&[], &dir.path().join("out.png"), &GraphOptions::default()),
            Err(GraphError::Empty)
        ));
    }

    #[test]
    fn test_render_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("drowsiness_graph.png");
        let options = GraphOptions {
            width: 640,
            height: 360,
            ..Default::default()
        };

        render(
            &[
                record("2024-05-01 13:45:09", 0.2, false),
                record("2024-05-01 13:46:30", 0.9, true),
            ],
            &output,
            &options,
        )
        .unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn test_summary() {
        let summary = summarize(&[
            record("2024-05-01 13:45:09", 0.2, false),
            record("2024-05-01 13:45:10", 0.9, true),
            record("2024-05-01 13:45:11", 0.6, true),
        ])
        .unwrap();
        assert_eq!(
            summary,
            Summary {
                records: 3,
                drowsy: 2,
                min_score: 0.2,
                max_score: 0.9,
            }
        );
    }
}
