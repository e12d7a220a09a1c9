use crate::analysis::ScoredArticle;
use crate::output::{write_file, OutputError, OutputResult};
use chrono::{DateTime, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

/// One dated sentiment observation
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub at: DateTime<Utc>,
    pub score: f64,
    pub label: String,
}

/// Builds the time series behind the trend chart
///
/// Articles without a publish date are left out rather than placed at an
/// invented time. Points are ordered by time, ties keeping article order.
pub fn trend_points(scored: &[ScoredArticle]) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = scored
        .iter()
        .filter_map(|s| {
            s.article.published_at.map(|at| TrendPoint {
                at,
                score: s.score,
                label: s.article.title.clone(),
            })
        })
        .collect();
    points.sort_by_key(|p| p.at);
    points
}

/// Draws a sentiment trend to a file
pub trait ChartRenderer {
    fn render(&self, points: &[TrendPoint], path: &Path) -> OutputResult<()>;
}

/// SVG scatter plot drawn with plotters: time on x, score in [-1, 1] on y
#[derive(Debug, Clone)]
pub struct SvgScatterRenderer {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

/// Padding either side of the time axis, in seconds
const MIN_TIME_PADDING: i64 = 3600;

impl Default for SvgScatterRenderer {
    fn default() -> Self {
        Self {
            width: 600,
            height: 400,
            title: "Media Sentiment Analysis".to_string(),
        }
    }
}

impl SvgScatterRenderer {
    /// Renders the chart as an SVG document
    pub fn to_svg(&self, points: &[TrendPoint]) -> OutputResult<String> {
        let mut svg = String::new();
        {
            let root =
                SVGBackend::with_string(&mut svg, (self.width, self.height)).into_drawing_area();
            self.draw(&root, points)
                .and_then(|()| root.present())
                .map_err(|e| OutputError::Chart(e.to_string()))?;
        }
        Ok(svg)
    }

    fn draw(
        &self,
        root: &DrawingArea<SVGBackend<'_>, Shift>,
        points: &[TrendPoint],
    ) -> Result<(), DrawingAreaErrorKind<std::io::Error>> {
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(root)
            .caption(&self.title, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(time_range(points), -1.0f64..1.0f64)?;

        chart
            .configure_mesh()
            .x_desc("Time")
            .y_desc("Sentiment Score")
            .x_labels(5)
            .x_label_formatter(&|ts: &i64| format_day(*ts))
            .draw()?;

        chart.draw_series(points.iter().map(|p| {
            Circle::new(
                (p.at.timestamp(), p.score.clamp(-1.0, 1.0)),
                4,
                BLUE.filled(),
            )
        }))?;

        Ok(())
    }
}

impl ChartRenderer for SvgScatterRenderer {
    fn render(&self, points: &[TrendPoint], path: &Path) -> OutputResult<()> {
        write_file(path, self.to_svg(points)?.as_bytes())?;
        Ok(())
    }
}

/// Unix-second span covering every point, never empty
fn time_range(points: &[TrendPoint]) -> Range<i64> {
    let (first, last) = match (points.first(), points.last()) {
        (Some(f), Some(l)) => (f.at.timestamp(), l.at.timestamp()),
        _ => (0, 0),
    };
    let padding = ((last - first) / 20).max(MIN_TIME_PADDING);
    (first - padding)..(last + padding)
}

fn format_day(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|at| at.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
