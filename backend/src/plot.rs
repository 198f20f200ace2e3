//! Magnitude-vs-time plots of aggregated query results.
//!
//! One series is drawn per `"<source> <filter>"` label, with vertical error
//! bars of `mag_err`. Brighter magnitudes sit higher on the chart.

use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::LightCurveRecord;
use crate::services::QueryResults;

/// Default magnitude range shown when results are empty.
const DEFAULT_MAG_RANGE: (f64, f64) = (10.0, 25.0);

/// Plot configuration
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            title: "Light curve".to_string(),
        }
    }
}

/// Series colour for a `"<source> <filter>"` label, if it has a fixed one.
pub fn series_color(label: &str) -> Option<RGBColor> {
    let color = match label {
        "atlas o" => RGBColor(255, 165, 0),
        "atlas c" => RGBColor(0, 255, 255),
        "asas-sn g" => RGBColor(65, 105, 225),
        "asas-sn V" => RGBColor(0, 128, 0),
        "ztf g" => RGBColor(138, 43, 226),
        "ztf r" => RGBColor(128, 128, 0),
        "ztf i" => RGBColor(160, 82, 45),
        _ => return None,
    };
    Some(color)
}

/// Group records by `"<source> <filter>"` label.
pub fn group_series(results: &QueryResults) -> BTreeMap<String, Vec<&LightCurveRecord>> {
    let mut series: BTreeMap<String, Vec<&LightCurveRecord>> = BTreeMap::new();
    for (source, table) in results {
        for filter in table.filters() {
            series.insert(
                format!("{} {}", source, filter),
                table.by_filter(filter).collect(),
            );
        }
    }
    series
}

/// MJD and magnitude bounds of all finite points, padded for display.
pub fn plot_bounds(results: &QueryResults) -> ((f64, f64), (f64, f64)) {
    let mut mjd = (f64::INFINITY, f64::NEG_INFINITY);
    let mut mag = (f64::INFINITY, f64::NEG_INFINITY);

    for record in results.values().flat_map(|t| t.iter()) {
        if !record.mjd.is_finite() || !record.mag.is_finite() {
            continue;
        }
        let err = if record.mag_err.is_finite() { record.mag_err } else { 0.0 };
        mjd = (mjd.0.min(record.mjd), mjd.1.max(record.mjd));
        mag = (mag.0.min(record.mag - err), mag.1.max(record.mag + err));
    }

    if mjd.0 > mjd.1 {
        return ((0.0, 1.0), DEFAULT_MAG_RANGE);
    }

    let mjd_pad = ((mjd.1 - mjd.0) * 0.05).max(0.5);
    let mag_pad = ((mag.1 - mag.0) * 0.05).max(0.1);
    (
        (mjd.0 - mjd_pad, mjd.1 + mjd_pad),
        (mag.0 - mag_pad, mag.1 + mag_pad),
    )
}

/// Render `results` as a PNG at `output_path`.
pub fn plot_results(
    results: &QueryResults,
    output_path: &Path,
    config: &PlotConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(output_path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let ((x_min, x_max), (mag_min, mag_max)) = plot_bounds(results);

    // Magnitudes are drawn negated so the axis runs bright-up.
    let mut chart = ChartBuilder::on(&root)
        .caption(&config.title, ("sans-serif", 25))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, -mag_max..-mag_min)?;

    chart
        .configure_mesh()
        .x_desc("MJD")
        .y_desc("Magnitude")
        .x_label_formatter(&|x| format!("{x:.0}"))
        .y_label_formatter(&|y| format!("{:.1}", -y))
        .draw()?;

    for (idx, (label, records)) in group_series(results).into_iter().enumerate() {
        let color = series_color(&label).unwrap_or_else(|| {
            let (r, g, b) = Palette99::pick(idx).rgb();
            RGBColor(r, g, b)
        });
        let points: Vec<&LightCurveRecord> = records
            .into_iter()
            .filter(|r| r.mjd.is_finite() && r.mag.is_finite())
            .collect();

        chart.draw_series(points.iter().map(|r| {
            let err = if r.mag_err.is_finite() { r.mag_err } else { 0.0 };
            ErrorBar::new_vertical(r.mjd, -(r.mag + err), -r.mag, -(r.mag - err), color, 4)
        }))?;

        chart
            .draw_series(
                points
                    .iter()
                    .map(|r| Circle::new((r.mjd, -r.mag), 3, color.filled())),
            )?
            .label(label)
            .legend(move |(x, y)| Circle::new((x + 5, y), 3, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
