//! Chart definitions and SVG rendering.
//!
//! A [`ChartSpec`] names the measures a chart plots and how each series is
//! drawn. [`ChartRenderer`] turns the projected data points into image
//! bytes; [`SvgChartRenderer`] is the built-in implementation.

use chrono::DateTime;
use rainbbit_core::{DataPoint, RenderError};
use std::fmt::Write;

// ============================================================================
// THEMES
// ============================================================================

/// Themes accepted by the chart endpoints.
pub const THEMES: &[&str] = &["dark", "light"];

/// Colours for one theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub name: &'static str,
    pub foreground: &'static str,
    pub grid: &'static str,
    pub primary: &'static str,
    pub blue: &'static str,
    pub red: &'static str,
    pub orange: &'static str,
}

pub static DARK: Palette = Palette {
    name: "dark",
    foreground: "#e0def4",
    grid: "#393552",
    primary: "#c4a7e7",
    blue: "#9ccfd8",
    red: "#eb6f92",
    orange: "#f6c177",
};

pub static LIGHT: Palette = Palette {
    name: "light",
    foreground: "#575279",
    grid: "#dfdad9",
    primary: "#907aa9",
    blue: "#56949f",
    red: "#b4637a",
    orange: "#ea9d34",
};

impl Palette {
    /// Palette for a theme name; anything unrecognised gets the dark theme.
    pub fn for_theme(theme: Option<&str>) -> &'static Palette {
        match theme.map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("light") => &LIGHT,
            _ => &DARK,
        }
    }

    pub fn color(&self, color: SeriesColor) -> &'static str {
        match color {
            SeriesColor::Primary => self.primary,
            SeriesColor::Blue => self.blue,
            SeriesColor::Red => self.red,
            SeriesColor::Orange => self.orange,
        }
    }
}

// ============================================================================
// CHART SPECS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesColor {
    Primary,
    Blue,
    Red,
    Orange,
}

/// How one projected column is drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    pub label: String,
    pub color: SeriesColor,
    pub dashed: bool,
}

impl Series {
    fn solid(label: &str, color: SeriesColor) -> Self {
        Self {
            label: label.to_string(),
            color,
            dashed: false,
        }
    }
}

/// A chart: which measures it projects, in order, and one series per measure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSpec {
    pub name: String,
    pub measures: Vec<String>,
    pub series: Vec<Series>,
}

impl ChartSpec {
    /// One measure drawn as a single line.
    pub fn single(measure: &str) -> Self {
        Self {
            name: format!("plot:{measure}"),
            measures: vec![measure.to_string()],
            series: vec![Series::solid(&label_for(measure), SeriesColor::Primary)],
        }
    }

    /// Temperature with its min, max and perceived values.
    pub fn temperature() -> Self {
        Self {
            name: "temp".to_string(),
            measures: ["temp", "temp_min", "temp_max", "feels_like"]
                .map(String::from)
                .to_vec(),
            series: vec![
                Series::solid("Temp", SeriesColor::Primary),
                Series::solid("Min", SeriesColor::Blue),
                Series::solid("Max", SeriesColor::Red),
                Series {
                    dashed: true,
                    ..Series::solid("Feels like", SeriesColor::Orange)
                },
            ],
        }
    }

    /// Station pressure with its sea and ground level readings.
    pub fn pressure() -> Self {
        Self {
            name: "pressure".to_string(),
            measures: ["pressure", "sea_level", "grnd_level"]
                .map(String::from)
                .to_vec(),
            series: vec![
                Series::solid("Pressure", SeriesColor::Primary),
                Series::solid("Sea level", SeriesColor::Blue),
                Series::solid("Ground level", SeriesColor::Orange),
            ],
        }
    }

    /// Cache scope for this chart in a given theme.
    pub fn cache_scope(&self, palette: &Palette) -> String {
        format!("{}:{}", self.name, palette.name)
    }
}

/// `wind_speed` -> `Wind speed`.
fn label_for(measure: &str) -> String {
    let spaced = measure.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// RENDERER
// ============================================================================

/// Turns data points into an image.
pub trait ChartRenderer: Send + Sync {
    /// MIME type of the bytes returned by [`ChartRenderer::render`].
    fn content_type(&self) -> &'static str;

    fn render(
        &self,
        chart: &ChartSpec,
        points: &[DataPoint],
        palette: &Palette,
    ) -> Result<Vec<u8>, RenderError>;
}

/// Plain SVG line charts.
#[derive(Debug, Clone, Copy)]
pub struct SvgChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self {
            width: 700,
            height: 400,
        }
    }
}

const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 80.0;
const Y_TICKS: usize = 5;
const X_TICKS: usize = 6;
const FONT: &str = "font-family=\"Helvetica, Arial, sans-serif\" font-size=\"12\"";

/// Plot area and data ranges.
struct Frame {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn x(&self, dt: i64) -> f64 {
        self.left + (dt as f64 - self.x_min) / (self.x_max - self.x_min) * (self.right - self.left)
    }

    fn y(&self, value: f64) -> f64 {
        self.bottom - (value - self.y_min) / (self.y_max - self.y_min) * (self.bottom - self.top)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn tick_label(dt: i64) -> String {
    DateTime::from_timestamp(dt, 0)
        .map(|t| t.format("%H:%M %d/%m").to_string())
        .unwrap_or_default()
}

impl SvgChartRenderer {
    fn frame(&self, chart: &ChartSpec, points: &[DataPoint]) -> Option<Frame> {
        let first = points.first()?;
        let last = points.last()?;
        let values = points
            .iter()
            .flat_map(|p| (0..chart.series.len()).map(move |i| p.value(i)))
            .filter(|v| v.is_finite());
        let (mut y_min, mut y_max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if !y_min.is_finite() {
            return None;
        }
        if y_max - y_min < f64::EPSILON {
            y_min -= 1.0;
            y_max += 1.0;
        }
        let pad = (y_max - y_min) * 0.05;

        let (mut x_min, mut x_max) = (first.dt as f64, last.dt as f64);
        if x_max - x_min < 1.0 {
            x_min -= 1.0;
            x_max += 1.0;
        }

        Some(Frame {
            left: MARGIN_LEFT,
            right: f64::from(self.width) - MARGIN_RIGHT,
            top: MARGIN_TOP,
            bottom: f64::from(self.height) - MARGIN_BOTTOM,
            x_min,
            x_max,
            y_min: y_min - pad,
            y_max: y_max + pad,
        })
    }

    fn draw(
        &self,
        chart: &ChartSpec,
        points: &[DataPoint],
        palette: &Palette,
    ) -> Result<String, std::fmt::Error> {
        let mut svg = String::new();
        write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        )?;

        let Some(frame) = self.frame(chart, points) else {
            write!(
                svg,
                r#"<text x="{}" y="{}" text-anchor="middle" fill="{}" {FONT}>No data</text></svg>"#,
                self.width / 2,
                self.height / 2,
                palette.foreground
            )?;
            return Ok(svg);
        };

        // Horizontal grid with value labels
        for i in 0..=Y_TICKS {
            let value = frame.y_min + (frame.y_max - frame.y_min) * i as f64 / Y_TICKS as f64;
            let y = frame.y(value);
            write!(
                svg,
                r#"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{}" stroke-width="1"/>"#,
                frame.left, frame.right, palette.grid
            )?;
            write!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end" fill="{}" {FONT}>{value:.1}</text>"#,
                frame.left - 6.0,
                y + 4.0,
                palette.foreground
            )?;
        }

        // Time axis
        let span = frame.x_max - frame.x_min;
        for i in 0..=X_TICKS {
            let dt = (frame.x_min + span * i as f64 / X_TICKS as f64).round() as i64;
            let x = frame.x(dt);
            write!(
                svg,
                r#"<line x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{:.1}" stroke="{}" stroke-width="1"/>"#,
                frame.bottom,
                frame.bottom + 5.0,
                palette.foreground
            )?;
            write!(
                svg,
                r#"<text x="{x:.1}" y="{:.1}" text-anchor="end" transform="rotate(-45 {x:.1} {:.1})" fill="{}" {FONT}>{}</text>"#,
                frame.bottom + 18.0,
                frame.bottom + 18.0,
                palette.foreground,
                tick_label(dt)
            )?;
        }
        write!(
            svg,
            r#"<line x1="{:.1}" y1="{b:.1}" x2="{:.1}" y2="{b:.1}" stroke="{}" stroke-width="1"/>"#,
            frame.left,
            frame.right,
            palette.foreground,
            b = frame.bottom
        )?;

        // Series, split wherever a value is missing
        for (i, series) in chart.series.iter().enumerate() {
            let color = palette.color(series.color);
            let dash = if series.dashed {
                r#" stroke-dasharray="6,4""#
            } else {
                ""
            };
            let mut segment: Vec<String> = Vec::new();
            let mut segments: Vec<Vec<String>> = Vec::new();
            for point in points {
                let value = point.value(i);
                if value.is_finite() {
                    segment.push(format!("{:.1},{:.1}", frame.x(point.dt), frame.y(value)));
                } else if !segment.is_empty() {
                    segments.push(std::mem::take(&mut segment));
                }
            }
            if !segment.is_empty() {
                segments.push(segment);
            }
            for segment in segments {
                write!(
                    svg,
                    r#"<polyline fill="none" stroke="{color}" stroke-width="2"{dash} points="{}"/>"#,
                    segment.join(" ")
                )?;
            }
        }

        // Legend
        let mut x = frame.left;
        for series in &chart.series {
            let color = palette.color(series.color);
            let dash = if series.dashed {
                r#" stroke-dasharray="6,4""#
            } else {
                ""
            };
            write!(
                svg,
                r#"<line x1="{x:.1}" y1="16" x2="{:.1}" y2="16" stroke="{color}" stroke-width="2"{dash}/>"#,
                x + 20.0
            )?;
            write!(
                svg,
                r#"<text x="{:.1}" y="20" fill="{}" {FONT}>{}</text>"#,
                x + 26.0,
                palette.foreground,
                escape(&series.label)
            )?;
            x += 40.0 + 7.0 * series.label.len() as f64;
        }

        svg.push_str("</svg>");
        Ok(svg)
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }

    fn render(
        &self,
        chart: &ChartSpec,
        points: &[DataPoint],
        palette: &Palette,
    ) -> Result<Vec<u8>, RenderError> {
        let svg = self
            .draw(chart, points, palette)
            .map_err(|e| RenderError::Failed {
                chart: chart.name.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!(chart = %chart.name, theme = palette.name, points = points.len(), bytes = svg.len(), "Rendered chart");
        Ok(svg.into_bytes())
    }
}
