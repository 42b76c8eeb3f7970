use std::fmt::Write as _;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{Bounds, Figure, LineStyle, Series};

/// Pixels per inch used when sizing the SVG canvas.
pub const DPI: f64 = 100.0;

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const DATA_PADDING: f64 = 0.05;
const TARGET_TICKS: f64 = 6.0;
const POINT_RADIUS: f64 = 4.0;
const TICK_LEN: f64 = 5.0;
const FONT: &str = "DejaVu Sans, Helvetica, Arial, sans-serif";

struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    bounds: Bounds,
}

impl Frame {
    fn px(&self, x: f64) -> f64 {
        self.left + (x - self.bounds.x_min) / (self.bounds.x_max - self.bounds.x_min) * self.width
    }

    fn py(&self, y: f64) -> f64 {
        self.top + self.height
            - (y - self.bounds.y_min) / (self.bounds.y_max - self.bounds.y_min) * self.height
    }
}

pub fn render_svg(figure: &Figure) -> String {
    let width = f64::from(figure.width_px());
    let height = f64::from(figure.height_px());
    let frame = Frame {
        left: MARGIN_LEFT,
        top: MARGIN_TOP,
        width: (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0),
        height: (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0),
        bounds: padded_bounds(figure.data_bounds()),
    };

    let mut out = String::new();
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="{FONT}">"#,
        w = width,
        h = height,
    );
    let _ = write!(
        out,
        r##"<rect x="0" y="0" width="{width}" height="{height}" fill="#ffffff"/>"##
    );

    write_axes(&mut out, &frame);

    let _ = write!(
        out,
        r#"<clipPath id="plot-area"><rect x="{}" y="{}" width="{}" height="{}"/></clipPath><g clip-path="url(#plot-area)">"#,
        frame.left, frame.top, frame.width, frame.height
    );
    for series in &figure.series {
        write_series(&mut out, &frame, series);
    }
    out.push_str("</g>");

    let _ = write!(
        out,
        r##"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="#000000" stroke-width="1"/>"##,
        frame.left, frame.top, frame.width, frame.height
    );

    let center_x = frame.left + frame.width / 2.0;
    if !figure.title.is_empty() {
        let _ = write!(
            out,
            r#"<text class="title" x="{center_x}" y="{}" font-size="16" text-anchor="middle">{}</text>"#,
            frame.top - 16.0,
            svg_text(&figure.title)
        );
    }
    if !figure.x_label.is_empty() {
        let _ = write!(
            out,
            r#"<text class="x-label" x="{center_x}" y="{}" font-size="13" text-anchor="middle">{}</text>"#,
            height - 15.0,
            svg_text(&figure.x_label)
        );
    }
    if !figure.y_label.is_empty() {
        let center_y = frame.top + frame.height / 2.0;
        let _ = write!(
            out,
            r#"<text class="y-label" x="20" y="{center_y}" font-size="13" text-anchor="middle" transform="rotate(-90 20 {center_y})">{}</text>"#,
            svg_text(&figure.y_label)
        );
    }

    out.push_str("</svg>");
    out
}

/// Base64 `data:` URI suitable for an `<img src>`.
pub fn svg_data_uri(svg: &str) -> String {
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg.as_bytes()))
}

fn write_axes(out: &mut String, frame: &Frame) {
    let bottom = frame.top + frame.height;
    for tick in nice_ticks(frame.bounds.x_min, frame.bounds.x_max) {
        let x = frame.px(tick.value);
        let _ = write!(
            out,
            r##"<line x1="{x}" y1="{bottom}" x2="{x}" y2="{}" stroke="#000000"/><text x="{x}" y="{}" font-size="11" text-anchor="middle">{}</text>"##,
            bottom + TICK_LEN,
            bottom + TICK_LEN + 13.0,
            tick.label
        );
    }
    for tick in nice_ticks(frame.bounds.y_min, frame.bounds.y_max) {
        let y = frame.py(tick.value);
        let _ = write!(
            out,
            r##"<line x1="{}" y1="{y}" x2="{}" y2="{y}" stroke="#000000"/><text x="{}" y="{}" font-size="11" text-anchor="end">{}</text>"##,
            frame.left - TICK_LEN,
            frame.left,
            frame.left - TICK_LEN - 3.0,
            y + 4.0,
            tick.label
        );
    }
}

fn write_series(out: &mut String, frame: &Frame, series: &Series) {
    match series {
        Series::Scatter {
            points,
            color,
            alpha,
        } => {
            let _ = write!(
                out,
                r#"<g class="scatter" fill="{}" fill-opacity="{}" stroke="none">"#,
                color.hex(),
                alpha.clamp(0.0, 1.0)
            );
            for &(x, y) in points.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
                let _ = write!(
                    out,
                    r#"<circle cx="{:.2}" cy="{:.2}" r="{POINT_RADIUS}"/>"#,
                    frame.px(x),
                    frame.py(y)
                );
            }
            out.push_str("</g>");
        }
        Series::Line {
            points,
            color,
            style,
        } => {
            let coords = points
                .iter()
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|&(x, y)| format!("{:.2},{:.2}", frame.px(x), frame.py(y)))
                .collect::<Vec<_>>()
                .join(" ");
            let dash = match style {
                LineStyle::Solid => "",
                LineStyle::Dashed => r#" stroke-dasharray="6 4""#,
            };
            let _ = write!(
                out,
                r#"<polyline class="line" points="{coords}" fill="none" stroke="{}" stroke-width="1.5"{dash}/>"#,
                color.hex()
            );
        }
    }
}

fn padded_bounds(bounds: Option<Bounds>) -> Bounds {
    let Some(b) = bounds else {
        return Bounds {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
        };
    };
    let (x_min, x_max) = pad(b.x_min, b.x_max);
    let (y_min, y_max) = pad(b.y_min, b.y_max);
    Bounds {
        x_min,
        x_max,
        y_min,
        y_max,
    }
}

fn pad(lo: f64, hi: f64) -> (f64, f64) {
    let span = hi - lo;
    if span <= 0.0 {
        return (lo - 0.5, hi + 0.5);
    }
    (lo - span * DATA_PADDING, hi + span * DATA_PADDING)
}

struct Tick {
    value: f64,
    label: String,
}

fn nice_ticks(lo: f64, hi: f64) -> Vec<Tick> {
    let step = nice_step((hi - lo) / TARGET_TICKS);
    let decimals = (-step.log10().floor()).max(0.0) as usize;
    let first = (lo / step).ceil() as i64;
    let last = (hi / step).floor() as i64;
    (first..=last)
        .map(|i| {
            let value = i as f64 * step;
            // adding 0.0 turns -0.0 into 0.0
            let label = format!("{:.*}", decimals, value + 0.0);
            Tick { value, label }
        })
        .collect()
}

fn nice_step(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let nice = if normalized < 1.5 {
        1.0
    } else if normalized < 3.0 {
        2.0
    } else if normalized < 7.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Text content for an SVG element. Control characters are not allowed in
/// XML 1.0, so they become spaces before escaping.
fn svg_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_control() && !matches!(c, '\t' | '\n' | '\r') {
                ' '
            } else {
                c
            }
        })
        .collect();
    html_escape::encode_text(&cleaned).into_owned()
}

#[cfg(test)]
#[path = "tests/svg_tests.rs"]
mod tests;
