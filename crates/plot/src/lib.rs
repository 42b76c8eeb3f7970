//! In-memory figures for the demo apps.
//!
//! A [`Figure`] is a plain description of what to draw. [`render_svg`] turns
//! it into an SVG document and [`svg_data_uri`] wraps that document so a
//! browser can show it as an image.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod fit;
mod svg;

pub use fit::{linear_fit, FitError, LinearFit};
pub use svg::{render_svg, svg_data_uri, DPI};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Blue,
    Red,
    Green,
    Purple,
    Orange,
    Black,
}

impl Color {
    pub fn name(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Red => "red",
            Self::Green => "green",
            Self::Purple => "purple",
            Self::Orange => "orange",
            Self::Black => "black",
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            Self::Blue => "#0000ff",
            Self::Red => "#ff0000",
            Self::Green => "#008000",
            Self::Purple => "#800080",
            Self::Orange => "#ffa500",
            Self::Black => "#000000",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown color '{0}'")]
pub struct UnknownColor(pub String);

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(Self::Blue),
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            "purple" => Ok(Self::Purple),
            "orange" => Ok(Self::Orange),
            "black" => Ok(Self::Black),
            _ => Err(UnknownColor(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Series {
    Scatter {
        points: Vec<(f64, f64)>,
        color: Color,
        alpha: f64,
    },
    Line {
        points: Vec<(f64, f64)>,
        color: Color,
        style: LineStyle,
    },
}

impl Series {
    pub fn points(&self) -> &[(f64, f64)] {
        match self {
            Self::Scatter { points, .. } | Self::Line { points, .. } => points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// Width in inches.
    pub width_in: f64,
    /// Height in inches.
    pub height_in: f64,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(width_in: f64, height_in: f64) -> Self {
        Self {
            width_in,
            height_in,
            title: String::new(),
            x_label: String::new(),
            y_label: String::new(),
            series: Vec::new(),
        }
    }

    pub fn width_px(&self) -> u32 {
        (self.width_in * DPI).round() as u32
    }

    pub fn height_px(&self) -> u32 {
        (self.height_in * DPI).round() as u32
    }

    pub fn push(&mut self, series: Series) {
        self.series.push(series);
    }

    pub fn scatter_series(&self) -> impl Iterator<Item = &Series> {
        self.series
            .iter()
            .filter(|s| matches!(s, Series::Scatter { .. }))
    }

    pub fn line_series(&self) -> impl Iterator<Item = &Series> {
        self.series
            .iter()
            .filter(|s| matches!(s, Series::Line { .. }))
    }

    /// Bounding box of every point in the figure, `None` when it is empty.
    pub fn data_bounds(&self) -> Option<Bounds> {
        let mut points = self
            .series
            .iter()
            .flat_map(|s| s.points().iter().copied())
            .filter(|(x, y)| x.is_finite() && y.is_finite());
        let (x0, y0) = points.next()?;
        let mut bounds = Bounds {
            x_min: x0,
            x_max: x0,
            y_min: y0,
            y_max: y0,
        };
        for (x, y) in points {
            bounds.x_min = bounds.x_min.min(x);
            bounds.x_max = bounds.x_max.max(x);
            bounds.y_min = bounds.y_min.min(y);
            bounds.y_max = bounds.y_max.max(y);
        }
        Some(bounds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
