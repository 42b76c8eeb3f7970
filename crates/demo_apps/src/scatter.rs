//! Scatter demo: a seeded point cloud with an optional trend line.

use plot::{linear_fit, Color, Figure, LineStyle, Series};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use reactive::{
    App, InputSpec, Inputs, Layout, Node, OutputSpec, ReactionError, ReactionTable, Trigger, View,
};
use shared::domain::InputValue;

use crate::Rendered;

pub const APP_NAME: &str = "scatter";

pub const SEED: u64 = 42;
pub const NOISE_SCALE: f64 = 0.2;
pub const POINT_ALPHA: f64 = 0.7;
pub const FIGURE_WIDTH_IN: f64 = 8.0;
pub const FIGURE_HEIGHT_IN: f64 = 6.0;

pub const MIN_POINTS: i64 = 10;
pub const MAX_POINTS: i64 = 100;
pub const DEFAULT_POINTS: i64 = 50;
pub const COLOR_CHOICES: [&str; 5] = ["blue", "red", "green", "purple", "orange"];
pub const DEFAULT_COLOR: &str = "blue";
pub const DEFAULT_SHOW_LINE: bool = true;
pub const DEFAULT_TITLE: &str = "Test Scatter Plot";

pub const INPUT_N: &str = "n";
pub const INPUT_COLOR: &str = "plot_color";
pub const INPUT_SHOW_LINE: &str = "show_line";
pub const INPUT_TITLE: &str = "title";
pub const ACTION_UPDATE: &str = "update";
pub const ACTION_RESET: &str = "reset";
pub const OUTPUT_PLOT: &str = "scatter_plot";
pub const OUTPUT_SUMMARY: &str = "input_summary";

#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn points(&self) -> Vec<(f64, f64)> {
        self.x.iter().copied().zip(self.y.iter().copied()).collect()
    }
}

/// Draws `n` uniform x values, then `n` normal noise terms for y.
///
/// The generator is reseeded on every call, so a given `n` always yields
/// the same cloud.
pub fn sample_cloud(n: usize) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(SEED);
    let x: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
    let y = x
        .iter()
        .map(|xi| {
            let noise: f64 = rng.sample(StandardNormal);
            xi + NOISE_SCALE * noise
        })
        .collect();
    PointCloud { x, y }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotSettings {
    pub n: usize,
    pub color: Color,
    pub show_line: bool,
    pub title: String,
}

pub fn build_figure(settings: &PlotSettings) -> Result<Figure, ReactionError> {
    let cloud = sample_cloud(settings.n);

    let mut figure = Figure::new(FIGURE_WIDTH_IN, FIGURE_HEIGHT_IN);
    figure.push(Series::Scatter {
        points: cloud.points(),
        color: settings.color,
        alpha: POINT_ALPHA,
    });

    if settings.show_line {
        let fit = linear_fit(&cloud.x, &cloud.y).map_err(ReactionError::failed)?;
        let x_min = cloud.x.iter().copied().fold(f64::INFINITY, f64::min);
        let x_max = cloud.x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        figure.push(Series::Line {
            points: vec![(x_min, fit.at(x_min)), (x_max, fit.at(x_max))],
            color: Color::Black,
            style: LineStyle::Dashed,
        });
    }

    figure.x_label = "X values".to_string();
    figure.y_label = "Y values".to_string();
    figure.title = settings.title.clone();
    Ok(figure)
}

pub fn summary_text(n: i64, color: &str, show_line: bool, title: &str) -> String {
    format!(
        "Current Settings:\n\
         • Number of points: {n}\n\
         • Selected color: {color}\n\
         • Show trend line: {}\n\
         • Plot title: {title}",
        if show_line { "Yes" } else { "No" }
    )
}

pub fn view() -> View {
    View {
        title: "Scatter Demo".to_string(),
        layout: Layout::Sidebar {
            sidebar: vec![
                Node::heading("Test Controls"),
                InputSpec::slider(
                    INPUT_N,
                    "Number of points",
                    MIN_POINTS,
                    MAX_POINTS,
                    DEFAULT_POINTS,
                )
                .into(),
                InputSpec::select(INPUT_COLOR, "Plot Color", COLOR_CHOICES, DEFAULT_COLOR).into(),
                InputSpec::checkbox(INPUT_SHOW_LINE, "Show Trend Line", DEFAULT_SHOW_LINE).into(),
                InputSpec::text(INPUT_TITLE, "Plot Title", DEFAULT_TITLE).into(),
                InputSpec::action_button(ACTION_UPDATE, "Update Plot").into(),
                Node::Rule,
                InputSpec::action_button(ACTION_RESET, "Reset All").into(),
            ],
            main: vec![
                Node::card("Test Scatter Plot", vec![OutputSpec::plot(OUTPUT_PLOT).into()]),
                Node::card("Input Echo", vec![OutputSpec::text(OUTPUT_SUMMARY).into()]),
            ],
        },
    }
}

pub fn reactions() -> ReactionTable<Rendered> {
    ReactionTable::new()
        .effect("reset_inputs", Trigger::on([ACTION_RESET]), |_, updates| {
            updates.set(INPUT_N, InputValue::Int(DEFAULT_POINTS));
            updates.set(INPUT_COLOR, InputValue::Text(DEFAULT_COLOR.to_string()));
            updates.set(INPUT_SHOW_LINE, InputValue::Bool(DEFAULT_SHOW_LINE));
            updates.set(INPUT_TITLE, InputValue::Text(DEFAULT_TITLE.to_string()));
            Ok(())
        })
        .output(
            OUTPUT_PLOT,
            Trigger::on([ACTION_UPDATE]).ignore_none(false),
            |inputs| build_figure(&plot_settings(inputs)?).map(Rendered::Plot),
        )
        .output(OUTPUT_SUMMARY, Trigger::Auto, |inputs| {
            Ok(Rendered::Text(summary_text(
                inputs.int(INPUT_N)?,
                inputs.text(INPUT_COLOR)?,
                inputs.flag(INPUT_SHOW_LINE)?,
                inputs.text(INPUT_TITLE)?,
            )))
        })
}

pub fn app() -> App<Rendered> {
    App::new(APP_NAME, view(), reactions)
}

fn plot_settings(inputs: &Inputs<'_>) -> Result<PlotSettings, ReactionError> {
    let n = inputs.int(INPUT_N)?;
    let n = usize::try_from(n).map_err(|_| ReactionError::failed(format!("invalid point count {n}")))?;
    let color = inputs
        .text(INPUT_COLOR)?
        .parse::<Color>()
        .map_err(ReactionError::failed)?;
    Ok(PlotSettings {
        n,
        color,
        show_line: inputs.flag(INPUT_SHOW_LINE)?,
        title: inputs.text(INPUT_TITLE)?.to_string(),
    })
}

#[cfg(test)]
#[path = "tests/scatter_tests.rs"]
mod tests;
