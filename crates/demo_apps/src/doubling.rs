//! Doubling demo: one slider echoed back doubled.

use reactive::{App, InputSpec, Layout, Node, OutputSpec, ReactionTable, Trigger, View};

use crate::{host::HostInfo, Rendered};

pub const APP_NAME: &str = "doubling";

pub const INPUT_N: &str = "n";
pub const OUTPUT_TXT: &str = "txt";
pub const MIN_N: i64 = 0;
pub const MAX_N: i64 = 100;
pub const DEFAULT_N: i64 = 20;

pub fn doubled_text(n: i64) -> String {
    format!("n*2 is going to be {}", n * 2)
}

pub fn banner(host: &HostInfo) -> String {
    format!("Running as user: {}", host.username)
}

/// The banner is baked into the view; it never re-renders.
pub fn view(host: &HostInfo) -> View {
    View {
        title: "Doubling Demo".to_string(),
        layout: Layout::Stack {
            children: vec![
                InputSpec::slider(INPUT_N, "N", MIN_N, MAX_N, DEFAULT_N).into(),
                OutputSpec::verbatim(OUTPUT_TXT).into(),
                Node::static_text(banner(host)),
            ],
        },
    }
}

pub fn reactions() -> ReactionTable<Rendered> {
    ReactionTable::new().output(OUTPUT_TXT, Trigger::Auto, |inputs| {
        Ok(Rendered::Text(doubled_text(inputs.int(INPUT_N)?)))
    })
}

pub fn app(host: &HostInfo) -> App<Rendered> {
    App::new(APP_NAME, view(host), reactions)
}

#[cfg(test)]
#[path = "tests/doubling_tests.rs"]
mod tests;
