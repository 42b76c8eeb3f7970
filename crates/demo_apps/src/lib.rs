//! The two demo apps and the value type their reactions render.

use plot::{render_svg, svg_data_uri, Figure};
use reactive::App;
use shared::protocol::OutputPayload;

pub mod doubling;
mod host;
pub mod scatter;

pub use host::HostInfo;

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Plot(Figure),
    Text(String),
}

impl Rendered {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Plot(_) => None,
        }
    }

    pub fn as_figure(&self) -> Option<&Figure> {
        match self {
            Self::Plot(figure) => Some(figure),
            Self::Text(_) => None,
        }
    }

    /// Wire form: plots become an embedded SVG image.
    pub fn to_payload(&self) -> OutputPayload {
        match self {
            Self::Text(text) => OutputPayload::Text { text: text.clone() },
            Self::Plot(figure) => OutputPayload::Plot {
                src: svg_data_uri(&render_svg(figure)),
                width: figure.width_px(),
                height: figure.height_px(),
                alt: figure.title.clone(),
            },
        }
    }
}

/// Every app this workspace serves, in display order.
pub fn registry(host: &HostInfo) -> Vec<App<Rendered>> {
    vec![scatter::app(), doubling::app(host)]
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
