use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use demo_apps::{doubling, registry, scatter, HostInfo, Rendered};
use plot::render_svg;
use reactive::Session;
use shared::domain::{InputId, InputValue, OutputId};
use tracing_subscriber::EnvFilter;

/// Drives the demo apps without a browser.
#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sets the scatter inputs, presses Update and prints the echo text.
    Scatter {
        #[arg(long, default_value_t = scatter::DEFAULT_POINTS)]
        n: i64,
        #[arg(long, default_value = scatter::DEFAULT_COLOR)]
        color: String,
        #[arg(long)]
        hide_line: bool,
        #[arg(long, default_value = scatter::DEFAULT_TITLE)]
        title: String,
        /// Writes the rendered plot here.
        #[arg(long)]
        svg_out: Option<PathBuf>,
    },
    Doubling {
        #[arg(long, default_value_t = doubling::DEFAULT_N)]
        n: i64,
    },
    /// Prints an app's view tree as JSON.
    View { app: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let host = HostInfo::detect();

    match cli.command {
        Command::Scatter {
            n,
            color,
            hide_line,
            title,
            svg_out,
        } => {
            let (mut session, _) = scatter::app().start_session()?;
            set(&mut session, scatter::INPUT_N, InputValue::Int(n))?;
            set(&mut session, scatter::INPUT_COLOR, InputValue::Text(color))?;
            set(
                &mut session,
                scatter::INPUT_SHOW_LINE,
                InputValue::Bool(!hide_line),
            )?;
            set(&mut session, scatter::INPUT_TITLE, InputValue::Text(title))?;
            session.trigger(&InputId::from(scatter::ACTION_UPDATE))?;

            let summary = output(&session, scatter::OUTPUT_SUMMARY)?;
            println!("{}", summary.as_text().unwrap_or_default());

            if let Some(path) = svg_out {
                let figure = output(&session, scatter::OUTPUT_PLOT)?
                    .as_figure()
                    .ok_or_else(|| anyhow!("scatter_plot did not render a figure"))?;
                fs::write(&path, render_svg(figure))
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("wrote {}", path.display());
            }
        }
        Command::Doubling { n } => {
            let (mut session, _) = doubling::app(&host).start_session()?;
            set(&mut session, doubling::INPUT_N, InputValue::Int(n))?;
            let text = output(&session, doubling::OUTPUT_TXT)?;
            println!("{}", text.as_text().unwrap_or_default());
            println!("{}", doubling::banner(&host));
        }
        Command::View { app } => {
            let app = registry(&host)
                .into_iter()
                .find(|candidate| candidate.name() == app)
                .ok_or_else(|| anyhow!("unknown app '{app}'"))?;
            println!("{}", serde_json::to_string_pretty(app.view())?);
        }
    }

    Ok(())
}

fn set(session: &mut Session<Rendered>, id: &str, value: InputValue) -> Result<()> {
    session
        .set_value(&InputId::from(id), value)
        .with_context(|| format!("setting {id}"))?;
    Ok(())
}

fn output<'a>(session: &'a Session<Rendered>, id: &str) -> Result<&'a Rendered> {
    match session.output(&OutputId::from(id)) {
        Some(Ok(rendered)) => Ok(rendered),
        Some(Err(message)) => Err(anyhow!("{id} failed: {message}")),
        None => Err(anyhow!("{id} has not rendered")),
    }
}
