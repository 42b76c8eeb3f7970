//! Server-side HTML for the app pages.

use std::fmt::Write as _;

use reactive::{InputKind, InputSpec, Layout, Node, OutputKind, OutputSpec, View};
use shared::{
    domain::InputValue,
    protocol::{AppSummary, OutputPayload, OutputState, SessionSnapshot},
};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; color: #212529; }
.sidebar-layout { display: flex; min-height: 100vh; }
.sidebar-layout > aside { width: 280px; padding: 1rem; background: #f8f9fa; border-right: 1px solid #dee2e6; }
.sidebar-layout > main, .stack { flex: 1; padding: 1rem; }
.control { margin-bottom: 1rem; display: flex; flex-direction: column; gap: 0.25rem; }
.control.checkbox { flex-direction: row; align-items: center; }
.card { border: 1px solid #dee2e6; border-radius: 6px; margin-bottom: 1rem; }
.card > header { padding: 0.5rem 1rem; background: #f8f9fa; border-bottom: 1px solid #dee2e6; font-weight: 600; }
.card > .card-body { padding: 1rem; }
.output.text { white-space: pre-line; }
.output.failed { color: #b02a37; }
.output img { max-width: 100%; height: auto; }
"#;

const SCRIPT: &str = r#"
(function () {
  const sessionId = document.body.dataset.session;
  const scheme = location.protocol === "https:" ? "wss" : "ws";
  const socket = new WebSocket(`${scheme}://${location.host}/sessions/${sessionId}/ws`);
  const send = (type, payload) => socket.send(JSON.stringify({ type, payload }));

  document.querySelectorAll("[data-input]").forEach((el) => {
    const read = () => (el.type === "checkbox" ? el.checked : el.value);
    const event = el.type === "text" ? "change" : "input";
    el.addEventListener(event, () => {
      const echo = document.querySelector(`[data-echo="${el.dataset.input}"]`);
      if (echo) echo.textContent = el.value;
      send("set_input", { input_id: el.dataset.input, value: read() });
    });
  });
  document.querySelectorAll("[data-action]").forEach((el) => {
    el.addEventListener("click", () => send("trigger", { input_id: el.dataset.action }));
  });

  const renderOutput = (id, state) => {
    const el = document.getElementById(`output-${id}`);
    if (!el) return;
    el.classList.toggle("failed", state.status === "failed");
    if (state.status === "failed") {
      el.textContent = state.message;
    } else if (state.status === "ready" && state.payload.kind === "plot") {
      el.innerHTML = "";
      const img = document.createElement("img");
      img.src = state.payload.src;
      img.width = state.payload.width;
      img.height = state.payload.height;
      img.alt = state.payload.alt;
      el.appendChild(img);
    } else if (state.status === "ready") {
      el.textContent = state.payload.text;
    }
  };
  const renderInput = (id, value) => {
    const el = document.querySelector(`[data-input="${id}"]`);
    if (!el) return;
    if (el.type === "checkbox") el.checked = value.value; else el.value = value.value;
    const echo = document.querySelector(`[data-echo="${id}"]`);
    if (echo) echo.textContent = value.value;
  };

  socket.addEventListener("message", (msg) => {
    const event = JSON.parse(msg.data);
    if (event.type === "output_updated") renderOutput(event.payload.output_id, event.payload.state);
    if (event.type === "input_updated") renderInput(event.payload.input_id, event.payload.value);
    if (event.type === "error") console.error(event.payload.code, event.payload.message);
    if (event.type === "session_closed") document.body.classList.add("closed");
  });
})();
"#;

pub(crate) fn render_index(apps: &[AppSummary]) -> String {
    let mut body = String::from("<main class=\"stack\"><h1>Demo apps</h1><ul>");
    for app in apps {
        let _ = write!(
            body,
            r#"<li><a href="/apps/{}">{}</a></li>"#,
            escape(&app.name),
            escape(&app.title)
        );
    }
    body.push_str("</ul></main>");
    document("Demo apps", "", &body, false)
}

pub(crate) fn render_page(view: &View, snapshot: &SessionSnapshot) -> String {
    let page = Page { snapshot };
    let mut body = String::new();
    match &view.layout {
        Layout::Sidebar { sidebar, main } => {
            body.push_str(r#"<div class="sidebar-layout"><aside>"#);
            page.nodes(&mut body, sidebar);
            body.push_str("</aside><main>");
            page.nodes(&mut body, main);
            body.push_str("</main></div>");
        }
        Layout::Stack { children } => {
            body.push_str(r#"<main class="stack">"#);
            page.nodes(&mut body, children);
            body.push_str("</main>");
        }
    }
    document(
        &view.title,
        &snapshot.session_id.to_string(),
        &body,
        true,
    )
}

fn document(title: &str, session: &str, body: &str, interactive: bool) -> String {
    let script = if interactive {
        format!("<script>{SCRIPT}</script>")
    } else {
        String::new()
    };
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><title>{}</title><style>{STYLE}</style></head><body data-session=\"{}\">{body}{script}</body></html>",
        escape(title),
        escape(session)
    )
}

struct Page<'a> {
    snapshot: &'a SessionSnapshot,
}

impl Page<'_> {
    fn nodes(&self, out: &mut String, nodes: &[Node]) {
        for node in nodes {
            self.node(out, node);
        }
    }

    fn node(&self, out: &mut String, node: &Node) {
        match node {
            Node::Heading { text } => {
                let _ = write!(out, "<h3>{}</h3>", escape(text));
            }
            Node::Control { input } => self.control(out, input),
            Node::Rule => out.push_str("<hr>"),
            Node::Output { output } => self.output(out, output),
            Node::Card { header, children } => {
                out.push_str(r#"<section class="card">"#);
                if let Some(header) = header {
                    let _ = write!(out, "<header>{}</header>", escape(header));
                }
                out.push_str(r#"<div class="card-body">"#);
                self.nodes(out, children);
                out.push_str("</div></section>");
            }
            Node::StaticText { text } => {
                let _ = write!(out, r#"<p class="static">{}</p>"#, escape(text));
            }
        }
    }

    fn control(&self, out: &mut String, input: &InputSpec) {
        let id = escape(input.id.as_str());
        let label = escape(&input.label);
        let current = self.snapshot.inputs.get(&input.id);
        match &input.kind {
            InputKind::Slider { min, max, value } => {
                let value = current.and_then(InputValue::as_int).unwrap_or(*value);
                let _ = write!(
                    out,
                    r#"<div class="control slider"><label for="{id}">{label}: <span data-echo="{id}">{value}</span></label><input type="range" id="{id}" data-input="{id}" min="{min}" max="{max}" step="1" value="{value}"></div>"#
                );
            }
            InputKind::Select { choices, selected } => {
                let selected = current.and_then(InputValue::as_text).unwrap_or(selected);
                let _ = write!(
                    out,
                    r#"<div class="control select"><label for="{id}">{label}</label><select id="{id}" data-input="{id}">"#
                );
                for choice in choices {
                    let marker = if choice == selected { " selected" } else { "" };
                    let choice = escape(choice);
                    let _ = write!(out, r#"<option value="{choice}"{marker}>{choice}</option>"#);
                }
                out.push_str("</select></div>");
            }
            InputKind::Checkbox { value } => {
                let checked = current.and_then(InputValue::as_bool).unwrap_or(*value);
                let marker = if checked { " checked" } else { "" };
                let _ = write!(
                    out,
                    r#"<div class="control checkbox"><input type="checkbox" id="{id}" data-input="{id}"{marker}><label for="{id}">{label}</label></div>"#
                );
            }
            InputKind::Text { value } => {
                let value = escape(current.and_then(InputValue::as_text).unwrap_or(value));
                let _ = write!(
                    out,
                    r#"<div class="control text"><label for="{id}">{label}</label><input type="text" id="{id}" data-input="{id}" value="{value}"></div>"#
                );
            }
            InputKind::ActionButton => {
                let _ = write!(
                    out,
                    r#"<div class="control action"><button type="button" id="{id}" data-action="{id}">{label}</button></div>"#
                );
            }
        }
    }

    fn output(&self, out: &mut String, output: &OutputSpec) {
        let id = escape(output.id.as_str());
        let kind = match output.kind {
            OutputKind::Plot => "plot",
            OutputKind::Text => "text",
            OutputKind::Verbatim => "verbatim",
        };
        let tag = if output.kind == OutputKind::Verbatim {
            "pre"
        } else {
            "div"
        };
        let state = self
            .snapshot
            .outputs
            .get(&output.id)
            .unwrap_or(&OutputState::Pending);
        let (class, content) = match state {
            OutputState::Pending => ("", String::new()),
            OutputState::Failed { message } => (" failed", escape(message)),
            OutputState::Ready {
                payload: OutputPayload::Text { text },
            } => ("", escape(text)),
            OutputState::Ready {
                payload:
                    OutputPayload::Plot {
                        src,
                        width,
                        height,
                        alt,
                    },
            } => (
                "",
                format!(
                    r#"<img src="{}" width="{width}" height="{height}" alt="{}">"#,
                    escape(src),
                    escape(alt)
                ),
            ),
        };
        let _ = write!(
            out,
            r#"<{tag} class="output {kind}{class}" id="output-{id}">{content}</{tag}>"#
        );
    }
}

pub(crate) fn escape(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}

#[cfg(test)]
#[path = "tests/html_tests.rs"]
mod tests;
