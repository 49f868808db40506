//! Preview document shell.
//!
//! Wraps a preview state in a complete HTML document, used by the CLI
//! `render` command and the live-preview server.

use crate::orchestrator::PreviewState;

/// Options for the document shell.
#[derive(Debug, Clone)]
pub struct PageOptions {
    /// Document title.
    pub title: String,

    /// URL of the live-update client script, when served by the dev server.
    pub live_script: Option<String>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            title: "Vitrine Preview".to_string(),
            live_script: None,
        }
    }
}

/// Render a full preview document around the current state.
pub fn render_document(state: &PreviewState, options: &PageOptions) -> String {
    let script = match &options.live_script {
        Some(url) => format!("\n  <script src=\"{url}\"></script>"),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{title}</title>
  <style>
    body {{ font-family: system-ui, sans-serif; max-width: 800px; margin: 2rem auto; padding: 0 1rem; }}
    .vitrine-loading {{ color: #666; }}
    .vitrine-failure {{ border: 1px solid #c33; border-radius: 0.5rem; padding: 1rem; background: #fff5f5; }}
    .vitrine-failure pre {{ background: #f5f5f5; padding: 1rem; border-radius: 0.5rem; overflow-x: auto; }}
    .vitrine-failure summary {{ cursor: pointer; color: #666; }}
  </style>
</head>
<body>
  <div id="vitrine-root">{content}</div>{script}
</body>
</html>"#,
        title = escape_html(&options.title),
        content = state.html(),
        script = script,
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{FailureReport, PreviewState};
    use vitrine_transform::Failure;

    #[test]
    fn wraps_content_in_the_root_element() {
        let html = render_document(&PreviewState::Loading, &PageOptions::default());

        assert!(html.contains(r#"<div id="vitrine-root">"#));
        assert!(html.contains("vitrine-loading"));
        assert!(!html.contains("<script"));
    }

    #[test]
    fn includes_the_live_script_when_configured() {
        let options = PageOptions {
            title: "Dev".to_string(),
            live_script: Some("/__live.js".to_string()),
        };
        let html = render_document(&PreviewState::Loading, &options);

        assert!(html.contains(r#"<script src="/__live.js"></script>"#));
    }

    #[test]
    fn failure_states_render_the_panel() {
        let state = PreviewState::Failed(FailureReport {
            failure: Failure::transform("no code provided"),
            transformed: None,
        });
        let html = render_document(&state, &PageOptions::default());

        assert!(html.contains("data-stage=\"transform\""));
        assert!(html.contains("no code provided"));
    }

    #[test]
    fn escapes_the_title() {
        let options = PageOptions {
            title: "<oops>".to_string(),
            live_script: None,
        };
        let html = render_document(&PreviewState::Loading, &options);

        assert!(html.contains("&lt;oops&gt;"));
    }
}
