//! Public HTML status page.

use std::time::Duration;

use axum::{extract::State, response::Html};

use super::state::HubState;

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

pub async fn dashboard(State(state): State<HubState>) -> Html<String> {
    let registry = state.registry.stats();
    let tool_cache = state.tool_cache.stats();
    let snapshot = state.metrics.snapshot();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{project} hub</title>
  <style>
    body {{ font-family: monospace; margin: 2em; background: #1e1e1e; color: #ddd; }}
    h1 {{ color: #8ec07c; }}
    table {{ border-collapse: collapse; margin: 1em 0; }}
    td, th {{ border: 1px solid #444; padding: 0.3em 0.8em; text-align: left; }}
  </style>
</head>
<body>
  <h1>{project}</h1>
  <table>
    <tr><th>version</th><td>{version}</td></tr>
    <tr><th>uptime</th><td>{uptime}</td></tr>
    <tr><th>tools</th><td>{tools}</td></tr>
    <tr><th>resources</th><td>{resources}</td></tr>
    <tr><th>prompts</th><td>{prompts}</td></tr>
    <tr><th>requests served</th><td>{requests}</td></tr>
    <tr><th>cache hit rate</th><td>{hit_rate:.1}%</td></tr>
  </table>
  <p>API surface under <code>/api/*</code>, discovery under <code>/mcp/*</code>, live events at <code>/events</code>.</p>
</body>
</html>
"#,
        project = state.config.project_name,
        version = env!("CARGO_PKG_VERSION"),
        uptime = format_uptime(state.start_time.elapsed()),
        tools = registry.tools,
        resources = registry.resources,
        prompts = registry.prompts,
        requests = snapshot.requests_total,
        hit_rate = tool_cache.hit_rate * 100.0,
    );
    Html(html)
}
