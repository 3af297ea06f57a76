use std::time::Duration;

use anyhow::{Context, Result};
use chant_types::{ItemsPayload, Page, RecordPayload};
use serde::de::DeserializeOwned;

use crate::chant::lines::{DataQuery, render_lines};

/// HTTP agent shared by every fetch. `timeout` bounds each whole request,
/// so a server that accepts and never answers surfaces as an error.
pub(crate) fn agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    ureq::Agent::new_with_config(config)
}

/// Fetch the records for `query` and render them as chant lines.
///
/// An empty collection is not an error; the player substitutes the quote of
/// the day.
pub(crate) fn fetch_lines(agent: &ureq::Agent, server: &str, query: &DataQuery) -> Result<Vec<String>> {
    let url = query.url(server);
    let label = endpoint_label(&url);
    let payload: ItemsPayload<RecordPayload> = read_json(
        agent
            .get(&url)
            .call()
            .with_context(|| format!("request /{label}"))?,
        label,
    )?;
    let lines = render_lines(query.mode, payload.into_items());
    tracing::debug!(mode = query.mode.title(), lines = lines.len(), "fetched chant lines");
    Ok(lines)
}

/// Fetch one page of a collection in the `{items, _meta, _links}` envelope.
pub(crate) fn fetch_page(agent: &ureq::Agent, url: &str) -> Result<Page> {
    let label = endpoint_label(url);
    read_json(
        agent
            .get(url)
            .call()
            .with_context(|| format!("request /{label}"))?,
        label,
    )
}

/// Path of `url` without scheme, host or query, for error context.
fn endpoint_label(url: &str) -> &str {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = without_scheme
        .find('/')
        .map(|i| &without_scheme[i + 1..])
        .unwrap_or("");
    path.split(['?', '#']).next().unwrap_or(path)
}

fn read_json<T: DeserializeOwned>(
    mut resp: ureq::http::Response<ureq::Body>,
    label: &str,
) -> Result<T> {
    let body = resp
        .body_mut()
        .read_to_string()
        .with_context(|| format!("read /{label} response body"))?;
    serde_json::from_str(&body).with_context(|| format!("decode /{label} response"))
}
