//! Background fetch thread.
//!
//! The UI thread sends requests and drains responses between frames, so slow
//! or unreachable servers never stall the fade.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use chant_types::Page;

use crate::chant::lines::DataQuery;
use crate::server_api;

#[derive(Debug, Clone)]
pub(crate) enum FetchRequest {
    /// Lines for a new chant session.
    Lines(DataQuery),
    /// One table page.
    Page { url: String, generation: u64 },
    Quit,
}

#[derive(Debug)]
pub(crate) enum FetchResponse {
    Lines {
        query: DataQuery,
        result: Result<Vec<String>, String>,
    },
    Page {
        generation: u64,
        result: Result<Page, String>,
    },
}

/// Serve requests until `Quit` or until either channel closes. Every request
/// is bounded by `timeout`.
pub(crate) fn worker_main(
    server: String,
    timeout: Duration,
    req_rx: Receiver<FetchRequest>,
    resp_tx: Sender<FetchResponse>,
) {
    let agent = server_api::agent(timeout);
    while let Ok(req) = req_rx.recv() {
        let resp = match req {
            FetchRequest::Quit => break,
            FetchRequest::Lines(query) => {
                let result = server_api::fetch_lines(&agent, &server, &query).map_err(|e| format!("{e:#}"));
                if let Err(e) = &result {
                    tracing::warn!(mode = query.mode.title(), "line fetch failed: {e}");
                }
                FetchResponse::Lines { query, result }
            }
            FetchRequest::Page { url, generation } => {
                let result = server_api::fetch_page(&agent, &url).map_err(|e| format!("{e:#}"));
                if let Err(e) = &result {
                    tracing::warn!(%url, "page fetch failed: {e}");
                }
                FetchResponse::Page { generation, result }
            }
        };
        if resp_tx.send(resp).is_err() {
            break;
        }
    }
    tracing::debug!("fetch worker stopped");
}
