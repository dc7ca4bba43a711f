//! Request metrics with a plain-text exposition endpoint

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::server::SharedState;

const APP_NAME: &str = "content_gateway";

#[derive(Default)]
struct Counters {
    requests: HashMap<u16, u64>,
    bytes: HashMap<u16, u64>,
}

/// Per-status request and byte counters, labelled with a per-process run id
/// so restarts are visible to the scraper.
pub struct Metrics {
    run_id: String,
    counters: RwLock<Counters>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut counters = Counters::default();
        counters.requests.insert(200, 0);
        counters.bytes.insert(200, 0);

        Self {
            run_id: Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_string(),
            counters: RwLock::new(counters),
        }
    }

    pub fn record_request(&self, status: u16) {
        let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        *counters.requests.entry(status).or_insert(0) += 1;
    }

    pub fn add_bytes(&self, status: u16, count: u64) {
        let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        *counters.bytes.entry(status).or_insert(0) += count;
    }

    /// Render the counters in the plain-text exposition format.
    pub fn render(&self) -> String {
        let counters = self.counters.read().unwrap_or_else(PoisonError::into_inner);
        let common = format!("app=\"{}\",run_id=\"{}\"", APP_NAME, self.run_id);

        let mut out = format!("{}_instance{{{}}} 1\n", APP_NAME, common);
        for (status, count) in &counters.requests {
            out.push_str(&format!(
                "{}_total_requests{{{},status_code=\"{}\"}} {}\n",
                APP_NAME, common, status, count
            ));
        }
        for (status, bytes) in &counters.bytes {
            out.push_str(&format!(
                "{}_total_bytes{{{},status_code=\"{}\"}} {}\n",
                APP_NAME, common, status, bytes
            ));
        }
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Record the final status and bytes written for every completed request.
///
/// The response body is re-wrapped so bytes are counted as they stream out,
/// not buffered.
pub async fn track(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status().as_u16();
    state.metrics.record_request(status);

    let (parts, body) = response.into_parts();
    let counted = body.into_data_stream().inspect(move |chunk| {
        if let Ok(data) = chunk {
            state.metrics.add_bytes(status, data.len() as u64);
        }
    });

    Response::from_parts(parts, Body::from_stream(counted))
}
