//! Per-request spans, request IDs and access logging.

use std::time::{Duration, Instant};

use opentelemetry::{Context, global, propagation::Extractor, trace::TraceContextExt as _};
use salvo::{
    Depot, FlowCtrl, Request, Response, handler,
    http::{HeaderMap, HeaderName, StatusCode, header::HeaderValue},
};
use tracing::{Instrument as _, error, info, warn};
use tracing_opentelemetry::OpenTelemetrySpanExt as _;
use uuid::Uuid;

use crate::config::observability::ObservabilityConfig;

use super::metrics;

pub(crate) const REQUEST_ID_HEADER: &str = "x-request-id";

const REQUEST_ID_DEPOT_KEY: &str = "request_id";

/// Hoop that opens an `http.request` span around every request and logs its outcome.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RequestLogging {
    slow_threshold: Duration,
    parent_propagation: bool,
}

impl RequestLogging {
    pub(crate) fn new(config: &ObservabilityConfig) -> Self {
        Self {
            slow_threshold: config.slow_request_threshold(),
            parent_propagation: config.otel_enabled && config.otel_parent_propagation_enabled,
        }
    }
}

#[handler]
impl RequestLogging {
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        if req.uri().path() == "/metrics" {
            ctrl.call_next(req, depot, res).await;
            return;
        }

        let started = Instant::now();
        let _in_flight = metrics::InFlight::enter();

        let request_id = req
            .header::<String>(REQUEST_ID_HEADER)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        depot.insert(REQUEST_ID_DEPOT_KEY, request_id.clone());

        match HeaderValue::from_str(&request_id) {
            Ok(value) => {
                res.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            Err(source) => warn!(request_id, "unencodable request id: {source}"),
        }

        let method = req.method().to_string();
        let path = req.uri().path().to_owned();
        let route = route_template(&path);

        let span = tracing::info_span!(
            parent: None,
            "http.request",
            otel.name = %format!("{method} {route}"),
            otel.kind = "server",
            request_id = %request_id,
            method = %method,
            path = %path,
            remote_addr = %req.remote_addr(),
            status = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        if self.parent_propagation
            && let Some(parent) = extract_parent_context(req.headers())
            && let Err(source) = span.set_parent(parent)
        {
            warn!("failed to set parent context on request span: {source}");
        }

        ctrl.call_next(req, depot, res).instrument(span.clone()).await;

        let elapsed = started.elapsed();
        let status = res.status_code.unwrap_or(StatusCode::OK);
        let duration_ms = elapsed.as_millis();

        metrics::observe_request(&method, &route, status.as_u16(), elapsed.as_secs_f64());

        span.record("status", status.as_u16());
        span.record("duration_ms", duration_ms);

        span.in_scope(|| {
            if status.is_server_error() {
                error!(status = status.as_u16(), duration_ms, "request.failed");
            } else if status.is_client_error() {
                warn!(status = status.as_u16(), duration_ms, "request.rejected");
            } else {
                info!(status = status.as_u16(), duration_ms, "request.completed");
            }

            if elapsed > self.slow_threshold {
                warn!(
                    duration_ms,
                    threshold_ms = self.slow_threshold.as_millis(),
                    "slow request"
                );
            }
        });
    }
}

/// Collapse identifiers in a path so span names and metric labels stay bounded.
fn route_template(path: &str) -> String {
    let mut previous = "";

    let segments: Vec<&str> = path
        .trim_start_matches('/')
        .split('/')
        .map(|segment| {
            let templated = if Uuid::parse_str(segment).is_ok() {
                "{uuid}"
            } else if previous == "additional" && segment.parse::<u16>().is_ok() {
                "{index}"
            } else {
                segment
            };

            previous = segment;

            templated
        })
        .collect();

    format!("/{}", segments.join("/"))
}

fn extract_parent_context(headers: &HeaderMap) -> Option<Context> {
    global::get_text_map_propagator(|propagator| {
        let context = propagator.extract_with_context(&Context::new(), &Headers(headers));

        context
            .span()
            .span_context()
            .is_valid()
            .then_some(context)
    })
}

struct Headers<'a>(&'a HeaderMap);

impl Extractor for Headers<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.to_str().ok()
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}
