use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

pub mod labels {
    pub const ERROR_TYPE: &str = "error_type";
    pub const ALGORITHM: &str = "algorithm";
    pub const ROUTE: &str = "route";
    pub const STATUS_CODE: &str = "status_code";
    pub const METHOD: &str = "method";
    pub const MODEL: &str = "model";
    pub const OUTCOME: &str = "outcome";
    pub const TIMEOUT_TYPE: &str = "timeout_type";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const ERROR_RATE_LIMITED: &str = "rate_limited";
    pub const ERROR_INVALID_REQUEST: &str = "invalid_request";
    pub const TIMEOUT_IDLE_CONNECTION: &str = "idle_connection";
    pub const TIMEOUT_REQUEST_BODY: &str = "request_body";
    pub const TIMEOUT_RETRIEVAL: &str = "retrieval";
    pub const TIMEOUT_GENERATION: &str = "generation";
    pub const OUTCOME_DONE: &str = "done";
    pub const OUTCOME_CANCELLED: &str = "cancelled";
}

#[derive(Clone)]
pub struct Metrics {
    pub connections_total: Counter<u64>,
    pub connections_active: UpDownCounter<i64>,
    pub connections_rejected_total: Counter<u64>,

    pub requests_total: Counter<u64>,
    pub requests_duration_seconds: Histogram<f64>,

    pub timeouts_total: Counter<u64>,
    pub errors_total: Counter<u64>,

    // Rate limiting
    pub rate_limit_requests_total: Counter<u64>,
    pub rate_limit_allowed_total: Counter<u64>,
    pub rate_limit_rejected_total: Counter<u64>,

    // Answer streaming
    // outcome label: "done" | "cancelled" | an error kind
    pub streams_total: Counter<u64>,
    pub stream_duration_seconds: Histogram<f64>,
    pub tokens_streamed_total: Counter<u64>,
    pub client_disconnects_total: Counter<u64>,
    pub retrieval_duration_seconds: Histogram<f64>,

    pub build_info: Gauge<u64>,
}

impl Metrics {
    fn new(meter: Meter) -> Self {
        Self {
            connections_total: meter
                .u64_counter("smartdocs_connections_total")
                .with_description("Total number of connections established")
                .build(),
            connections_active: meter
                .i64_up_down_counter("smartdocs_connections_active")
                .with_description("Number of active connections")
                .build(),
            connections_rejected_total: meter
                .u64_counter("smartdocs_connections_rejected_total")
                .with_description("Connections rejected by the connection limit")
                .build(),

            requests_total: meter
                .u64_counter("smartdocs_requests_total")
                .with_description("Total number of requests processed")
                .build(),
            requests_duration_seconds: meter
                .f64_histogram("smartdocs_requests_duration_seconds")
                .with_description("Time to response headers in seconds")
                .build(),

            timeouts_total: meter
                .u64_counter("smartdocs_timeouts_total")
                .with_description("Timeouts by type")
                .build(),
            errors_total: meter
                .u64_counter("smartdocs_errors_total")
                .with_description("Errors by type")
                .build(),

            rate_limit_requests_total: meter
                .u64_counter("smartdocs_rate_limit_requests_total")
                .with_description("Requests checked against a rate limit")
                .build(),
            rate_limit_allowed_total: meter
                .u64_counter("smartdocs_rate_limit_allowed_total")
                .with_description("Requests admitted by the rate limiter")
                .build(),
            rate_limit_rejected_total: meter
                .u64_counter("smartdocs_rate_limit_rejected_total")
                .with_description("Requests rejected by the rate limiter")
                .build(),

            streams_total: meter
                .u64_counter("smartdocs_streams_total")
                .with_description("Answer streams by outcome")
                .build(),
            stream_duration_seconds: meter
                .f64_histogram("smartdocs_stream_duration_seconds")
                .with_description("Answer stream duration in seconds")
                .build(),
            tokens_streamed_total: meter
                .u64_counter("smartdocs_tokens_streamed_total")
                .with_description("Token events sent to clients")
                .build(),
            client_disconnects_total: meter
                .u64_counter("smartdocs_client_disconnects_total")
                .with_description("Streams abandoned by the client before completion")
                .build(),
            retrieval_duration_seconds: meter
                .f64_histogram("smartdocs_retrieval_duration_seconds")
                .with_description("Retriever search duration in seconds")
                .build(),

            build_info: meter
                .u64_gauge("smartdocs_build_info")
                .with_description("Build information")
                .build(),
        }
    }

    /// Set build info metric with version labels
    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_rate_limit_request(&self, algorithm: &str, route: &str) {
        self.rate_limit_requests_total.add(
            1,
            &[
                KeyValue::new(labels::ALGORITHM, algorithm.to_string()),
                KeyValue::new(labels::ROUTE, route.to_string()),
            ],
        );
    }

    pub fn record_rate_limit_allowed(&self, algorithm: &str, route: &str) {
        self.rate_limit_allowed_total.add(
            1,
            &[
                KeyValue::new(labels::ALGORITHM, algorithm.to_string()),
                KeyValue::new(labels::ROUTE, route.to_string()),
            ],
        );
    }

    pub fn record_rate_limit_rejection(&self, algorithm: &str, route: &str) {
        self.errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, values::ERROR_RATE_LIMITED)]);
        self.rate_limit_rejected_total.add(
            1,
            &[
                KeyValue::new(labels::ALGORITHM, algorithm.to_string()),
                KeyValue::new(labels::ROUTE, route.to_string()),
            ],
        );
    }

    pub fn record_request(&self, method: &str, status_code: u16, route: &str, duration: f64) {
        let attrs = [
            KeyValue::new(labels::METHOD, method.to_string()),
            KeyValue::new(labels::STATUS_CODE, status_code.to_string()),
            KeyValue::new(labels::ROUTE, route.to_string()),
        ];
        self.requests_total.add(1, &attrs);
        self.requests_duration_seconds.record(duration, &attrs);
    }

    /// Record a finished answer stream. `outcome` is `"done"`, `"cancelled"`
    /// or the error kind that ended it.
    pub fn record_stream(&self, model: &str, outcome: &str, tokens: u64, duration: f64) {
        let attrs = [
            KeyValue::new(labels::MODEL, model.to_string()),
            KeyValue::new(labels::OUTCOME, outcome.to_string()),
        ];
        self.streams_total.add(1, &attrs);
        self.stream_duration_seconds.record(duration, &attrs);
        if tokens > 0 {
            self.tokens_streamed_total
                .add(tokens, &[KeyValue::new(labels::MODEL, model.to_string())]);
        }
        if outcome == values::OUTCOME_CANCELLED {
            self.client_disconnects_total.add(1, &[]);
        }
    }

    pub fn record_retrieval(&self, duration: f64) {
        self.retrieval_duration_seconds.record(duration, &[]);
    }

    pub fn record_error(&self, error_type: &str) {
        self.errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type.to_string())]);
    }

    pub fn record_timeout(&self, timeout_type: &str) {
        self.timeouts_total
            .add(1, &[KeyValue::new(labels::TIMEOUT_TYPE, timeout_type.to_string())]);
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("smartdocs");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
