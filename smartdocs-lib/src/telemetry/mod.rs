pub mod health;
pub mod metrics;
pub mod server;
pub mod tracing;

pub use health::{
    environment, health_check_response, health_report, live_check_response, ready_check_response,
    HealthReport,
};
pub use metrics::{init_metrics, Metrics};
pub use server::{metrics_response, start_observability_server};
pub use tracing::init_tracing;
