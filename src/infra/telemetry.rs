use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::cascade::METRIC_CASCADE_TOTAL;
use crate::application::validation::METRIC_VALIDATION_TOTAL;
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::cache::METRIC_CACHE_OPERATION_TOTAL;
use crate::infra::peers::METRIC_PEER_REQUEST_MS;

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_VALIDATION_TOTAL,
            Unit::Count,
            "Notebook reference checks, labelled by resolving source and result."
        );
        describe_counter!(
            METRIC_CASCADE_TOTAL,
            Unit::Count,
            "Notebook deletions attempted, labelled by outcome."
        );
        describe_counter!(
            METRIC_CACHE_OPERATION_TOTAL,
            Unit::Count,
            "Cache tier operations against Redis, labelled by tier, operation and outcome."
        );
        describe_histogram!(
            METRIC_PEER_REQUEST_MS,
            Unit::Milliseconds,
            "Latency of requests to the other service in milliseconds."
        );
    });
}
