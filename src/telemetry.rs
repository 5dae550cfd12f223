use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::ObservabilityConfig;

/// Initialize tracing with structured logging.
/// RUST_LOG wins over the configured log level when set.
pub fn init_telemetry(observability: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&observability.log_level))?;

    let json = observability.json_logs.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
    });
    let plain = (!observability.json_logs).then(|| fmt::layer().with_target(false));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init()?;

    tracing::info!("Call transactions telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span carrying the transaction's identity
pub fn create_transaction_span(
    operation: &str,
    transaction: &str,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "call_transaction",
        operation = operation,
        transaction.name = transaction,
        correlation.id = correlation_id,
        otel.kind = "internal"
    )
}

/// Shutdown telemetry gracefully
pub fn shutdown_telemetry() {
    // For structured logging, no explicit shutdown needed
    tracing::info!("Call transactions telemetry shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_ids_are_unique() {
        let first = generate_correlation_id();
        let second = generate_correlation_id();
        assert_ne!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }
}
