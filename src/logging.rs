//! # Structured Logging Module
//!
//! Environment-aware structured logging for reconciliation runs. Production emits JSON
//! lines; every other environment gets human-readable output.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call more than once; only the first call installs a subscriber. `RUST_LOG`
/// overrides the environment's default level.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let layer = match environment.as_str() {
            "production" => fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed(),
            // Captured per test by the harness
            "test" => fmt::layer()
                .with_test_writer()
                .with_target(false)
                .with_filter(filter)
                .boxed(),
            _ => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_filter(filter)
                .boxed(),
        };

        // Use try_init to avoid panic if a global subscriber is already set
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

fn get_environment() -> String {
    crate::constants::env::current()
}

/// Default filter directive when `RUST_LOG` is not set.
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info,sqlx=warn",
        _ => "debug,sqlx=info",
    }
}

/// Log structured data for pass lifecycle events
pub fn log_pass_operation(
    operation: &str,
    pass_name: &str,
    run_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        pass_name = %pass_name,
        run_id = run_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔄 PASS_OPERATION"
    );
}

/// Log a per-record failure. The record is skipped; the pass continues.
pub fn log_record_failure(pass_name: &str, record_key: &str, error: &str) {
    tracing::warn!(
        pass_name = %pass_name,
        record_key = %record_key,
        error = %error,
        timestamp = %Utc::now().to_rfc3339(),
        "⚠️ RECORD_SKIPPED"
    );
}

/// Log structured data for store round-trips
pub fn log_store_operation(
    operation: &str,
    records: usize,
    status: &str,
    duration_ms: Option<u64>,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        records = records,
        status = %status,
        duration_ms = duration_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "💾 STORE_OPERATION"
    );
}

/// Log an upstream attempt that will be retried after `delay_ms`.
pub fn log_upstream_retry(service: &str, attempt: u32, reason: &str, delay_ms: u64) {
    tracing::warn!(
        service = %service,
        attempt = attempt,
        reason = %reason,
        delay_ms = delay_ms,
        "🔁 UPSTREAM_RETRY"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
