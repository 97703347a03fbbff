/*!
 * Structured Tracing
 * Subscriber setup and timed spans for storage commands
 */

use std::time::{Duration, Instant};
use tracing::{debug, span, warn, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Commands slower than this are logged at warn level
pub const SLOW_OPERATION: Duration = Duration::from_millis(50);

/// Initialize the global subscriber
///
/// `RUST_LOG` sets the filter (default: info). With `json` set, output is
/// one JSON object per line; otherwise a compact human-readable format.
/// Calling this twice is harmless: the second install is ignored.
pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        debug!(json, "tracing initialized");
    }
}

/// Short random identifier correlating the log lines of one command
pub fn generate_trace_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Span covering one storage command, logged with its duration on drop
pub struct OperationSpan {
    span: Span,
    start: Instant,
    operation: String,
    trace_id: String,
}

impl OperationSpan {
    pub fn new(operation: &str, path: &str) -> Self {
        let trace_id = generate_trace_id();
        let span = span!(
            Level::DEBUG,
            "operation",
            trace_id = %trace_id,
            operation = operation,
            path = path,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            operation: operation.to_string(),
            trace_id,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn record_success(&self) {
        self.span.record("result", "success");
    }

    pub fn record_error(&self, error: &dyn std::fmt::Display) {
        self.span.record("error", tracing::field::display(error));
        self.span.record("result", "error");
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();
        if elapsed > SLOW_OPERATION {
            warn!(
                trace_id = %self.trace_id,
                operation = %self.operation,
                duration_ms = elapsed.as_millis() as u64,
                slow = true,
                "slow operation"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                operation = %self.operation,
                duration_us = elapsed.as_micros() as u64,
                "operation completed"
            );
        }
    }
}
