//! Structured logging and tracing configuration.
//!
//! Provides setup for observability using the `tracing` crate with:
//! - Structured logging with JSON output option
//! - Configurable log levels
//! - Span helpers for scan passes, batches and copy actions

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

/// Initialize tracing with the given level and output format.
///
/// `RUST_LOG` overrides `level` when set. Logs go to stderr so that command
/// output on stdout stays clean.
///
/// # Panics
///
/// Panics if tracing subscriber has already been initialized in this process.
pub fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        let json_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default().with(env_filter).with(json_layer).init();
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        Registry::default().with(env_filter).with(fmt_layer).init();
    }

    tracing::debug!("Tracing initialized: level={}, json={}", level, json);
}

/// Span helpers.
pub mod spans {
    use tracing::{debug_span, info_span, Span};

    /// Span for one scan pass.
    #[must_use]
    pub fn scan_span(pass: u64, performance_mode: bool) -> Span {
        info_span!("scan_pass", pass, performance_mode)
    }

    /// Span for one batch within a pass.
    #[must_use]
    pub fn batch_span(batch: usize, size: usize) -> Span {
        debug_span!("batch", batch, size)
    }

    /// Span for a copy action triggered by a click.
    #[must_use]
    pub fn copy_span(code: &str) -> Span {
        info_span!("copy", code = %code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_creation() {
        let span = spans::scan_span(1, true);
        let _guard = span.enter();
        let inner = spans::batch_span(0, 10);
        let _inner = inner.enter();
        let copy = spans::copy_span("1234 AB");
        drop(copy);
    }
}
