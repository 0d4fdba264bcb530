//! Process-wide logging setup shared by the API binary and the client.

/// Initialize process-wide tracing with the default `info` filter.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init("info");
}

/// Subscriber construction (filters, JSON formatting).
pub mod tracing;
