use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Histogram: query latency in seconds. Labels: op.
pub const QUERY_DURATION_SECONDS: &str = "spanstore_query_duration_seconds";

/// Counter: find-set searches. Labels: outcome (found, none).
pub const FIND_SET_TOTAL: &str = "spanstore_find_set_total";

/// Counter: conflict checks. Labels: result (conflict, clear).
pub const CONFLICT_CHECKS_TOTAL: &str = "spanstore_conflict_checks_total";

/// Counter: transaction commits. Labels: status (ok, error).
pub const COMMITS_TOTAL: &str = "spanstore_commits_total";

/// Counter: intervals made durable by commits.
pub const INTERVALS_ADDED_TOTAL: &str = "spanstore_intervals_added_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: intervals in the published snapshot.
pub const INTERVALS_STORED: &str = "spanstore_intervals_stored";

/// Histogram: WAL append + fsync duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "spanstore_wal_flush_duration_seconds";

/// Counter: completed WAL compactions.
pub const COMPACTIONS_TOTAL: &str = "spanstore_compactions_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
