use std::net::SocketAddr;

use crate::command::Command;

// ── Selection metrics ───────────────────────────────────────────

/// Counter: selection mutations applied. Labels: op.
pub const SELECTION_MUTATIONS_TOTAL: &str = "courtbook_selection_mutations_total";

/// Counter: front-end commands handled. Labels: command, status.
pub const COMMANDS_TOTAL: &str = "courtbook_commands_total";

// ── Reservation API metrics ─────────────────────────────────────

/// Histogram: reservation API call latency in seconds. Labels: call.
pub const API_REQUEST_DURATION_SECONDS: &str = "courtbook_api_request_duration_seconds";

/// Counter: failed reserved-hour lookups (selection continues on stale data).
pub const RESERVED_FETCH_FAILURES_TOTAL: &str = "courtbook_reserved_fetch_failures_total";

/// Counter: reservation ranges submitted. Labels: status (confirmed, failed).
pub const RESERVATIONS_SUBMITTED_TOTAL: &str = "courtbook_reservations_submitted_total";

/// Histogram: wall time of one whole submission batch in seconds.
pub const SUBMISSION_DURATION_SECONDS: &str = "courtbook_submission_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::Day(_) => "day",
        Command::Today => "today",
        Command::Next => "next",
        Command::Prev => "prev",
        Command::Toggle(_) => "toggle",
        Command::Range(..) => "range",
        Command::Start(_) => "start",
        Command::End(_) => "end",
        Command::Drag { .. } => "drag",
        Command::Clear => "clear",
        Command::Grid => "grid",
        Command::Show => "show",
        Command::Submit => "submit",
        Command::Retry => "retry",
        Command::Status => "status",
        Command::WhoAmI => "whoami",
        Command::Help => "help",
        Command::Quit => "quit",
    }
}
