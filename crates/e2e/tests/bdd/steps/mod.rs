mod audit_steps;
mod console_steps;
mod login_steps;

use std::time::Duration;

/// Wait budget from an optional `within N ms` step suffix.
pub fn budget(tail: &str, default: Duration) -> Duration {
    tail.trim()
        .strip_prefix("within ")
        .and_then(|rest| rest.strip_suffix("ms"))
        .and_then(|n| n.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
