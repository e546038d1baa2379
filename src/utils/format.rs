//! Display helpers for durations

/// Format milliseconds as `MM:SS`, truncating to whole seconds.
///
/// Minutes are not wrapped, so 90 minutes renders as `90:00`.
pub fn format_ms_as_mm_ss(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
