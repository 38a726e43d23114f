//! Log file name templates
//!
//! `%p` expands to the process id, `%t` to milliseconds since the Unix
//! epoch and `%%` to a single `%`. Any other `%x` pair, and a trailing `%`,
//! are kept as written.

use std::time::{SystemTime, UNIX_EPOCH};

/// Name that sends the text log to stdout instead of a file.
pub const LOG_TO_CONSOLE: &str = "-";

/// Expand a template for the current process and time.
#[must_use]
pub fn prepare_log_file_name(template: &str) -> String {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    expand_log_file_name(template, std::process::id(), now_ms)
}

/// Expand a template with explicit process id and timestamp.
#[must_use]
pub fn expand_log_file_name(template: &str, pid: u32, time_ms: u128) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('p') => out.push_str(&pid.to_string()),
            Some('t') => out.push_str(&time_ms.to_string()),
            Some('%') | None => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
        }
    }
    out
}
