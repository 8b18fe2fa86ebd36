//! Console helpers: colored prefixes, durations, and labeled bars.

use owo_colors::OwoColorize;
use std::time::Duration;

/// Colors are off for structured output and when `NO_COLOR` is set.
pub fn use_colors(structured: bool) -> bool {
    !structured && std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if use_colors(false) {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if use_colors(false) {
        "note:".yellow().bold().to_string()
    } else {
        "note:".to_string()
    }
}

/// Terminal width from `COLUMNS`, else 80.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.trim().parse::<usize>().ok())
        .filter(|w| *w > 0)
        .unwrap_or(80)
}

/// `HH:MM:SS.mmm`
pub fn humanize_duration(d: Duration) -> String {
    let total_ms = (d.as_secs_f64() * 1000.0).round() as u128;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

/// Center `label` between `=` fills across `width` columns.
///
/// `visible_len` is the label length without ANSI escapes.
pub fn labeled_bar(label: &str, visible_len: usize, width: usize) -> String {
    let half = width.saturating_sub(visible_len + 2) / 2;
    let fill = "=".repeat(half);
    format!("{} {} {}", fill, label, fill)
}
