use colored::*;
use indicatif::ProgressStyle;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const TICKS: &[&str] = &["▁▁▁▁▁", "▁▂▂▂▁", "▁▄▂▄▁", "▂▄▆▄▂", "▄▆█▆▄", "▂▄▆▄▂", "▁▄▂▄▁", "▁▂▂▂▁"];

fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} [{bar:32.green/bright_black}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸ ")
        .tick_strings(TICKS)
}

/// A span whose progress bar tracks completed ports. Without a terminal
/// there is no bar at all.
pub fn scan_progress(total: usize, attended: bool) -> Span {
    if !attended {
        return Span::none();
    }
    let span: Span = info_span!("scan");
    span.pb_set_style(&progress_style());
    span.pb_set_length(total as u64);
    span.pb_set_message("probing...");
    span
}

pub fn advance(span: &Span, open: usize) {
    span.pb_inc(1);
    if open > 0 {
        span.pb_set_message(&format!("{} open so far", open.to_string().green().bold()));
    }
}
