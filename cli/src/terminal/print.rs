use std::fmt::Display;

use colored::*;
use portr_common::scan::{PortState, ScanResult};
use unicode_width::UnicodeWidthStr;

use crate::terminal::{colors, format};

pub const TOTAL_WIDTH: usize = 64;
/// Events with this target are printed verbatim, without a level glyph.
pub const PRINT_TARGET: &str = "portr::print";
const KEY_WIDTH: usize = 10;

pub fn print(msg: &str) {
    tracing::info!(target: PRINT_TARGET, "{msg}");
}

/// Prints multi-line text one line per event.
pub fn raw(text: &str) {
    text.lines().for_each(print);
}

pub fn banner(no_banner: bool, q_level: u8) {
    if no_banner || q_level > 0 {
        return;
    }

    let text_content: String = format!("⟦ PORTR v{} ⟧ ", env!("CARGO_PKG_VERSION"));
    let text_width: usize = UnicodeWidthStr::width(text_content.as_str());
    let text: ColoredString = text_content.bright_green().bold();
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH.saturating_sub(text_width) / 2).bright_black();

    print(&format!("{sep}{text}{sep}"));
}

pub fn header(msg: &str, q_level: u8) {
    if q_level > 0 {
        return;
    }

    let formatted: String = format!("⟦ {msg} ⟧");
    let dash_count: usize = TOTAL_WIDTH.saturating_sub(UnicodeWidthStr::width(formatted.as_str()));
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    print(&line.to_string());
}

pub fn fat_separator() {
    print(&"═".repeat(TOTAL_WIDTH).bright_black().to_string());
}

/// `key.......: value`, keys padded to a common width.
pub fn aligned_line(key: &str, value: impl Display) {
    let dots: String = ".".repeat((KEY_WIDTH + 1).saturating_sub(key.len()));
    let colon: String = format!("{}{}", dots.color(colors::SEPARATOR), ":".color(colors::SEPARATOR));
    print_status(format!("{}{} {}", key.color(colors::PRIMARY), colon, value.to_string().color(colors::TEXT_DEFAULT)));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    let prefix: ColoredString = ">".color(colors::SEPARATOR);
    print(&format!("{} {}", prefix, msg.as_ref().color(colors::TEXT_DEFAULT)));
}

/// One port as it arrives. At `-qq` only open ports are shown.
pub fn result_line(result: &ScanResult, proto: &str, q_level: u8) {
    if q_level >= 2 && result.state != PortState::Open {
        return;
    }
    let port: String = format!("{}/{}", result.port, proto);
    let state: ColoredString = format::state(&result.state);
    let pad: usize = 14usize.saturating_sub(console::measure_text_width(&state.to_string()));

    print(&format!(
        "{:<11} {}{} {}",
        port.color(colors::ACCENT),
        state,
        " ".repeat(pad),
        result.evidence.color(colors::SEPARATOR)
    ));
}
