//! Terminal colors for command output, applied only when stdout is a
//! terminal and `NO_COLOR` is unset.

use crossterm::style::{Color, Stylize};
use crossterm::tty::IsTty;

fn enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_tty()
}

fn paint(text: &str, color: Color) -> String {
    if enabled() {
        text.with(color).to_string()
    } else {
        text.to_string()
    }
}

/// Red text.
#[must_use]
pub fn red(text: &str) -> String {
    paint(text, Color::Red)
}

/// Green text.
#[must_use]
pub fn green(text: &str) -> String {
    paint(text, Color::Green)
}

/// Yellow text.
#[must_use]
pub fn yellow(text: &str) -> String {
    paint(text, Color::Yellow)
}

/// Cyan text.
#[must_use]
pub fn cyan(text: &str) -> String {
    paint(text, Color::Cyan)
}
