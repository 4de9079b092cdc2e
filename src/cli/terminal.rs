//! Terminal capability detection and colouring

use owo_colors::{OwoColorize, colors::css};
use reqtrace::domain::TestStatus;

/// Whether stdout accepts colour
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Whether the terminal is narrower than 60 columns
pub fn is_narrow() -> bool {
    terminal_size::terminal_size().is_some_and(|(width, _)| width.0 < 60)
}

fn paint(text: &str, style: impl FnOnce(&str) -> String) -> String {
    if supports_color() {
        style(text)
    } else {
        text.to_string()
    }
}

/// Extension trait for colouring output
pub trait Colorize {
    /// Green
    fn success(&self) -> String;
    /// Amber
    fn warning(&self) -> String;
    /// Red
    fn failure(&self) -> String;
    /// Dimmed
    fn dim(&self) -> String;
}

impl Colorize for str {
    fn success(&self) -> String {
        paint(self, |text| text.fg::<css::Green>().to_string())
    }

    fn warning(&self) -> String {
        paint(self, |text| text.fg::<css::Orange>().to_string())
    }

    fn failure(&self) -> String {
        paint(self, |text| text.fg::<css::Red>().to_string())
    }

    fn dim(&self) -> String {
        paint(self, |text| text.dimmed().to_string())
    }
}

/// `text` in the colour of `status`
pub fn by_status(text: &str, status: TestStatus) -> String {
    match status {
        TestStatus::Passed => text.success(),
        TestStatus::Failed => text.failure(),
        TestStatus::Missing => text.warning(),
        TestStatus::Skipped => text.dim(),
    }
}
