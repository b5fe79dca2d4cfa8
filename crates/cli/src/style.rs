//! Console styling for CLI output.

use console::Style;

/// Prefix `msg` with a green check mark.
pub fn success(msg: &str) -> String {
    format!("{} {}", Style::new().green().apply_to("✓"), msg)
}

/// Prefix `msg` with a red cross.
pub fn error(msg: &str) -> String {
    format!("{} {}", Style::new().red().apply_to("✗"), msg)
}

/// Prefix `msg` with a yellow warning sign.
pub fn warn(msg: &str) -> String {
    format!("{} {}", Style::new().yellow().apply_to("⚠"), msg)
}

/// Bold, for section headings.
pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// Dimmed, for secondary detail.
pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}
