//! Escape sequences for terminal output.

pub const BOLD: &str = "\x1b[1m";
pub const BOLD_RED: &str = "\x1b[1;31m";
pub const RESET: &str = "\x1b[0m";
