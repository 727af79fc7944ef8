//! Operator-facing messages.
//!
//! Everything the person running the tool needs to act on goes to stderr
//! through here, separate from the `tracing` log stream.

/// Print `Warning: <message>` to stderr.
pub fn warn(message: impl std::fmt::Display) {
    eprintln!("Warning: {message}");
}

/// Print `Error: <message>` to stderr.
pub fn error(message: impl std::fmt::Display) {
    eprintln!("Error: {message}");
}
