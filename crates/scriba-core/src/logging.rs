//! Diagnostics go to stderr through `tracing`; stdout carries only answers.

use tracing::Level;

/// Parse a configured level name, falling back to `WARN`.
pub fn parse_level(name: &str) -> Level {
    name.trim().parse().unwrap_or(Level::WARN)
}

/// Install the global subscriber. `verbose` raises the level to `DEBUG`.
pub fn init(level: &str, verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        parse_level(level)
    };

    let result = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if let Err(e) = result {
        eprintln!("warning: logging already initialised: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_levels() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" INFO "), Level::INFO);
        assert_eq!(parse_level("error"), Level::ERROR);
    }

    #[test]
    fn parse_unknown_level_falls_back() {
        assert_eq!(parse_level("loud"), Level::WARN);
        assert_eq!(parse_level(""), Level::WARN);
    }
}
