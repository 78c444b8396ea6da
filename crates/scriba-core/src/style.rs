//! Terminal styling with NO_COLOR support.
//!
//! The palette is named after what the front end shows rather than after
//! colors, so `output` never picks escape codes itself.

/// Check if color output is enabled (respects `NO_COLOR` env var).
pub fn color_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// The kinds of text the terminal front end writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// The `[scriba]` tag in front of status lines.
    Prefix,
    /// Transient status and the generating indicator.
    Status,
    /// The failure status of a submission.
    Failure,
    /// Section headings and speaker labels.
    Heading,
    /// A reference the answer cites.
    Cited,
    /// A reference the answer does not cite.
    Uncited,
}

impl Tone {
    fn code(self) -> &'static str {
        match self {
            Self::Prefix => "\x1b[2;36m",
            Self::Status | Self::Uncited => "\x1b[2m",
            Self::Failure => "\x1b[31m",
            Self::Heading => "\x1b[1m",
            Self::Cited => "\x1b[32m",
        }
    }
}

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy)]
pub struct Style {
    enabled: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}

impl Style {
    pub fn new() -> Self {
        Self::with_color(color_enabled())
    }

    pub fn with_color(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Wrap `text` in the escape codes for `tone`.
    pub fn paint(&self, tone: Tone, text: &str) -> String {
        if self.enabled {
            format!("{}{text}{RESET}", tone.code())
        } else {
            text.to_string()
        }
    }
}

/// Shorten `s` to at most `max` characters, ending in "..." when cut.
pub fn truncate_display(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let mut truncated: String = s.chars().take(max - 3).collect();
    truncated.push_str("...");
    truncated
}
