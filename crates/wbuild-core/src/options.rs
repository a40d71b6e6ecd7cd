use std::fmt;

use serde::Serialize;

/// Bracket, brace and inline-command nesting allowed before parsing or
/// rendering gives up with [`crate::ParseError::NestingTooDeep`].
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseOptions {
    pub max_depth: usize,
    /// Fail with `DuplicateUid` instead of letting the first match win.
    pub reject_duplicate_uids: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            reject_duplicate_uids: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HtmlEmitOptions {
    /// Written to `data-theme` on every container and code block.
    pub theme: ThemeMode,
    pub max_depth: usize,
}

impl Default for HtmlEmitOptions {
    fn default() -> Self {
        Self {
            theme: ThemeMode::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
