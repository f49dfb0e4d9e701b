//! User-supplied ignore patterns.
//!
//! Patterns are globs matched case-sensitively against manifest-relative
//! paths. `*` stays within one path segment, `**` spans any number of
//! segments, and a pattern ending in `/` covers everything below that
//! directory. A local file is ignored when either its logical path or its
//! on-disk path matches, so `mods/*.jar` also protects `mods/x.jar.disabled`.

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    /// Compile `patterns`. Empty strings are skipped.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for raw in patterns {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            let expanded = if raw.ends_with('/') {
                format!("{raw}**")
            } else {
                raw.to_string()
            };
            let pattern = Pattern::new(&expanded)
                .with_context(|| format!("Invalid ignore pattern: {raw}"))?;
            compiled.push(pattern);
        }
        Ok(Self {
            patterns: compiled,
        })
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches_with(path, MATCH_OPTIONS))
    }

    /// Whether a local file is ignored, judged by its on-disk and logical paths.
    #[must_use]
    pub fn matches_local(&self, raw: &str, logical: &str) -> bool {
        self.matches(raw) || self.matches(logical)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Pattern sources as compiled.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::as_str)
    }
}
