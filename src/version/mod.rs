//! Version resolution for manifest entries.
//!
//! A server may publish several builds of the same mod side by side
//! (`mods/jei-15.2.0.jar`, `mods/jei-15.3.1.jar`). Entries are grouped by
//! their *stem*, the path with the trailing version token removed, and
//! exactly one entry per stem is chosen as canonical: the one with the
//! greatest version under [`VersionComparator`], ties broken by the
//! lexicographically smallest path.
//!
//! # Stem extraction
//!
//! For `mods/JEI-1.20.1-forge-15.2.0.jar.disabled`:
//!
//! 1. the inactive suffix and the extension are removed from the
//!    lower-cased basename: `jei-1.20.1-forge-15.2.0`
//! 2. the trailing token matching `[-_.]v?<digit>[\w.+-]*` is split off:
//!    name `jei`, version `1.20.1-forge-15.2.0`
//! 3. the lower-cased directory is kept: stem `mods/jei`
//!
//! `.jar` is the only extension dropped from the stem. Any other extension
//! is put back after the version is split off, so `config/a.json` and
//! `config/a.toml` stay distinct while `packs/foo-1.0.zip` and
//! `packs/foo-2.0.zip` share the stem `packs/foo.zip`.
//!
//! ```rust
//! use modsync_cli::version::ParsedName;
//!
//! let parsed = ParsedName::parse("mods/JEI-1.20.1-forge-15.2.0.jar");
//! assert_eq!(parsed.stem, "mods/jei");
//! assert_eq!(parsed.version.as_deref(), Some("1.20.1-forge-15.2.0"));
//! ```

pub mod comparison;

pub use comparison::VersionComparator;

use crate::manifest::FileEntry;
use crate::tree;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::OnceLock;

fn version_tail() -> Option<&'static Regex> {
    static VERSION_TAIL: OnceLock<Option<Regex>> = OnceLock::new();
    VERSION_TAIL.get_or_init(|| Regex::new(r"(?i)[-_.]v?\d[\w.+-]*$").ok()).as_ref()
}

/// A path split into its version-independent stem and optional version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub stem: String,
    pub version: Option<String>,
}

impl ParsedName {
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let (dir, base) = match path.rsplit_once('/') {
            Some((dir, base)) => (Some(dir), base),
            None => (None, path),
        };

        let (logical, _) = tree::decode(base);
        let lowered = logical.to_lowercase();
        let (name, extension) = split_extension(&lowered);

        let (name, version) = match version_tail().and_then(|re| re.find(name)) {
            Some(m) if m.start() > 0 => {
                let token = &name[m.start() + 1..];
                let token = token.strip_prefix(['v', 'V']).unwrap_or(token);
                (&name[..m.start()], Some(token.to_string()))
            }
            _ => (name, None),
        };

        let name = match extension {
            Some(ext) if ext != "jar" => format!("{name}.{ext}"),
            _ => name.to_string(),
        };
        let stem = match dir {
            Some(dir) => format!("{}/{name}", dir.to_lowercase()),
            None => name,
        };

        Self {
            stem,
            version,
        }
    }
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((head, ext))
            if !head.is_empty() && !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphabetic()) =>
        {
            (head, Some(ext))
        }
        _ => (name, None),
    }
}

/// Stem of a manifest or local path.
#[must_use]
pub fn stem(path: &str) -> String {
    ParsedName::parse(path).stem
}

/// Order two paths sharing a stem; `Greater` means `a` is preferred.
#[must_use]
pub fn canonical_order(a: &str, b: &str) -> Ordering {
    let va = ParsedName::parse(a).version.unwrap_or_default();
    let vb = ParsedName::parse(b).version.unwrap_or_default();
    VersionComparator::compare(&va, &vb).then_with(|| b.cmp(a))
}

/// Select one canonical entry per stem.
///
/// The result only depends on the set of entries, not their order.
pub fn resolve<'a, I>(entries: I) -> BTreeMap<String, &'a FileEntry>
where
    I: IntoIterator<Item = &'a FileEntry>,
{
    let mut groups: BTreeMap<String, &'a FileEntry> = BTreeMap::new();

    for entry in entries {
        match groups.entry(stem(&entry.path)) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(mut slot) => {
                if canonical_order(&entry.path, &slot.get().path) == Ordering::Greater {
                    tracing::debug!(
                        "{} supersedes {} for stem {}",
                        entry.path,
                        slot.get().path,
                        slot.key()
                    );
                    slot.insert(entry);
                }
            }
        }
    }

    groups
}
