//! Ordering of free-form version strings.
//!
//! Mod file names carry versions like `1.20.1-forge-47.2.0`, `v3`, or
//! `2.0.0+build.5`, none of which are reliably semver. Versions are split on
//! runs of non-alphanumeric characters and compared token by token:
//!
//! - two numeric tokens compare by numeric value (`10 > 9`)
//! - anything else compares lexicographically (`beta > alpha`, `9 > 10a`)
//! - a missing token is the empty string, which sorts before any real token
//!
//! ```rust
//! use modsync_cli::version::VersionComparator;
//! use std::cmp::Ordering;
//!
//! assert_eq!(VersionComparator::compare("1.10.0", "1.9.2"), Ordering::Greater);
//! assert_eq!(VersionComparator::compare("2.0", "2.0.1"), Ordering::Less);
//! ```

use std::cmp::Ordering;

pub struct VersionComparator;

impl VersionComparator {
    /// Compare two version strings.
    #[must_use]
    pub fn compare(a: &str, b: &str) -> Ordering {
        let left = Self::tokenize(a);
        let right = Self::tokenize(b);
        let len = left.len().max(right.len());

        for i in 0..len {
            let x = left.get(i).copied().unwrap_or("");
            let y = right.get(i).copied().unwrap_or("");
            let ordering = Self::compare_tokens(x, y);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    fn tokenize(version: &str) -> Vec<&str> {
        version.split(|c: char| !c.is_ascii_alphanumeric()).filter(|t| !t.is_empty()).collect()
    }

    fn is_numeric(token: &str) -> bool {
        !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
    }

    fn compare_tokens(x: &str, y: &str) -> Ordering {
        if Self::is_numeric(x) && Self::is_numeric(y) {
            // Arbitrary-length numeric compare without parsing
            let x = x.trim_start_matches('0');
            let y = y.trim_start_matches('0');
            x.len().cmp(&y.len()).then_with(|| x.cmp(y))
        } else {
            x.cmp(y)
        }
    }
}
