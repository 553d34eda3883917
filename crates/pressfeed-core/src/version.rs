// SPDX-FileCopyrightText: 2026 Pressfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Version string normalization and ordering.
//!
//! Installed plugins and themes declare versions loosely (`v2.0`, `1.2.3.4`,
//! `1.0-beta1`). [`VersionParser`] turns those into [`Version`] values that
//! order by semantic-version precedence: numeric components first, then a
//! release sorts above any of its pre-releases, then pre-release identifiers
//! compare the way the `semver` crate defines. Build metadata is kept but
//! ignored for ordering and equality.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease};

use crate::error::FeedError;

/// Maximum number of dot-separated numeric components (`1.2.3.4`).
const MAX_COMPONENTS: usize = 4;

/// A parsed, totally ordered package version.
#[derive(Debug, Clone)]
pub struct Version {
    numbers: [u64; MAX_COMPONENTS],
    pre: Prerelease,
    build: BuildMetadata,
}

impl Version {
    /// Creates a release version from three numeric components.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            numbers: [major, minor, patch, 0],
            pre: Prerelease::EMPTY,
            build: BuildMetadata::EMPTY,
        }
    }

    pub fn major(&self) -> u64 {
        self.numbers[0]
    }

    pub fn minor(&self) -> u64 {
        self.numbers[1]
    }

    pub fn patch(&self) -> u64 {
        self.numbers[2]
    }

    /// Returns the pre-release tag, empty for releases.
    pub fn pre(&self) -> &str {
        self.pre.as_str()
    }

    /// Returns the build metadata, empty when none was given.
    pub fn build(&self) -> &str {
        self.build.as_str()
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Composer-style normalized form: always four numeric components.
    ///
    /// `v2.0-beta.1` becomes `2.0.0.0-beta.1`.
    pub fn normalized(&self) -> String {
        let [a, b, c, d] = self.numbers;
        let mut out = format!("{a}.{b}.{c}.{d}");
        if !self.pre.is_empty() {
            out.push('-');
            out.push_str(self.pre.as_str());
        }
        out
    }
}

/// Canonical form used in file names and download URLs: at least three
/// numeric components, the fourth only when non-zero, then the pre-release.
impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.numbers;
        write!(f, "{a}.{b}.{c}")?;
        if d != 0 {
            write!(f, ".{d}")?;
        }
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        Ok(())
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numbers.cmp(&other.numbers).then_with(|| {
            match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.numbers.hash(state);
        self.pre.as_str().hash(state);
    }
}

impl FromStr for Version {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionParser::new().parse(s)
    }
}

/// Parses loosely formatted version strings into [`Version`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionParser;

impl VersionParser {
    pub fn new() -> Self {
        Self
    }

    /// Parses a raw version string.
    ///
    /// Accepts an optional leading `v`/`V`, one to four numeric components,
    /// a pre-release suffix introduced by `-`, `_`, `.` or directly after the
    /// numbers, and `+build` metadata.
    pub fn parse(&self, raw: &str) -> Result<Version, FeedError> {
        let invalid = |reason: &str| FeedError::InvalidVersion {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty version string"));
        }

        let body = trimmed
            .strip_prefix(['v', 'V'])
            .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
            .unwrap_or(trimmed);

        let (body, build) = match body.split_once('+') {
            Some((body, build)) => (body, Some(build)),
            None => (body, None),
        };

        let numeric_end = body
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(body.len());
        let (numeric, suffix) = body.split_at(numeric_end);
        // `1.0.beta1`: the trailing dot separates the pre-release.
        let numeric = if suffix.is_empty() {
            numeric
        } else {
            numeric.strip_suffix('.').unwrap_or(numeric)
        };

        if numeric.is_empty() {
            return Err(invalid("missing numeric version"));
        }

        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.len() > MAX_COMPONENTS {
            return Err(invalid("more than four numeric components"));
        }

        let mut numbers = [0u64; MAX_COMPONENTS];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if part.is_empty() {
                return Err(invalid("empty numeric component"));
            }
            *slot = part
                .parse::<u64>()
                .map_err(|_| invalid("numeric component out of range"))?;
        }

        let pre = if suffix.is_empty() {
            Prerelease::EMPTY
        } else {
            let tag = suffix.strip_prefix(['-', '_', '.']).unwrap_or(suffix);
            if tag.is_empty() {
                return Err(invalid("empty pre-release tag"));
            }
            Prerelease::new(tag).map_err(|e| invalid(&format!("bad pre-release tag: {e}")))?
        };

        let build = match build {
            Some(meta) => BuildMetadata::new(meta)
                .map_err(|e| invalid(&format!("bad build metadata: {e}")))?,
            None => BuildMetadata::EMPTY,
        };

        Ok(Version {
            numbers,
            pre,
            build,
        })
    }

    /// Parses and returns the Composer four-component form.
    pub fn normalize(&self, raw: &str) -> Result<String, FeedError> {
        self.parse(raw).map(|v| v.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn v(raw: &str) -> Version {
        VersionParser::new().parse(raw).unwrap()
    }

    #[test]
    fn numeric_not_lexical_ordering() {
        assert!(v("1.2.0") < v("1.10.0"));
        assert!(v("1.9.9") < v("1.10"));
    }

    #[test]
    fn prerelease_sorts_between_neighbours() {
        let beta = v("v2.0.0-beta.1");
        assert!(beta < v("2.0.0"));
        assert!(beta > v("1.9.9"));
        assert!(beta.is_prerelease());
    }

    #[test]
    fn prerelease_identifiers_follow_semver_precedence() {
        assert!(v("1.0.0-alpha") < v("1.0.0-alpha.1"));
        assert!(v("1.0.0-alpha.1") < v("1.0.0-beta"));
        assert!(v("1.0.0-beta.2") < v("1.0.0-beta.11"));
        assert!(v("1.0.0-rc.1") < v("1.0.0"));
    }

    #[test]
    fn missing_components_are_zero() {
        assert_eq!(v("1.2"), v("1.2.0"));
        assert_eq!(v("3"), v("3.0.0.0"));
        assert_eq!(v("1.2").to_string(), "1.2.0");
    }

    #[test]
    fn four_component_versions() {
        let four = v("1.2.3.4");
        assert!(four > v("1.2.3"));
        assert!(four < v("1.2.4"));
        assert_eq!(four.to_string(), "1.2.3.4");
        assert_eq!(four.normalized(), "1.2.3.4");
    }

    #[test]
    fn loose_prerelease_suffixes() {
        assert_eq!(v("1.0-beta1").pre(), "beta1");
        assert_eq!(v("1.0beta1").pre(), "beta1");
        assert_eq!(v("1.0.0_rc1").pre(), "rc1");
        assert_eq!(v("1.0.beta1").pre(), "beta1");
    }

    #[test]
    fn build_metadata_ignored_for_ordering() {
        let with_build = v("1.0.0+20260101");
        assert_eq!(with_build, v("1.0.0"));
        assert_eq!(with_build.build(), "20260101");
        assert_eq!(with_build.to_string(), "1.0.0");
    }

    #[test]
    fn display_and_normalized_forms() {
        let beta = v("V2.0-beta.1");
        assert_eq!(beta.to_string(), "2.0.0-beta.1");
        assert_eq!(beta.normalized(), "2.0.0.0-beta.1");
        assert_eq!(
            VersionParser::new().normalize(" 1.5 ").unwrap(),
            "1.5.0.0"
        );
    }

    #[test]
    fn rejects_garbage() {
        let parser = VersionParser::new();
        for raw in ["", "   ", "dev-master", "v", "1..2", "1.2.3.4.5", "1.0-", "1.0.0-beta..1"] {
            let err = parser.parse(raw).expect_err(raw);
            assert!(matches!(err, FeedError::InvalidVersion { .. }), "{raw}: {err}");
        }
    }

    #[test]
    fn from_str_uses_parser() {
        let parsed: Version = "v1.4.2".parse().unwrap();
        assert_eq!(parsed, Version::new(1, 4, 2));
        assert_eq!(parsed.major(), 1);
        assert_eq!(parsed.minor(), 4);
        assert_eq!(parsed.patch(), 2);
    }

    proptest! {
        #[test]
        fn ordering_matches_numeric_tuples(
            a in (0u64..500, 0u64..500, 0u64..500),
            b in (0u64..500, 0u64..500, 0u64..500),
        ) {
            let va = v(&format!("{}.{}.{}", a.0, a.1, a.2));
            let vb = v(&format!("{}.{}.{}", b.0, b.1, b.2));
            prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
        }

        #[test]
        fn leading_v_is_insignificant(a in 0u64..1000, b in 0u64..1000, c in 0u64..1000) {
            let plain = format!("{a}.{b}.{c}");
            prop_assert_eq!(v(&plain), v(&format!("v{plain}")));
            prop_assert_eq!(v(&plain).to_string(), plain);
        }
    }
}
