use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
    str::FromStr,
    sync::LazyLock,
};

use regex_lite::Regex;
use thiserror::Error;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?(?P<major>\d+)\.(?P<minor>\d+)\.(?P<patch>\d+)(?:-(?P<pre>[\w.-]+))?(?:\+(?P<build>[\w.-]+))?$")
        .expect("version pattern is valid")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version format: {0}")]
    InvalidVersion(String),
    #[error("unsupported constraint: {0}")]
    UnsupportedConstraint(String),
}

/// A `MAJOR.MINOR.PATCH[-PRE][+BUILD]` version, optionally written with a
/// leading `v`.
///
/// Ordering compares the numeric components, then places a release after any
/// of its pre-releases. Two pre-release labels are compared as plain strings,
/// which is simpler than full semantic-versioning precedence (`alpha.10`
/// sorts before `alpha.9`). Build metadata never takes part in ordering or
/// equality.
#[derive(Debug, Clone)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<String>,
    pub build: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            pre: None,
            build: None,
        }
    }

    pub fn parse(s: &str) -> Result<Version, VersionError> {
        let invalid = || VersionError::InvalidVersion(s.to_owned());
        let captures = VERSION_RE.captures(s).ok_or_else(invalid)?;
        let number = |name: &str| -> Result<u64, VersionError> {
            captures
                .name(name)
                .ok_or_else(invalid)?
                .as_str()
                .parse()
                .map_err(|_| invalid())
        };

        Ok(Version {
            major: number("major")?,
            minor: number("minor")?,
            patch: number("patch")?,
            pre: captures.name("pre").map(|m| m.as_str().to_owned()),
            build: captures.name("build").map(|m| m.as_str().to_owned()),
        })
    }

    fn same_release(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor && self.patch == other.patch
    }

    pub fn satisfies(&self, constraint: &Constraint) -> bool {
        match constraint {
            Constraint::Any => true,
            Constraint::Exact(base) => self == base,
            Constraint::Caret(base) => self.satisfies_caret(base),
            Constraint::Tilde(base) => {
                self.major == base.major && self.minor == base.minor && self >= base
            }
        }
    }

    // The range is bounded by the first non-zero component from the left.
    // A pre-release of the exact base release is accepted.
    fn satisfies_caret(&self, base: &Version) -> bool {
        if base.major > 0 {
            self.major == base.major && (self.same_release(base) || self >= base)
        } else if base.minor > 0 {
            self.major == base.major
                && self.minor == base.minor
                && (self.patch == base.patch || self >= base)
        } else {
            self.same_release(base)
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
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

/// A version range expression as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `^1.2.3`
    Caret(Version),
    /// `~1.2.3`
    Tilde(Version),
    /// `1.2.3` or `=1.2.3`
    Exact(Version),
    /// The empty constraint.
    Any,
}

impl Constraint {
    pub fn parse(s: &str) -> Result<Constraint, VersionError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Constraint::Any);
        }

        let base = |rest: &str| {
            Version::parse(rest.trim()).map_err(|_| VersionError::UnsupportedConstraint(s.to_owned()))
        };

        if let Some(rest) = s.strip_prefix('^') {
            Ok(Constraint::Caret(base(rest)?))
        } else if let Some(rest) = s.strip_prefix('~') {
            Ok(Constraint::Tilde(base(rest)?))
        } else if let Some(rest) = s.strip_prefix('=') {
            Ok(Constraint::Exact(base(rest)?))
        } else if s.contains(['^', '~', '<', '>']) {
            Err(VersionError::UnsupportedConstraint(s.to_owned()))
        } else {
            Ok(Constraint::Exact(base(s)?))
        }
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Caret(v) => write!(f, "^{v}"),
            Constraint::Tilde(v) => write!(f, "~{v}"),
            Constraint::Exact(v) => write!(f, "={v}"),
            Constraint::Any => Ok(()),
        }
    }
}

impl FromStr for Constraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Constraint::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn c(s: &str) -> Constraint {
        Constraint::parse(s).unwrap()
    }

    #[test]
    fn parse_full_version() {
        let version = v("v1.2.3-rc.1+build.5");
        assert_eq!(version.major, 1);
        assert_eq!(version.minor, 2);
        assert_eq!(version.patch, 3);
        assert_eq!(version.pre.as_deref(), Some("rc.1"));
        assert_eq!(version.build.as_deref(), Some("build.5"));
        assert_eq!(version.to_string(), "1.2.3-rc.1+build.5");
    }

    #[test]
    fn parse_round_trips_without_prefix() {
        for s in ["0.0.1", "v10.20.30", "1.0.0-alpha", "v2.0.0+meta", "1.0.0-x-y.z+b.1"] {
            let parsed = v(s);
            let reparsed = v(&parsed.to_string());
            assert_eq!(parsed, reparsed);
            assert_eq!(parsed.pre, reparsed.pre);
        }
    }

    #[test]
    fn parse_rejects_malformed() {
        for s in ["", "1.2", "v1", "1.2.3.4", "1.2.x", "latest", "1.2.3-", "1.2.3+"] {
            assert_eq!(
                Version::parse(s),
                Err(VersionError::InvalidVersion(s.to_owned())),
                "{s}"
            );
        }
    }

    #[test]
    fn parse_rejects_overflowing_component() {
        assert!(Version::parse("99999999999999999999999.0.0").is_err());
    }

    #[test]
    fn ordering_is_numeric() {
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("2.0.0") > v("1.99.99"));
        assert!(v("0.0.10") > v("0.0.9"));
    }

    #[test]
    fn release_sorts_after_prerelease() {
        assert!(v("1.0.0") > v("1.0.0-rc.1"));
        assert!(v("1.0.0-beta") > v("1.0.0-alpha"));
        assert!(v("1.0.1-alpha") > v("1.0.0"));
    }

    #[test]
    fn ordering_is_antisymmetric_and_reflexive() {
        let versions = ["1.0.0", "1.0.0-a", "1.0.0-b", "0.9.9", "1.0.1", "v1.0.0+x"];
        for a in versions {
            assert_eq!(v(a).cmp(&v(a)), Ordering::Equal);
            for b in versions {
                assert_eq!(v(a).cmp(&v(b)), v(b).cmp(&v(a)).reverse(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn build_metadata_is_ignored() {
        assert_eq!(v("1.0.0+linux"), v("v1.0.0+darwin"));
        assert_eq!(v("1.0.0+linux").cmp(&v("1.0.0")), Ordering::Equal);
    }

    #[test]
    fn parse_constraints() {
        assert_eq!(c(""), Constraint::Any);
        assert_eq!(c("   "), Constraint::Any);
        assert_eq!(c("^1.2.3"), Constraint::Caret(Version::new(1, 2, 3)));
        assert_eq!(c("~v1.2.3"), Constraint::Tilde(Version::new(1, 2, 3)));
        assert_eq!(c("=1.2.3"), Constraint::Exact(Version::new(1, 2, 3)));
        assert_eq!(c(" 1.2.3 "), Constraint::Exact(Version::new(1, 2, 3)));
    }

    #[test]
    fn parse_unsupported_constraints() {
        for s in [">=1.0.0", "<2.0.0", "^1.2", "~", "*", "1.x", "^latest", "1.0.0 ^2.0.0"] {
            assert_eq!(
                Constraint::parse(s),
                Err(VersionError::UnsupportedConstraint(s.trim().to_owned())),
                "{s}"
            );
        }
    }

    #[test]
    fn any_accepts_everything() {
        assert!(v("0.0.0").satisfies(&Constraint::Any));
        assert!(v("9.9.9-pre").satisfies(&Constraint::Any));
    }

    #[test]
    fn every_version_satisfies_its_own_caret() {
        for s in ["0.0.0", "0.0.3", "0.2.3", "1.2.3", "1.2.3-rc.1", "0.0.1-alpha+b"] {
            let version = v(s);
            assert!(version.satisfies(&Constraint::Caret(version.clone())), "{s}");
        }
    }

    #[test]
    fn caret_major() {
        let constraint = c("^1.2.3");
        assert!(v("1.2.3").satisfies(&constraint));
        assert!(v("1.9.9").satisfies(&constraint));
        assert!(v("1.2.3-beta").satisfies(&constraint));
        assert!(!v("2.0.0").satisfies(&constraint));
        assert!(!v("1.2.2").satisfies(&constraint));
        assert!(!v("0.9.0").satisfies(&constraint));
    }

    #[test]
    fn caret_zero_major() {
        let constraint = c("^0.2.3");
        assert!(v("0.2.3").satisfies(&constraint));
        assert!(v("0.2.9").satisfies(&constraint));
        assert!(v("0.2.3-rc").satisfies(&constraint));
        assert!(!v("0.3.0").satisfies(&constraint));
        assert!(!v("0.1.9").satisfies(&constraint));
        assert!(!v("0.2.2").satisfies(&constraint));
    }

    #[test]
    fn caret_zero_zero_is_pinned() {
        let constraint = c("^0.0.3");
        assert!(v("0.0.3").satisfies(&constraint));
        assert!(!v("0.0.4").satisfies(&constraint));
        assert!(!v("0.0.2").satisfies(&constraint));
        assert!(!v("0.1.3").satisfies(&constraint));
    }

    #[test]
    fn caret_accepts_suffixed_releases() {
        let constraint = c("^5.8.0");
        assert!(v("5.8.0-stable").satisfies(&constraint));
        assert!(v("5.8.4-stable").satisfies(&constraint));
        assert!(v("5.9.0").satisfies(&constraint));
        assert!(!v("6.0.0").satisfies(&constraint));
    }

    #[test]
    fn tilde() {
        let constraint = c("~1.2.3");
        assert!(v("1.2.3").satisfies(&constraint));
        assert!(v("1.2.9").satisfies(&constraint));
        assert!(v("1.2.4-rc").satisfies(&constraint));
        assert!(!v("1.3.0").satisfies(&constraint));
        assert!(!v("1.1.9").satisfies(&constraint));
        assert!(!v("1.2.3-rc").satisfies(&constraint));
    }

    #[test]
    fn exact() {
        let constraint = c("=1.2.3");
        assert!(v("1.2.3").satisfies(&constraint));
        assert!(v("v1.2.3+meta").satisfies(&constraint));
        assert!(!v("1.2.4").satisfies(&constraint));
        assert!(!v("1.2.3-rc").satisfies(&constraint));
    }

    #[test]
    fn constraint_display() {
        assert_eq!(c("^v1.2.3").to_string(), "^1.2.3");
        assert_eq!(c("1.0.0").to_string(), "=1.0.0");
        assert_eq!(c("").to_string(), "");
    }
}
