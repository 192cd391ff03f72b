use crate::utils::error::{Result, SapperError};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static SEMVER_EXP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\D+)?(\d+)\.(\d+)\.(\d+)(\D+)?$").expect("semantic version pattern is valid")
});

/// `<prefix><major>.<minor>.<patch><suffix>`.
///
/// Ordering looks at major, minor, patch and then the suffix (lexicographically). The prefix
/// is carried for rendering only, so `v1.2.3` and `1.2.3` compare equal.
#[derive(Debug, Clone, Default)]
pub struct SemanticVersion {
    pub prefix: String,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub suffix: String,
}

impl SemanticVersion {
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || SapperError::VersionParseError {
            input: s.to_string(),
        };
        let caps = SEMVER_EXP.captures(s).ok_or_else(invalid)?;
        let number = |i: usize| caps[i].parse::<u32>().map_err(|_| invalid());

        Ok(Self {
            prefix: caps.get(1).map_or("", |m| m.as_str()).to_string(),
            major: number(2)?,
            minor: number(3)?,
            patch: number(4)?,
            suffix: caps.get(5).map_or("", |m| m.as_str()).to_string(),
        })
    }

    fn ordering_key(&self) -> (u32, u32, u32, &str) {
        (self.major, self.minor, self.patch, &self.suffix)
    }
}

/// Parses every string, failing on the first one that is not a semantic version.
pub fn parse_all(versions: &[String]) -> Result<Vec<SemanticVersion>> {
    versions.iter().map(|v| SemanticVersion::parse(v)).collect()
}

impl FromStr for SemanticVersion {
    type Err = SapperError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}.{}.{}{}",
            self.prefix, self.major, self.minor, self.patch, self.suffix
        )
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.ordering_key() == other.ordering_key()
    }
}

impl Eq for SemanticVersion {}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordering_key().cmp(&other.ordering_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn semver(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    #[test]
    fn test_display() {
        let simple = SemanticVersion {
            major: 1,
            minor: 2,
            patch: 3,
            ..Default::default()
        };
        assert_eq!(simple.to_string(), "1.2.3");

        let with_suffix = SemanticVersion {
            suffix: "suffix".to_string(),
            ..simple.clone()
        };
        assert_eq!(with_suffix.to_string(), "1.2.3suffix");

        let with_prefix = SemanticVersion {
            prefix: "prefix".to_string(),
            ..simple
        };
        assert_eq!(with_prefix.to_string(), "prefix1.2.3");
    }

    #[test]
    fn test_parse_full_blown() {
        let v = semver("prefix1.2.3suffix");
        assert_eq!(v.prefix, "prefix");
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
        assert_eq!(v.suffix, "suffix");
    }

    #[test]
    fn test_parse_large_version() {
        let v = semver("123.456.789");
        assert_eq!((v.major, v.minor, v.patch), (123, 456, 789));
        assert!(v.prefix.is_empty());
        assert!(v.suffix.is_empty());
    }

    #[test]
    fn test_parse_rejects_incomplete_versions() {
        assert!(SemanticVersion::parse("123.456").is_err());
        assert!(SemanticVersion::parse("123.4S6.789").is_err());
        assert!(SemanticVersion::parse("").is_err());
        assert!(SemanticVersion::parse("latest").is_err());
    }

    #[test]
    fn test_round_trip() {
        for s in ["1.2.3", "v0.10.2", "2.0.0-rc", "release-4.5.6-beta", "10.20.30"] {
            assert_eq!(semver(s).to_string(), s);
        }
    }

    #[test]
    fn test_ordering() {
        assert!(semver("1.2.3") < semver("1.2.4"));
        assert!(semver("1.2.9") < semver("1.3.0"));
        assert!(semver("1.9.9") < semver("2.0.0"));
        assert!(semver("1.2.3") < semver("1.2.3b"));
        assert!(semver("1.2.3a") < semver("1.2.3b"));
        assert!(semver("1.2.10") > semver("1.2.9"));
    }

    #[test]
    fn test_ordering_ignores_prefix() {
        assert_eq!(semver("v1.2.3"), semver("1.2.3"));
        assert!(semver("z1.2.3") < semver("a1.2.4"));
    }

    #[test]
    fn test_sort_ascending() {
        let mut versions = parse_all(&[
            "1.2.4".to_string(),
            "0.1.1".to_string(),
            "1.2.3".to_string(),
            "1.10.0".to_string(),
        ])
        .unwrap();
        versions.sort();
        let rendered: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(rendered, vec!["0.1.1", "1.2.3", "1.2.4", "1.10.0"]);
    }

    #[test]
    fn test_parse_all_fails_on_invalid_entry() {
        let versions = vec![
            "1.2.3".to_string(),
            "1.invalid.4".to_string(),
            "0.1.1".to_string(),
        ];
        assert!(parse_all(&versions).is_err());
    }
}
