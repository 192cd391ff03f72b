//! Package layer backed by conan: `conanfile.txt` manifests and `conan search` for the
//! registry view.

use crate::domain::model::{Brick, PackageDependency, Service};
use crate::domain::ports::{DependencyInfo, DependencyReader, DependencyWriter, SectionPredicate};
use crate::utils::error::{Result, SapperError};
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tokio::process::Command;

pub const CONANFILE: &str = "conanfile.txt";

static REFERENCE_EXP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^@/#\s]+)/([^@/#\s]+)(@([^@/#\s]+)/([^@/#\s]+))?(#([0-9a-fA-F]+))?")
        .expect("conan reference pattern is valid")
});
static HEADER_EXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*)\]").expect("section header pattern is valid"));
static COMMENT_EXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#").expect("comment pattern is valid"));

/// `lib/version[@user/channel][#revision]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConanReference {
    pub id: String,
    pub version: String,
    pub user: String,
    pub channel: String,
    pub revision: String,
}

impl ConanReference {
    /// Finds the first reference anywhere in `input`.
    pub fn parse(input: &str) -> Option<Self> {
        let caps = REFERENCE_EXP.captures(input)?;
        let group = |i: usize| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default();
        Some(Self {
            id: group(1),
            version: group(2),
            user: group(4),
            channel: group(5),
            revision: group(7),
        })
    }

    /// Rewrites the reference inside `line`, keeping everything around it.
    pub fn replace_in(&self, line: &str) -> String {
        REFERENCE_EXP
            .replace(line, regex::NoExpand(&self.to_string()))
            .into_owned()
    }
}

impl fmt::Display for ConanReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.version)?;
        if !self.user.is_empty() || !self.channel.is_empty() {
            let user = if self.user.is_empty() { "_" } else { &self.user };
            let channel = if self.channel.is_empty() { "_" } else { &self.channel };
            write!(f, "@{}/{}", user, channel)?;
        }
        if !self.revision.is_empty() {
            write!(f, "#{}", self.revision)?;
        }
        Ok(())
    }
}

/// Selects the `[requires]` section of a conanfile. Comment lines (`#` at the start) are
/// never selected and do not change the state.
pub fn is_in_requires_section(line: &str, state: &str) -> (bool, String) {
    if COMMENT_EXP.is_match(line) {
        return (false, state.to_string());
    }
    match HEADER_EXP.captures(line) {
        Some(caps) => {
            let section = caps[1].to_string();
            (section == "requires", section)
        }
        None => (state == "requires", state.to_string()),
    }
}

/// Feeds each line through `predicate` and hands it to `op` together with the verdict.
fn process_lines<F>(content: &str, predicate: SectionPredicate, mut op: F)
where
    F: FnMut(&str, bool),
{
    let mut state = String::new();
    for line in content.lines() {
        let (active, next) = predicate(line, &state);
        state = next;
        op(line, active);
    }
}

fn read_dependencies(dir: &Path, predicate: SectionPredicate) -> Result<Vec<PackageDependency>> {
    let content = fs::read_to_string(dir.join(CONANFILE))?;
    let mut dependencies = Vec::new();
    process_lines(&content, predicate, |line, active| {
        if !active {
            return;
        }
        if let Some(reference) = ConanReference::parse(line) {
            dependencies.push(PackageDependency {
                id: reference.id,
                version: reference.version,
            });
        }
    });
    Ok(dependencies)
}

/// Sets the versions of `updates` in the conanfile under `dir`. Returns how many lines were
/// rewritten per dependency id, in the order of `updates`.
fn write_dependencies(
    dir: &Path,
    updates: &[PackageDependency],
    predicate: SectionPredicate,
) -> Result<Vec<usize>> {
    let path = dir.join(CONANFILE);
    let content = fs::read_to_string(&path)?;
    let mut counts = vec![0usize; updates.len()];
    let mut output = String::with_capacity(content.len());

    process_lines(&content, predicate, |line, active| {
        let mut line = line.to_string();
        if active {
            if let Some(mut reference) = ConanReference::parse(&line) {
                if let Some(i) = updates.iter().position(|u| u.id == reference.id) {
                    reference.version = updates[i].version.clone();
                    line = reference.replace_in(&line);
                    counts[i] += 1;
                }
            }
        }
        output.push_str(&line);
        output.push('\n');
    });

    fs::write(&path, output)?;
    Ok(counts)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConanDependencyManager;

impl DependencyReader for ConanDependencyManager {
    fn read_from_service(&self, service: &Service) -> Result<Vec<PackageDependency>> {
        read_dependencies(&service.path, is_in_requires_section)
    }

    fn read_from_brick(
        &self,
        brick: &Brick,
        predicate: SectionPredicate,
    ) -> Result<Vec<PackageDependency>> {
        read_dependencies(&brick.base_path, predicate)
    }
}

impl DependencyWriter for ConanDependencyManager {
    /// Exactly one declaration must match; otherwise the file is left untouched.
    fn write(&self, service: &Service, dependency: &str, version: &str) -> Result<()> {
        let path = service.path.join(CONANFILE);
        let original = fs::read_to_string(&path)?;
        let update = PackageDependency {
            id: dependency.to_string(),
            version: version.to_string(),
        };
        let counts = write_dependencies(&service.path, &[update], is_in_requires_section)?;
        if counts[0] != 1 {
            fs::write(&path, original)?;
            return Err(SapperError::DependencyWriteError {
                dependency: dependency.to_string(),
                version: version.to_string(),
            });
        }
        tracing::debug!("{}: declared version {}", dependency, version);
        Ok(())
    }

    fn write_to_brick(
        &self,
        brick: &Brick,
        dependencies: &[PackageDependency],
        predicate: SectionPredicate,
    ) -> Result<()> {
        if dependencies.is_empty() {
            return Ok(());
        }
        let counts = write_dependencies(&brick.base_path, dependencies, predicate)?;
        for (dependency, count) in dependencies.iter().zip(counts) {
            if count == 0 {
                tracing::warn!(
                    "{}: no declaration found in brick {}",
                    dependency.id,
                    brick.id
                );
            }
        }
        Ok(())
    }
}

/// Versions of `dependency` listed in `conan search` output, in output order.
pub fn parse_search_output(output: &str, dependency: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(ConanReference::parse)
        .filter(|r| r.id == dependency)
        .map(|r| r.version)
        .collect()
}

#[async_trait]
impl DependencyInfo for ConanDependencyManager {
    async fn available_versions(&self, dependency: &str) -> Result<Vec<String>> {
        let output = Command::new("conan")
            .arg("search")
            .arg("-r=all")
            .arg(dependency)
            .output()
            .await?;
        let versions = parse_search_output(&String::from_utf8_lossy(&output.stdout), dependency);
        if !output.status.success() {
            return Err(SapperError::ProcessFailed {
                command: format!("conan search -r=all {}", dependency),
                status: output.status.to_string(),
            });
        }
        tracing::debug!("{}: {} version(s) available", dependency, versions.len());
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONANFILE_CONTENT: &str = "[requires]\nfmt/8.0.1\n# spdlog/1.0.0\nboost/1.71.0@conan/stable#abc123\n\n[generators]\ncmake\nfmt/1.0.0\n";

    fn service_in(dir: &TempDir) -> Service {
        Service {
            path: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_reference() {
        let r = ConanReference::parse("boost/1.71.0@conan/stable#abc123").unwrap();
        assert_eq!(r.id, "boost");
        assert_eq!(r.version, "1.71.0");
        assert_eq!(r.user, "conan");
        assert_eq!(r.channel, "stable");
        assert_eq!(r.revision, "abc123");

        let r = ConanReference::parse("  fmt/8.0.1 ").unwrap();
        assert_eq!((r.id.as_str(), r.version.as_str()), ("fmt", "8.0.1"));
        assert!(ConanReference::parse("cmake").is_none());
    }

    #[test]
    fn test_reference_display() {
        let mut r = ConanReference::parse("fmt/8.0.1").unwrap();
        assert_eq!(r.to_string(), "fmt/8.0.1");
        r.user = "me".to_string();
        assert_eq!(r.to_string(), "fmt/8.0.1@me/_");
        r.revision = "ff".to_string();
        assert_eq!(r.to_string(), "fmt/8.0.1@me/_#ff");
    }

    #[test]
    fn test_replace_keeps_surrounding_text() {
        let mut r = ConanReference::parse("  fmt/8.0.1 # pinned").unwrap();
        r.version = "9.0.0".to_string();
        assert_eq!(r.replace_in("  fmt/8.0.1 # pinned"), "  fmt/9.0.0 # pinned");
    }

    #[test]
    fn test_requires_predicate() {
        let mut state = String::new();
        let mut active = Vec::new();
        for line in CONANFILE_CONTENT.lines() {
            let (is_active, next) = is_in_requires_section(line, &state);
            state = next;
            active.push(is_active);
        }
        assert_eq!(
            active,
            vec![true, true, false, true, true, false, false, false]
        );
    }

    #[test]
    fn test_read_from_service() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONANFILE), CONANFILE_CONTENT).unwrap();

        let deps = ConanDependencyManager
            .read_from_service(&service_in(&dir))
            .unwrap();
        let ids: Vec<_> = deps.iter().map(|d| (d.id.as_str(), d.version.as_str())).collect();
        assert_eq!(ids, vec![("fmt", "8.0.1"), ("boost", "1.71.0")]);
    }

    #[test]
    fn test_read_missing_conanfile_fails() {
        let dir = TempDir::new().unwrap();
        assert!(ConanDependencyManager
            .read_from_service(&service_in(&dir))
            .is_err());
    }

    #[test]
    fn test_write_replaces_exactly_one_reference() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONANFILE), CONANFILE_CONTENT).unwrap();

        ConanDependencyManager
            .write(&service_in(&dir), "boost", "1.80.0")
            .unwrap();

        let written = fs::read_to_string(dir.path().join(CONANFILE)).unwrap();
        assert!(written.contains("boost/1.80.0@conan/stable#abc123"));
        // outside [requires] nothing changes
        assert!(written.contains("[generators]\ncmake\nfmt/1.0.0\n"));
    }

    #[test]
    fn test_write_unknown_dependency_fails_and_keeps_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONANFILE), CONANFILE_CONTENT).unwrap();

        let err = ConanDependencyManager
            .write(&service_in(&dir), "spdlog", "1.1.0")
            .unwrap_err();
        assert_eq!(err.to_string(), "unable to set version 1.1.0 of package spdlog");
        assert_eq!(
            fs::read_to_string(dir.path().join(CONANFILE)).unwrap(),
            CONANFILE_CONTENT
        );
    }

    #[test]
    fn test_write_to_brick_uses_predicate() {
        fn everything(_line: &str, state: &str) -> (bool, String) {
            (true, state.to_string())
        }

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONANFILE), "fmt/8.0.1\ngtest/1.10.0\n").unwrap();
        let brick = Brick {
            id: "b".to_string(),
            base_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let updates = vec![PackageDependency {
            id: "gtest".to_string(),
            version: "1.11.0".to_string(),
        }];

        ConanDependencyManager
            .write_to_brick(&brick, &updates, everything)
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join(CONANFILE)).unwrap(),
            "fmt/8.0.1\ngtest/1.11.0\n"
        );
        let read = ConanDependencyManager
            .read_from_brick(&brick, everything)
            .unwrap();
        assert_eq!(read.len(), 2);
    }

    #[test]
    fn test_parse_search_output() {
        let output = "Remote 'conancenter':\nfmt/7.1.3\nfmt/8.0.1\nfmtlog/1.0.0\nspdlog/1.9.2\n";
        assert_eq!(parse_search_output(output, "fmt"), vec!["7.1.3", "8.0.1"]);
        assert!(parse_search_output("There are no packages", "fmt").is_empty());
    }
}
