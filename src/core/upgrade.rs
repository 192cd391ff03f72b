//! Build-validated dependency upgrades.
//!
//! Every probe of the search writes a candidate version into the package manifest and runs
//! a full build, so the search is tuned to spend as few builds as possible. It assumes that
//! whether a version builds is roughly monotonic in the version order. When compatibility
//! oscillates (1.3 breaks, 1.4 works again) the search may settle on a lower version than
//! the highest working one. That is a known limitation of the heuristic.

use crate::core::semver::{parse_all, SemanticVersion};
use crate::domain::model::{PackageDependency, Service};
use crate::domain::ports::{DependencyInfo, DependencyWriter, ServiceBuilder};
use crate::utils::error::{Result, SapperError};
use std::io::{self, Write};

/// Outcome ledger of one dependency's upgrade attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionUpgradeSpec {
    pub previous: String,
    pub target: String,
    pub latest_available: String,
    pub latest_working: String,
}

impl VersionUpgradeSpec {
    pub fn upgrade_required(&self) -> bool {
        self.previous != self.latest_available
    }

    pub fn upgrade_to_latest_successful(&self) -> bool {
        self.latest_working == self.latest_available
    }

    pub fn upgrade_to_target_successful(&self) -> bool {
        self.latest_working == self.target
    }

    pub fn upgrade_partially_failed(&self) -> bool {
        self.upgrade_required()
            && !self.upgrade_to_latest_successful()
            && !self.upgrade_to_target_successful()
            && self.latest_working != self.previous
    }

    pub fn upgrade_completely_failed(&self) -> bool {
        self.upgrade_required() && self.latest_working == self.previous
    }

    /// One human readable line describing the outcome, without trailing newline.
    pub fn status_line(&self, dependency_id: &str) -> String {
        if !self.upgrade_required() {
            format!(
                "{} is already up to date. No upgrade required.",
                dependency_id
            )
        } else if self.upgrade_to_latest_successful() {
            format!(
                "upgrade from {} to {} succeeded. {} is now up to date.",
                self.previous, self.latest_available, dependency_id
            )
        } else if self.upgrade_to_target_successful() {
            format!(
                "upgrade from {} to {} succeeded. However, there is a newer version {} available.",
                self.previous, self.target, self.latest_available
            )
        } else if self.upgrade_partially_failed() {
            if self.target == self.latest_available {
                format!(
                    "upgrade from {} to {} failed => upgrade to latest working version {} instead",
                    self.previous, self.target, self.latest_working
                )
            } else {
                format!(
                    "upgrade from {} to {} failed => upgrade to latest working version {} instead. Note that there is an even newer version {} available.",
                    self.previous, self.target, self.latest_working, self.latest_available
                )
            }
        } else {
            format!(
                "upgrade from {} to {} failed => keeping version {}",
                self.previous, self.target, self.previous
            )
        }
    }

    pub fn print_status(&self, w: &mut dyn Write, dependency_id: &str) -> io::Result<()> {
        writeln!(w, "{}", self.status_line(dependency_id))
    }
}

/// State of the bisection over an ascending candidate list whose first entry is the
/// known-good previous version. It is never probed.
///
/// The probe starts at the highest candidate. A working probe becomes the best version and
/// only the candidates above it remain; a failing probe drops itself and everything above.
/// The next probe is the midpoint of what remains.
#[derive(Debug, Clone)]
pub struct Bisection {
    best: SemanticVersion,
    remaining: Vec<SemanticVersion>,
    probe: usize,
}

impl Bisection {
    /// `None` when there are no candidates at all.
    pub fn new(candidates: Vec<SemanticVersion>) -> Option<Self> {
        let mut candidates = candidates.into_iter();
        let best = candidates.next()?;
        let remaining: Vec<SemanticVersion> = candidates.collect();
        let probe = remaining.len().saturating_sub(1);
        Some(Self {
            best,
            remaining,
            probe,
        })
    }

    /// The version to test next, `None` once the search is over.
    pub fn next_probe(&self) -> Option<&SemanticVersion> {
        self.remaining.get(self.probe)
    }

    /// Records the oracle's verdict on the version returned by [`Bisection::next_probe`].
    pub fn record(&mut self, working: bool) {
        let i = self.probe;
        if i >= self.remaining.len() {
            return;
        }
        if working {
            self.best = self.remaining[i].clone();
            self.remaining.drain(..=i);
        } else {
            self.remaining.truncate(i);
        }
        self.probe = self.remaining.len() / 2;
    }

    pub fn best(&self) -> &SemanticVersion {
        &self.best
    }

    pub fn into_best(self) -> SemanticVersion {
        self.best
    }
}

/// Synchronous driver of [`Bisection`].
pub fn find_latest_working_version<F>(
    candidates: Vec<SemanticVersion>,
    mut is_working: F,
) -> Option<SemanticVersion>
where
    F: FnMut(&SemanticVersion) -> bool,
{
    let mut bisection = Bisection::new(candidates)?;
    while let Some(probe) = bisection.next_probe() {
        let working = is_working(probe);
        bisection.record(working);
    }
    Some(bisection.into_best())
}

/// Upgrades single dependencies of a service using a real build as the oracle.
pub struct DependencyUpgrader<'a> {
    pub dependency_info: &'a dyn DependencyInfo,
    pub writer: &'a dyn DependencyWriter,
    pub builder: &'a dyn ServiceBuilder,
}

impl<'a> DependencyUpgrader<'a> {
    pub fn new(
        dependency_info: &'a dyn DependencyInfo,
        writer: &'a dyn DependencyWriter,
        builder: &'a dyn ServiceBuilder,
    ) -> Self {
        Self {
            dependency_info,
            writer,
            builder,
        }
    }

    /// Finds the highest version of `dependency` the service still builds with and declares
    /// it. The declaration is always rewritten at the end, restoring the previous version when
    /// nothing newer works.
    pub async fn upgrade_dependency(
        &self,
        service: &Service,
        dependency: &PackageDependency,
        keep_major_version: bool,
    ) -> Result<VersionUpgradeSpec> {
        let available = self
            .dependency_info
            .available_versions(&dependency.id)
            .await?;
        let Some(last_available) = available.last() else {
            return Err(SapperError::NoVersionsFound {
                dependency: dependency.id.clone(),
            });
        };

        let mut spec = VersionUpgradeSpec {
            previous: dependency.version.clone(),
            latest_working: dependency.version.clone(),
            ..Default::default()
        };

        let parsed = SemanticVersion::parse(&dependency.version)
            .and_then(|current| parse_all(&available).map(|versions| (current, versions)));

        match parsed {
            Ok((current, mut versions)) => {
                versions.sort();
                if let Some(max) = versions.last() {
                    spec.latest_available = max.to_string();
                }

                let mut candidates: Vec<SemanticVersion> = versions
                    .into_iter()
                    .filter(|v| *v > current)
                    .filter(|v| !keep_major_version || v.major == current.major)
                    .collect();
                candidates.dedup();
                candidates.insert(0, current.clone());

                if candidates.len() == 1 {
                    tracing::debug!(
                        "{}: {} is the highest version allowed, no search required",
                        dependency.id,
                        dependency.version
                    );
                    spec.target = spec.previous.clone();
                } else {
                    spec.target = candidates[candidates.len() - 1].to_string();
                    if let Some(best) = self.search(service, dependency, candidates).await {
                        if best != current {
                            spec.latest_working = best.to_string();
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "{} => simply trying to upgrade {} to the latest version {}",
                    e,
                    dependency.id,
                    last_available
                );
                spec.latest_available = last_available.clone();
                spec.target = last_available.clone();
                if spec.target != spec.previous
                    && self.try_version(service, &dependency.id, &spec.target).await
                {
                    spec.latest_working = spec.target.clone();
                }
            }
        }

        self.writer
            .write(service, &dependency.id, &spec.latest_working)?;
        Ok(spec)
    }

    async fn search(
        &self,
        service: &Service,
        dependency: &PackageDependency,
        candidates: Vec<SemanticVersion>,
    ) -> Option<SemanticVersion> {
        let mut bisection = Bisection::new(candidates)?;
        while let Some(probe) = bisection.next_probe().map(|v| v.to_string()) {
            let working = self.try_version(service, &dependency.id, &probe).await;
            bisection.record(working);
        }
        Some(bisection.into_best())
    }

    /// Declares `version` and builds. Any failure, including a failed write, counts as "does
    /// not work".
    async fn try_version(&self, service: &Service, dependency_id: &str, version: &str) -> bool {
        tracing::info!("{}: trying to upgrade to {}", dependency_id, version);
        if let Err(e) = self.writer.write(service, dependency_id, version) {
            tracing::warn!("{}: unable to declare {}: {}", dependency_id, version, e);
            return false;
        }
        let mut output = Vec::new();
        match self.builder.build(service, &mut output).await {
            Ok(()) => {
                tracing::debug!("{}: {} builds", dependency_id, version);
                true
            }
            Err(e) => {
                tracing::debug!(
                    "{}: {} does not build ({}): {}",
                    dependency_id,
                    version,
                    e,
                    String::from_utf8_lossy(&output)
                );
                false
            }
        }
    }
}
