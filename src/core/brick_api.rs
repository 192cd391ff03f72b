use crate::core::bricks::resolve_bricks;
use crate::core::composer::{
    add_single_brick, remove_present_bricks, resolve_parameter_slice,
    PlaceholderParameterResolver,
};
use crate::core::section::current_section;
use crate::core::service_api::ServiceApi;
use crate::core::upgrade::VersionUpgradeSpec;
use crate::domain::model::{Brick, BrickKind, PackageDependency, Service};
use crate::domain::ports::{DependencyReader, ParameterResolver};
use crate::utils::error::{Result, SapperError};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Tagged section holding the package dependencies a brick declares.
pub const DEPENDENCY_SECTION: &str = "CONAN-DEPENDENCIES";

pub fn is_in_dependency_section(line: &str, state: &str) -> (bool, String) {
    let section = current_section(line, state);
    (section == DEPENDENCY_SECTION, section)
}

/// Values already recorded in the service stand in for the declared defaults.
struct StoredParameters<'a> {
    stored: &'a BTreeMap<String, String>,
    resolver: &'a dyn ParameterResolver,
}

impl ParameterResolver for StoredParameters<'_> {
    fn resolve(&self, name: &str, default_value: &str) -> String {
        let default_value = self
            .stored
            .get(name)
            .map(String::as_str)
            .unwrap_or(default_value);
        self.resolver.resolve(name, default_value)
    }
}

pub struct BrickApi<'a> {
    pub service_api: ServiceApi<'a>,
    pub dependency_reader: &'a dyn DependencyReader,
}

impl<'a> BrickApi<'a> {
    pub fn new(service_api: ServiceApi<'a>, dependency_reader: &'a dyn DependencyReader) -> Self {
        Self {
            service_api,
            dependency_reader,
        }
    }

    /// Adds `brick_id` and whatever it depends on to the service at `service_path`. Bricks
    /// the service already has are skipped.
    pub fn add(
        &self,
        service_path: &Path,
        brick_id: &str,
        resolver: &dyn ParameterResolver,
    ) -> Result<Service> {
        let bricks = resolve_bricks(brick_id, self.service_api.db)?;
        let mut service = self.service_api.persistence.load(service_path)?;

        let bricks = remove_present_bricks(bricks, &service);
        if bricks.is_empty() {
            return Err(SapperError::BrickAlreadyAdded {
                brick_id: brick_id.to_string(),
            });
        }

        let stored = service.parameters.clone();
        let parameters = resolve_parameter_slice(
            &bricks,
            &StoredParameters {
                stored: &stored,
                resolver,
            },
        )?;

        for brick in &bricks {
            tracing::info!("Adding brick {} {} to {}", brick.id, brick.version, service.id);
            add_single_brick(&mut service, brick, &parameters)?;
        }

        self.service_api.persistence.save(&service)?;
        Ok(service)
    }

    pub fn list(&self) -> Vec<Brick> {
        self.service_api.db.bricks(BrickKind::Extension)
    }

    /// Extension bricks whose id or description contains `term`.
    pub fn search(&self, term: &str) -> Vec<Brick> {
        self.list()
            .into_iter()
            .filter(|b| b.id.contains(term) || b.description.contains(term))
            .collect()
    }

    /// Upgrades the package dependencies declared in the brick's dependency section. The
    /// brick is scaffolded into a throw-away service, which serves as the build oracle, and
    /// the working versions are written back into the brick.
    pub async fn upgrade(&self, brick_id: &str, out: &mut dyn Write) -> Result<()> {
        let brick = self.service_api.db.brick(brick_id)?;
        let dependencies = self
            .dependency_reader
            .read_from_brick(&brick, is_in_dependency_section)?;

        let mut scheduled: Vec<PackageDependency> = Vec::new();
        for dependency in dependencies {
            let latest = match self
                .service_api
                .dependency_info
                .available_versions(&dependency.id)
                .await
            {
                Ok(versions) => versions.last().cloned(),
                Err(e) => {
                    tracing::debug!("{}: {}", dependency.id, e);
                    None
                }
            };
            match latest {
                None => writeln!(out, "{}: unable to find any versions", dependency.id)?,
                Some(latest) if latest == dependency.version => writeln!(
                    out,
                    "{}: current version {} is already up to date. No upgrade required.",
                    dependency.id, dependency.version
                )?,
                Some(latest) => {
                    writeln!(
                        out,
                        "{}: scheduled for upgrade from {} to {}",
                        dependency.id, dependency.version, latest
                    )?;
                    scheduled.push(dependency);
                }
            }
        }
        if scheduled.is_empty() {
            writeln!(out, "all dependencies are up to date. Nothing to do.")?;
            return Ok(());
        }

        let parent = tempfile::Builder::new().prefix("sapper_upgrade_").tempdir()?;
        writeln!(out, "creating temp service...")?;
        let service = self
            .service_api
            .add(brick_id, parent.path(), &PlaceholderParameterResolver)?;
        writeln!(out, "building service...")?;
        self.service_api.build(&service.path).await?;

        let upgrader = self.service_api.upgrader();
        let mut outcomes: Vec<(String, VersionUpgradeSpec)> = Vec::new();
        let mut failed = 0;
        for dependency in &scheduled {
            match upgrader.upgrade_dependency(&service, dependency, false).await {
                Ok(spec) => outcomes.push((dependency.id.clone(), spec)),
                Err(e) => {
                    writeln!(out, "{}: upgrade failed ({})", dependency.id, e)?;
                    failed += 1;
                }
            }
        }

        let updates: Vec<PackageDependency> = outcomes
            .iter()
            .filter(|(_, spec)| spec.upgrade_required() && !spec.upgrade_completely_failed())
            .map(|(id, spec)| PackageDependency {
                id: id.clone(),
                version: spec.latest_working.clone(),
            })
            .collect();
        self.service_api
            .dependency_writer
            .write_to_brick(&brick, &updates, is_in_dependency_section)?;

        for (id, spec) in &outcomes {
            spec.print_status(out, id)?;
            if !spec.upgrade_to_target_successful() {
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(SapperError::UpgradeIncomplete {
                subject: brick_id.to_string(),
                failed,
                total: scheduled.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_section_predicate() {
        let lines = [
            "[requires]",
            "gtest/1.10.0",
            "# <<<SAPPER SECTION BEGIN CONAN-DEPENDENCIES>>>",
            "fmt/8.0.1",
            "# <<<SAPPER SECTION END CONAN-DEPENDENCIES>>>",
            "zlib/1.2.11",
        ];
        let mut state = String::new();
        let mut active = Vec::new();
        for line in lines {
            let (is_active, next) = is_in_dependency_section(line, &state);
            state = next;
            active.push(is_active);
        }
        assert_eq!(active, vec![false, false, true, true, false, false]);
    }

    struct Explicit(&'static str, &'static str);

    impl ParameterResolver for Explicit {
        fn resolve(&self, name: &str, default_value: &str) -> String {
            if name == self.0 {
                self.1.to_string()
            } else {
                default_value.to_string()
            }
        }
    }

    #[test]
    fn test_stored_parameters_replace_defaults() {
        let mut stored = BTreeMap::new();
        stored.insert("NAME".to_string(), "orders".to_string());
        stored.insert("PORT".to_string(), "80".to_string());
        let resolver = StoredParameters {
            stored: &stored,
            resolver: &Explicit("PORT", "9090"),
        };
        assert_eq!(resolver.resolve("NAME", ""), "orders");
        assert_eq!(resolver.resolve("PORT", "8080"), "9090");
        assert_eq!(resolver.resolve("LEVEL", "info"), "info");
    }
}
