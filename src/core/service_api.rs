use crate::core::bricks::resolve_bricks;
use crate::core::composer::{add_single_brick, resolve_parameter_slice, NAME_PARAMETER};
use crate::core::upgrade::DependencyUpgrader;
use crate::domain::model::{BrickDependency, Service};
use crate::domain::ports::{
    BrickDb, DependencyInfo, DependencyWriter, ParameterResolver, ServiceBuilder,
    ServicePersistence,
};
use crate::utils::error::{Result, SapperError};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Makefile targets a service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceTarget {
    Build,
    Test,
    Run,
    Deploy,
}

impl fmt::Display for ServiceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceTarget::Build => "build",
            ServiceTarget::Test => "test",
            ServiceTarget::Run => "run",
            ServiceTarget::Deploy => "deploy",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDescription {
    pub id: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newer_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescription {
    pub id: String,
    pub path: PathBuf,
    pub bricks: Vec<BrickDependency>,
    pub dependencies: Vec<DependencyDescription>,
}

impl fmt::Display for ServiceDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Id: {}", self.id)?;
        writeln!(f, "Path: {}", self.path.display())?;
        writeln!(f, "BrickIds:")?;
        for brick in &self.bricks {
            writeln!(f, "  - Id: {}", brick.id)?;
            writeln!(f, "    Version: {}", brick.version)?;
        }
        writeln!(f, "Dependencies:")?;
        for dependency in &self.dependencies {
            writeln!(f, "  - Id: {}", dependency.id)?;
            match &dependency.newer_version {
                Some(newer) => writeln!(
                    f,
                    "    Version: {} (newer version {} available)",
                    dependency.version, newer
                )?,
                None => writeln!(f, "    Version: {}", dependency.version)?,
            }
        }
        Ok(())
    }
}

/// Everything that can be done with a service. The collaborators are borrowed so the
/// same adapters can back several APIs.
#[derive(Clone, Copy)]
pub struct ServiceApi<'a> {
    pub db: &'a dyn BrickDb,
    pub persistence: &'a dyn ServicePersistence,
    pub builder: &'a dyn ServiceBuilder,
    pub dependency_info: &'a dyn DependencyInfo,
    pub dependency_writer: &'a dyn DependencyWriter,
}

impl<'a> ServiceApi<'a> {
    /// Creates a service below `parent_dir` from `template` and all bricks it depends on.
    /// The directory is named after the `NAME` parameter.
    pub fn add(
        &self,
        template: &str,
        parent_dir: &Path,
        resolver: &dyn ParameterResolver,
    ) -> Result<Service> {
        let bricks = resolve_bricks(template, self.db)?;
        let parameters = resolve_parameter_slice(&bricks, resolver)?;

        let name = parameters.get(NAME_PARAMETER).cloned().unwrap_or_default();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(SapperError::InvalidServiceName { name });
        }

        let path = parent_dir.join(&name);
        fs::create_dir_all(&path)?;
        let mut service = Service {
            id: name,
            path,
            ..Default::default()
        };

        for brick in &bricks {
            tracing::info!("Adding brick {} {}", brick.id, brick.version);
            add_single_brick(&mut service, brick, &parameters)?;
        }

        self.persistence.save(&service)?;
        tracing::info!(
            "Created service {} in {}",
            service.id,
            service.path.display()
        );
        Ok(service)
    }

    pub async fn describe_service(&self, path: &Path) -> Result<ServiceDescription> {
        let service = self.persistence.load(path)?;
        let mut dependencies = Vec::with_capacity(service.dependencies.len());
        for dependency in &service.dependencies {
            let newer_version = match self.dependency_info.available_versions(&dependency.id).await
            {
                Ok(versions) => versions
                    .last()
                    .filter(|latest| **latest != dependency.version)
                    .cloned(),
                Err(e) => {
                    tracing::debug!("No version information for {}: {}", dependency.id, e);
                    None
                }
            };
            dependencies.push(DependencyDescription {
                id: dependency.id.clone(),
                version: dependency.version.clone(),
                newer_version,
            });
        }

        Ok(ServiceDescription {
            id: service.id,
            path: service.path,
            bricks: service.brick_ids,
            dependencies,
        })
    }

    pub async fn describe(&self, path: &Path, out: &mut dyn Write, json: bool) -> Result<()> {
        let description = self.describe_service(path).await?;
        if json {
            serde_json::to_writer_pretty(&mut *out, &description)?;
            writeln!(out)?;
        } else {
            write!(out, "{}", description)?;
        }
        Ok(())
    }

    /// Runs `target` for the service at `path`. All output goes into a log file in the
    /// temp dir whose path is returned, and reported in the error on failure.
    pub async fn execute(&self, path: &Path, target: ServiceTarget) -> Result<PathBuf> {
        let service = self.persistence.load(path)?;
        let (mut log, log_path) = tempfile::Builder::new()
            .prefix(&format!("sapper_{}_", target))
            .suffix(".log")
            .tempfile()?
            .keep()
            .map_err(|e| e.error)?;
        tracing::info!("{} {} (log: {})", target, service.id, log_path.display());

        let result = match target {
            ServiceTarget::Build => self.builder.build(&service, &mut log).await,
            ServiceTarget::Test => self.builder.test(&service, &mut log).await,
            ServiceTarget::Run => self.builder.run(&service, &mut log).await,
            ServiceTarget::Deploy => self.builder.deploy(&service, &mut log).await,
        };

        match result {
            Ok(()) => Ok(log_path),
            Err(e) => {
                tracing::debug!("{} of {} failed: {}", target, service.id, e);
                Err(SapperError::OracleError {
                    target: target.to_string(),
                    service: service.id,
                    log: log_path,
                })
            }
        }
    }

    pub async fn build(&self, path: &Path) -> Result<PathBuf> {
        self.execute(path, ServiceTarget::Build).await
    }

    pub async fn test(&self, path: &Path) -> Result<PathBuf> {
        self.execute(path, ServiceTarget::Test).await
    }

    pub async fn run(&self, path: &Path) -> Result<PathBuf> {
        self.execute(path, ServiceTarget::Run).await
    }

    pub async fn deploy(&self, path: &Path) -> Result<PathBuf> {
        self.execute(path, ServiceTarget::Deploy).await
    }

    pub fn upgrader(&self) -> DependencyUpgrader<'a> {
        DependencyUpgrader::new(self.dependency_info, self.dependency_writer, self.builder)
    }

    /// Upgrades every package dependency of the service, one at a time, each to the newest
    /// version that still builds. The service must build before anything is touched. One
    /// status line per dependency is written to `out`. All dependencies are attempted; the
    /// result is an error if any of them did not reach its target.
    pub async fn upgrade(&self, path: &Path, keep_major_version: bool, out: &mut dyn Write) -> Result<()> {
        let service = self.persistence.load(path)?;

        writeln!(out, "building service...")?;
        self.build(path).await?;

        let upgrader = self.upgrader();
        let mut failed = 0;
        for dependency in &service.dependencies {
            tracing::info!(
                "upgrading {} (current version {})",
                dependency.id,
                dependency.version
            );
            match upgrader
                .upgrade_dependency(&service, dependency, keep_major_version)
                .await
            {
                Ok(spec) => {
                    spec.print_status(out, &dependency.id)?;
                    if !spec.upgrade_to_target_successful() {
                        failed += 1;
                    }
                }
                Err(e) => {
                    writeln!(out, "{}: upgrade failed ({})", dependency.id, e)?;
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(SapperError::UpgradeIncomplete {
                subject: service.id,
                failed,
                total: service.dependencies.len(),
            });
        }
        Ok(())
    }
}
