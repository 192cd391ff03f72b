use crate::domain::model::{Brick, BrickKind, PackageDependency, Service};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;

pub trait BrickDb: Send + Sync {
    fn bricks(&self, kind: BrickKind) -> Vec<Brick>;
    fn brick(&self, id: &str) -> Result<Brick>;
}

pub trait ParameterResolver {
    /// An empty string means "no value".
    fn resolve(&self, name: &str, default_value: &str) -> String;
}

pub trait ServicePersistence {
    fn load(&self, path: &Path) -> Result<Service>;
    fn save(&self, service: &Service) -> Result<()>;
}

/// Streaming line classifier: takes a line and the carried state, returns whether the
/// line belongs to the dependency region and the next state.
pub type SectionPredicate = fn(line: &str, state: &str) -> (bool, String);

pub trait DependencyReader {
    fn read_from_service(&self, service: &Service) -> Result<Vec<PackageDependency>>;
    fn read_from_brick(
        &self,
        brick: &Brick,
        predicate: SectionPredicate,
    ) -> Result<Vec<PackageDependency>>;
}

pub trait DependencyWriter {
    /// Sets the declared version of one dependency in the service's package manifest.
    fn write(&self, service: &Service, dependency: &str, version: &str) -> Result<()>;
    fn write_to_brick(
        &self,
        brick: &Brick,
        dependencies: &[PackageDependency],
        predicate: SectionPredicate,
    ) -> Result<()>;
}

#[async_trait]
pub trait DependencyInfo: Send + Sync {
    /// Ascending as reported by the registry.
    async fn available_versions(&self, dependency: &str) -> Result<Vec<String>>;
}

/// The build oracle. Success or failure is the only signal the upgrade search uses.
#[async_trait]
pub trait ServiceBuilder: Send + Sync {
    async fn build(&self, service: &Service, output: &mut (dyn Write + Send)) -> Result<()>;
    async fn test(&self, service: &Service, output: &mut (dyn Write + Send)) -> Result<()>;
    async fn run(&self, service: &Service, output: &mut (dyn Write + Send)) -> Result<()>;
    async fn deploy(&self, service: &Service, output: &mut (dyn Write + Send)) -> Result<()>;
}
