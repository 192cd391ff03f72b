pub mod brick_api;
pub mod bricks;
pub mod composer;
pub mod merge;
pub mod section;
pub mod semver;
pub mod service_api;
pub mod upgrade;

pub use crate::domain::model::{Brick, BrickKind, PackageDependency, Service};
pub use crate::domain::ports::{
    BrickDb, DependencyInfo, DependencyReader, DependencyWriter, ParameterResolver,
    ServiceBuilder, ServicePersistence,
};
pub use crate::utils::error::Result;
pub use brick_api::BrickApi;
pub use service_api::{ServiceApi, ServiceTarget};
pub use upgrade::{find_latest_working_version, DependencyUpgrader, VersionUpgradeSpec};
