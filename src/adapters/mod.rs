// Adapters layer: ports implemented against the filesystem and external tools (conan, make)

pub mod brick_db;
pub mod conan;
pub mod make_builder;
pub mod parameter_resolver;
pub mod persistence;

pub use brick_db::{AggregateBrickDb, FilesystemBrickDb};
pub use conan::ConanDependencyManager;
pub use make_builder::MakeServiceBuilder;
pub use parameter_resolver::{
    command_line_resolver, CliParameterResolver, CompoundParameterResolver, DefaultValueParameterResolver,
    MapParameterResolver,
};
pub use persistence::FileSystemServicePersistence;
