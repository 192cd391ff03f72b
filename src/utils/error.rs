use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SapperError {
    #[error("{input} does not follow the format '<prefix><major>.<minor>.<patch><suffix>' where major, minor, and patch must be digits")]
    VersionParseError { input: String },

    #[error("found nested begin tag {name} in existing section {open} in line {line}")]
    NestedBeginTag { name: String, open: String, line: usize },

    #[error("found end tag {name} without preceding begin tag in line {line}")]
    EndTagWithoutBegin { name: String, line: usize },

    #[error("found end tag {name} that does not match the begin tag {open} in line {line}")]
    EndTagMismatch { name: String, open: String, line: usize },

    #[error("unable to merge section {base} with section {incoming}: names must match")]
    SectionNameMismatch { base: String, incoming: String },

    #[error("unable to merge section {name}: base operation must not be defined")]
    BaseVerbDefined { name: String },

    #[error("unable to merge section {name}: incoming operation is missing")]
    InvalidIncomingVerb { name: String },

    #[error("cyclic brick dependency: {brick_id} depends on itself")]
    CyclicBrickDependency { brick_id: String },

    #[error("invalid brick {brick_id}")]
    InvalidBrick { brick_id: String },

    #[error("brick not found: {brick_id}")]
    BrickNotFound { brick_id: String },

    #[error("brick {brick_id} has already been added")]
    BrickAlreadyAdded { brick_id: String },

    #[error("unable to resolve value for parameter {name}")]
    UnresolvedParameter { name: String },

    #[error("parameter {parameter} must be of the form 'PARAMETER_NAME=value'")]
    InvalidParameterSyntax { parameter: String },

    #[error("invalid service name '{name}'")]
    InvalidServiceName { name: String },

    #[error("unable to find any versions of {dependency}")]
    NoVersionsFound { dependency: String },

    #[error("unable to set version {version} of package {dependency}")]
    DependencyWriteError { dependency: String, version: String },

    #[error("'{command}' exited with {status}")]
    ProcessFailed { command: String, status: String },

    #[error("{target} failed for service {service} (see {log} for details)")]
    OracleError {
        target: String,
        service: String,
        log: PathBuf,
    },

    #[error("{subject}: failed to upgrade {failed} of {total} dependencies")]
    UpgradeIncomplete {
        subject: String,
        failed: usize,
        total: usize,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed versions, tags or verbs. Never recovered.
    Parse,
    /// Unknown or cyclic bricks, unresolved parameters.
    Resolution,
    Io,
    /// A build, test, run or deploy reported failure.
    Oracle,
    Configuration,
}

impl SapperError {
    pub fn category(&self) -> ErrorCategory {
        use SapperError::*;
        match self {
            VersionParseError { .. }
            | NestedBeginTag { .. }
            | EndTagWithoutBegin { .. }
            | EndTagMismatch { .. }
            | SectionNameMismatch { .. }
            | BaseVerbDefined { .. }
            | InvalidIncomingVerb { .. }
            | YamlError(_)
            | SerializationError(_) => ErrorCategory::Parse,
            CyclicBrickDependency { .. }
            | InvalidBrick { .. }
            | BrickNotFound { .. }
            | BrickAlreadyAdded { .. }
            | UnresolvedParameter { .. }
            | InvalidServiceName { .. }
            | NoVersionsFound { .. } => ErrorCategory::Resolution,
            IoError(_) | DependencyWriteError { .. } => ErrorCategory::Io,
            ProcessFailed { .. } | OracleError { .. } | UpgradeIncomplete { .. } => {
                ErrorCategory::Oracle
            }
            InvalidParameterSyntax { .. }
            | ConfigError { .. }
            | InvalidConfigValueError { .. }
            | MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            SapperError::NestedBeginTag { .. }
            | SapperError::EndTagWithoutBegin { .. }
            | SapperError::EndTagMismatch { .. } => {
                "Check that every '<<<SAPPER SECTION BEGIN NAME>>>' has a matching END tag and that sections are not nested".to_string()
            }
            SapperError::InvalidIncomingVerb { .. } | SapperError::BaseVerbDefined { .. } => {
                "Only incoming brick sections may carry APPEND, PREPEND, REPLACE or MERGE".to_string()
            }
            SapperError::CyclicBrickDependency { .. } => {
                "Remove the circular entry from the Dependencies of the brick manifests".to_string()
            }
            SapperError::InvalidBrick { .. } | SapperError::BrickNotFound { .. } => {
                "Run 'sapper brick list' to see the bricks available in the configured remotes".to_string()
            }
            SapperError::UnresolvedParameter { name } => {
                format!("Pass the parameter explicitly with '-p {}=value'", name)
            }
            SapperError::InvalidParameterSyntax { .. } => {
                "Parameters must be given as '-p PARAMETER_NAME=value'".to_string()
            }
            SapperError::OracleError { log, .. } => {
                format!("Inspect the build output in {}", log.display())
            }
            SapperError::UpgradeIncomplete { .. } => {
                "The working versions have been kept; check the status lines above".to_string()
            }
            SapperError::ConfigError { .. }
            | SapperError::InvalidConfigValueError { .. }
            | SapperError::MissingConfigError { .. } => {
                "Check config.toml in the sapper configuration directory".to_string()
            }
            SapperError::IoError(_) => "Check file permissions and that the paths exist".to_string(),
            _ => "Re-run with --verbose for more details".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Parse => format!("Invalid input: {}", self),
            ErrorCategory::Resolution => format!("Unable to resolve: {}", self),
            ErrorCategory::Io => format!("File system error: {}", self),
            ErrorCategory::Oracle => self.to_string(),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
        }
    }
}

impl From<toml::de::Error> for SapperError {
    fn from(e: toml::de::Error) -> Self {
        SapperError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        }
    }
}

impl From<toml::ser::Error> for SapperError {
    fn from(e: toml::ser::Error) -> Self {
        SapperError::ConfigError {
            message: format!("TOML serialization error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, SapperError>;
