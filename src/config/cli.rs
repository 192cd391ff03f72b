use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
#[command(name = "sapper")]
#[command(about = "Scaffold services from bricks and keep their dependencies up to date")]
#[command(version)]
pub struct Cli {
    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(
        long,
        global = true,
        help = "Configuration directory (default $SAPPER_HOME or ~/.sapper)"
    )]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create and maintain services
    #[command(subcommand)]
    Service(ServiceCommand),
    /// Inspect bricks and add them to services
    #[command(subcommand)]
    Brick(BrickCommand),
}

#[derive(Debug, Clone, Args)]
pub struct ParameterArgs {
    /// Parameter values as NAME=value; repeatable
    #[arg(short = 'p', long = "parameter", value_name = "NAME=value")]
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ServiceCommand {
    /// Create a new service in FOLDER from a template brick; NAME defaults to the folder name
    Add {
        folder: PathBuf,
        #[arg(long, short, default_value = "cpp-service-template")]
        template: String,
        #[command(flatten)]
        parameters: ParameterArgs,
    },
    /// Show bricks and package dependencies of a service
    Describe {
        folder: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Upgrade all package dependencies to the newest versions that still build
    Upgrade {
        folder: PathBuf,
        #[arg(long, help = "Never move to a different major version")]
        keep_major: bool,
    },
    Build {
        folder: PathBuf,
    },
    Test {
        folder: PathBuf,
    },
    Run {
        folder: PathBuf,
    },
    Deploy {
        folder: PathBuf,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum BrickCommand {
    /// Add an extension brick to an existing service
    Add {
        brick: String,
        #[arg(long, short, default_value = ".")]
        service: PathBuf,
        #[command(flatten)]
        parameters: ParameterArgs,
    },
    /// List all extension bricks
    List,
    /// Search extension bricks by id or description
    Search { term: String },
    /// Upgrade the package dependencies declared by a brick
    Upgrade { brick: String },
}

/// Splits the folder given to `service add` into the directory the service is created in
/// and the service name. A bare name lives in the current directory.
pub fn split_service_folder(folder: &Path) -> (PathBuf, String) {
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = match folder.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    (parent, name)
}
