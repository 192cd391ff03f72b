use anyhow::Context;
use clap::Parser;
use sapper::adapters::{
    command_line_resolver, AggregateBrickDb, ConanDependencyManager,
    FileSystemServicePersistence, MakeServiceBuilder,
};
use sapper::config::cli::{split_service_folder, BrickCommand, Command, ServiceCommand};
use sapper::utils::error::ErrorCategory;
use sapper::utils::{logger, validation::Validate};
use sapper::{BrickApi, Cli, SapperConfig, SapperError, ServiceApi, ServiceTarget};
use std::io::Write;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI arguments: {:?}", cli);

    match run(cli).await {
        Ok(()) => {}
        Err(e) => {
            let exit_code = match e.downcast_ref::<SapperError>() {
                Some(err) => {
                    tracing::error!("❌ {} (category: {:?})", err, err.category());
                    eprintln!("❌ {}", err.user_friendly_message());
                    eprintln!("💡 {}", err.recovery_suggestion());
                    exit_code_for(err.category())
                }
                None => {
                    eprintln!("❌ {:#}", e);
                    1
                }
            };
            std::process::exit(exit_code);
        }
    }
}

fn exit_code_for(category: ErrorCategory) -> i32 {
    match category {
        ErrorCategory::Oracle => 1,
        ErrorCategory::Parse => 2,
        ErrorCategory::Resolution => 3,
        ErrorCategory::Io => 4,
        ErrorCategory::Configuration => 5,
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => SapperConfig::default_config_dir()?,
    };
    let config = SapperConfig::load_or_init(&config_dir)
        .with_context(|| format!("loading configuration from {}", config_dir.display()))?;
    config.validate()?;

    let db = AggregateBrickDb::from_remotes(&config.remotes)?;
    let conan = ConanDependencyManager;
    let persistence = FileSystemServicePersistence::new(conan);
    let builder = MakeServiceBuilder::default();
    let service_api = ServiceApi {
        db: &db,
        persistence: &persistence,
        builder: &builder,
        dependency_info: &conan,
        dependency_writer: &conan,
    };

    let mut stdout = std::io::stdout();
    match cli.command {
        Command::Service(command) => match command {
            ServiceCommand::Add {
                folder,
                template,
                parameters,
            } => {
                let (parent, name) = split_service_folder(&folder);
                let resolver = command_line_resolver(&parameters.parameters, Some(&name))?;
                let service = service_api.add(&template, &parent, &resolver)?;
                println!("✅ Created service {} in {}", service.id, service.path.display());
            }
            ServiceCommand::Describe { folder, json } => {
                service_api.describe(&folder, &mut stdout, json).await?;
            }
            ServiceCommand::Upgrade { folder, keep_major } => {
                service_api.upgrade(&folder, keep_major, &mut stdout).await?;
            }
            ServiceCommand::Build { folder } => {
                report(service_api.execute(&folder, ServiceTarget::Build).await?);
            }
            ServiceCommand::Test { folder } => {
                report(service_api.execute(&folder, ServiceTarget::Test).await?);
            }
            ServiceCommand::Run { folder } => {
                report(service_api.execute(&folder, ServiceTarget::Run).await?);
            }
            ServiceCommand::Deploy { folder } => {
                report(service_api.execute(&folder, ServiceTarget::Deploy).await?);
            }
        },
        Command::Brick(command) => {
            let brick_api = BrickApi::new(service_api, &conan);
            match command {
                BrickCommand::Add {
                    brick,
                    service,
                    parameters,
                } => {
                    let resolver = command_line_resolver(&parameters.parameters, None)?;
                    let service = brick_api.add(&service, &brick, &resolver)?;
                    println!("✅ Added {} to service {}", brick, service.id);
                }
                BrickCommand::List => {
                    for brick in brick_api.list() {
                        writeln!(stdout, "{}\t{}\t{}", brick.id, brick.version, brick.description)?;
                    }
                }
                BrickCommand::Search { term } => {
                    for brick in brick_api.search(&term) {
                        writeln!(stdout, "{}\t{}\t{}", brick.id, brick.version, brick.description)?;
                    }
                }
                BrickCommand::Upgrade { brick } => {
                    brick_api.upgrade(&brick, &mut stdout).await?;
                }
            }
        }
    }
    Ok(())
}

fn report(log: std::path::PathBuf) {
    println!("✅ success (log: {})", log.display());
}
