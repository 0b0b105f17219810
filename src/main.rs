use anyhow::Result;
use clap::Parser;
use ensure_pkg::config::Config;
use ensure_pkg::ensure::{ImportOptions, InstallOptions};
use ensure_pkg::package::{InstallFlag, Scope};
use ensure_pkg::runtime::RealRuntime;
use std::path::PathBuf;
use std::process::ExitCode;

/// ensure-pkg - make sure an npm package is installed
///
/// Checks whether a package is installed locally or globally at a version
/// satisfying a semver range, installs it when it is not, and resolves the
/// installed module.
///
/// If the NPM_TOKEN environment variable is set, it is sent to the registry
/// when resolving "latest".
///
/// Examples:
///   ensure-pkg check lodash
///   ensure-pkg install lodash --version "^4.0.0" --dev
///   ensure-pkg import typescript --install-flag global
#[derive(Parser, Debug)]
#[command(author, version = env!("ENSURE_PKG_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Working directory for every package-manager call (also via ENSURE_PKG_CWD)
    #[arg(long, env = "ENSURE_PKG_CWD", value_name = "PATH", global = true)]
    pub cwd: Option<PathBuf>,

    /// npm-compatible executable to run (also via ENSURE_PKG_NPM)
    #[arg(long = "npm", env = "ENSURE_PKG_NPM", value_name = "PROGRAM", global = true)]
    pub program: Option<String>,

    /// Registry URL used to resolve "latest" (defaults to https://registry.npmjs.org)
    #[arg(
        long = "registry",
        env = "NPM_CONFIG_REGISTRY",
        value_name = "URL",
        global = true
    )]
    pub registry_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print the installed version of a package
    Check(CheckArgs),

    /// Print the installed version of a package if it satisfies a version range
    CheckVersion(CheckVersionArgs),

    /// Install a package unless a satisfying version is already installed
    Install(InstallArgs),

    /// Install a package if needed, then resolve its module
    Import(ImportArgs),
}

#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Package name
    pub name: String,

    /// Look in the global install location
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct CheckVersionArgs {
    /// Package name
    pub name: String,

    /// Semver range, or "latest"
    pub version: String,

    /// Look in the global install location
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Package name
    pub name: String,

    /// Semver range, or "latest"
    #[arg(long, short = 'v')]
    pub version: Option<String>,

    /// Check and install globally
    #[arg(long, short = 'g')]
    pub global: bool,

    /// Save as a dev dependency
    #[arg(long, short = 'D')]
    pub dev: bool,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Package name
    pub name: String,

    /// Semver range, or "latest"
    #[arg(long, short = 'v')]
    pub version: Option<String>,

    /// Install flag used when the package is missing: save, save-dev or global
    #[arg(long, default_value = "save")]
    pub install_flag: InstallFlag,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = RealRuntime;
    let config = Config::new(&runtime, cli.program, cli.registry_url, cli.cwd)?;
    let ensurer = config.ensurer(runtime);

    match cli.command {
        Commands::Check(args) => {
            let scope = Scope::from_global(args.global);
            match ensurer.probe(&args.name, scope, &config.cwd).await {
                Some(version) => println!("{}@{}", args.name, version),
                None => {
                    println!("{} is not installed ({})", args.name, scope);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::CheckVersion(args) => {
            let scope = Scope::from_global(args.global);
            match ensurer
                .reconcile_version(&args.name, &args.version, scope, &config.cwd)
                .await
            {
                Some(version) => println!("{}@{}", args.name, version),
                None => {
                    println!(
                        "{} is not installed at {} ({})",
                        args.name, args.version, scope
                    );
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Install(args) => {
            let options = InstallOptions::new(&config.cwd)
                .global(args.global)
                .dev(args.dev);
            let satisfied = match &args.version {
                Some(version) => {
                    ensurer
                        .ensure_version_installed(&args.name, version, &options)
                        .await?
                }
                None => ensurer.ensure_installed(&args.name, &options).await?,
            };
            if satisfied {
                println!("{} is already installed", args.name);
            } else {
                println!("Installed {}", args.name);
            }
        }
        Commands::Import(args) => {
            let options = ImportOptions::new(&config.cwd).install_flag(args.install_flag);
            let module = match &args.version {
                Some(version) => {
                    ensurer
                        .ensure_version_imported(&args.name, version, &options)
                        .await?
                }
                None => ensurer.ensure_imported(&args.name, &options).await?,
            };
            println!("name: {}", module.name);
            println!(
                "version: {}",
                module.version.as_deref().unwrap_or("unknown")
            );
            println!("scope: {}", module.scope);
            println!("root: {}", module.root.display());
            println!("entry: {}", module.entry.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}
