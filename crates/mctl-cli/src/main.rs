//! menuctl CLI
//!
//! Lists and filters processes on a remote admin host, kills them and runs
//! lookups through the host's text menu, all over SSH.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mctl_cli::commands::{self, Paths, RemoteOptions};
use mctl_core::config;
use mctl_core::history::HostHistory;
use mctl_core::LookupKind;

#[derive(Parser)]
#[command(name = "menuctl")]
#[command(author, version, about = "Remote process console for text-menu admin hosts")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to admin configuration file
    #[arg(long, global = true)]
    admin_config: Option<PathBuf>,

    /// Remote host (defaults to the last host connected to)
    #[arg(short = 'H', long, global = true)]
    host: Option<String>,

    /// SSH port (overrides config)
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Remote user
    #[arg(short, long, global = true, env = "MENUCTL_USER")]
    user: Option<String>,

    /// Remote password
    #[arg(long, global = true, env = "MENUCTL_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Trust and remember unknown host keys without asking
    #[arg(long, global = true)]
    accept_new_host: bool,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List remote processes
    Ps {
        /// Only users containing this text
        #[arg(long = "filter-user", id = "filter_user")]
        user: Option<String>,
        /// Only PIDs containing these digits
        #[arg(long = "filter-pid")]
        pid: Option<String>,
        /// Only commands containing this text
        #[arg(long = "filter-cmd")]
        cmd: Option<String>,
    },

    /// Kill processes through the remote menu
    Kill {
        /// PIDs, separated by spaces, commas or dashes
        #[arg(required = true)]
        pids: Vec<String>,
        /// Kill without confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Find files in the work directory by id
    LookupId {
        /// Registration or manifest number; empty matches everything
        #[arg(default_value = "")]
        id: String,
    },

    /// Find screens in the data directory by name
    LookupScreen {
        /// Screen name pattern; empty matches everything
        #[arg(default_value = "")]
        pattern: String,
    },

    /// Run commands, each on its own channel
    Exec {
        /// Commands to run in order
        #[arg(required = true)]
        commands: Vec<String>,
    },

    /// Line-mode interactive shell on the remote host
    Shell,

    /// List previously connected hosts
    Hosts,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective configuration
    Show,
    /// Get specific config value
    Get { key: String },
    /// Set config value
    Set { key: String, value: String },
    /// Write default configuration files
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
    /// Show config directory path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let paths = Paths {
        config: cli.config.clone(),
        admin: cli.admin_config.clone(),
    };
    let options = RemoteOptions {
        host: cli.host.clone(),
        port: cli.port,
        user: cli.user.clone(),
        password: cli.password.clone(),
        accept_new_host: cli.accept_new_host,
    };

    run(cli.command, &paths, &options).await
}

async fn run(command: Commands, paths: &Paths, options: &RemoteOptions) -> Result<()> {
    match command {
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(paths),
            ConfigAction::Get { key } => commands::config_get(paths, &key),
            ConfigAction::Set { key, value } => commands::config_set(paths, &key, &value),
            ConfigAction::Init { force } => commands::config_init(paths, force),
            ConfigAction::Path => commands::config_path(paths),
        },

        Commands::Hosts => {
            let history = HostHistory::load(config::default_history_path());
            for host in history.hosts() {
                println!("{}", host);
            }
            Ok(())
        }

        remote_command => {
            let echo = matches!(remote_command, Commands::Shell);
            let mut remote = commands::connect(paths, options, echo).await?;

            let result = match remote_command {
                Commands::Ps { user, pid, cmd } => {
                    commands::ps_command(
                        &mut remote,
                        user.as_deref(),
                        pid.as_deref(),
                        cmd.as_deref(),
                    )
                    .await
                }
                Commands::Kill { pids, force } => {
                    commands::kill_command(&mut remote, &pids, force).await
                }
                Commands::LookupId { id } => {
                    commands::lookup_command(&mut remote, LookupKind::ById, &id).await
                }
                Commands::LookupScreen { pattern } => {
                    commands::lookup_command(&mut remote, LookupKind::ByScreen, &pattern).await
                }
                Commands::Exec { commands: list } => {
                    commands::exec_command(&mut remote, &list).await
                }
                Commands::Shell => commands::shell_command(&mut remote).await,
                Commands::Config { .. } | Commands::Hosts => Ok(()),
            };

            remote.finish().await;
            result
        }
    }
}
