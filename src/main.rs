//! daemonctl - Minimal local daemon supervisor
//!
//! Entry point for the daemonctl application.

use clap::Parser;
use daemonctl::cli::{AliasArgs, Cli, Commands, ConfigCommands, ListArgs, ShowArgs, StartArgs};
use daemonctl::config::{Config, LogFormat, LogOutput, LoggingConfig, CONFIG_FILE_NAME};
use daemonctl::error::exit_code;
use daemonctl::output;
use daemonctl::supervisor::{Invocation, LaunchOptions, Supervisor};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = load_config(&cli);
    let logging = config
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();

    // Initialize logging based on CLI flags and configuration
    if let Err(e) = init_logging(&cli, &logging) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::from(exit_code::GENERAL_ERROR as u8);
    }

    // Execute the command
    match run(&cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = %e.code(), "{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Initialize the tracing subscriber.
///
/// `-v`/`-q` take precedence over the configured level; `RUST_LOG`
/// directives are honoured when set.
fn init_logging(
    cli: &Cli,
    logging: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = match cli.log_level() {
        Some(("trace", _)) => Level::TRACE,
        Some(("debug", _)) => Level::DEBUG,
        Some(("error", _)) => Level::ERROR,
        Some(_) => Level::INFO,
        None => logging.level.into(),
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let (writer, ansi) = match logging.output {
        LogOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
        LogOutput::File => {
            let path = logging
                .file_path
                .clone()
                .ok_or("logging.file_path is required when output is file")?;
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true);

    match logging.format {
        LogFormat::Json => builder.json().try_init()?,
        LogFormat::Text => builder.try_init()?,
    }

    Ok(())
}

/// Main application logic.
fn run(cli: &Cli, config: daemonctl::Result<Config>) -> daemonctl::Result<()> {
    if let Commands::Config(subcmd) = &cli.command {
        return cmd_config(subcmd, config);
    }

    let config = config?;
    tracing::debug!(home = %config.home_dir().display(), "Using registry");

    let invocation = Invocation::capture()?;
    let supervisor = Supervisor::from_config(&config, invocation);

    // Create tokio runtime and run the command
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        match &cli.command {
            Commands::Start(args) => cmd_start(cli, &supervisor, &config, args).await,
            Commands::Stop(args) => cmd_stop(cli, &supervisor, args).await,
            Commands::Restart(args) => cmd_restart(cli, &supervisor, &config, args).await,
            Commands::List(args) => cmd_list(&supervisor, args).await,
            Commands::Show(args) => cmd_show(&supervisor, args).await,
            Commands::Status(args) => cmd_status(&supervisor, args).await,
            Commands::Config(_) => Ok(()),
        }
    })
}

/// Handle the `start` command.
async fn cmd_start(
    cli: &Cli,
    supervisor: &Supervisor,
    config: &Config,
    args: &StartArgs,
) -> daemonctl::Result<()> {
    if args.target.is_none() {
        let ignored = args.launch_overrides();
        if !ignored.is_empty() {
            tracing::warn!(
                alias = %args.alias,
                ignored = ?ignored,
                "No target given, relaunching with recorded settings"
            );
        }
    }

    let options = LaunchOptions::from_config(&config.launch)
        .with_runtime(args.runtime.clone())
        .with_options(args.options.clone())
        .with_args(args.args.clone());

    tracing::info!(
        alias = %args.alias,
        target = ?args.target,
        runtime = ?options.runtime,
        "Starting daemon"
    );

    let report = supervisor
        .start(&args.alias, args.target.as_deref(), &options)
        .await?;

    if cli.confirmations() {
        println!("{}", output::start_message(&report));
    }
    Ok(())
}

/// Handle the `stop` command.
async fn cmd_stop(cli: &Cli, supervisor: &Supervisor, args: &AliasArgs) -> daemonctl::Result<()> {
    tracing::info!(alias = %args.alias, "Stopping daemon");

    let report = supervisor.stop(&args.alias).await?;

    if cli.confirmations() {
        println!("{}", output::stop_message(&report));
    }
    Ok(())
}

/// Handle the `restart` command.
async fn cmd_restart(
    cli: &Cli,
    supervisor: &Supervisor,
    config: &Config,
    args: &AliasArgs,
) -> daemonctl::Result<()> {
    tracing::info!(alias = %args.alias, "Restarting daemon");

    let options = LaunchOptions::from_config(&config.launch);
    let report = supervisor.restart(&args.alias, &options).await?;

    if cli.confirmations() {
        println!("{}", output::restart_message(&report));
    }
    Ok(())
}

/// Handle the `list` command.
async fn cmd_list(supervisor: &Supervisor, args: &ListArgs) -> daemonctl::Result<()> {
    let summaries = supervisor.list(args.filter.as_deref()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        if args.filter.is_some() {
            println!("No daemons match the filter.");
        } else {
            println!("No daemons recorded.");
        }
        return Ok(());
    }

    println!("{}", output::list_table(&summaries));
    Ok(())
}

/// Handle the `show` command.
async fn cmd_show(supervisor: &Supervisor, args: &ShowArgs) -> daemonctl::Result<()> {
    let details = supervisor.show(&args.alias).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    println!("{}", output::details_table(&details));
    println!();
    println!("{}", output::hints(&args.alias, details.live_status));
    Ok(())
}

/// Handle the `status` command.
async fn cmd_status(supervisor: &Supervisor, args: &ShowArgs) -> daemonctl::Result<()> {
    let status = supervisor.status(&args.alias).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("{}", output::status_message(&status));
    }
    Ok(())
}

/// Handle the `config` subcommand.
fn cmd_config(
    subcmd: &ConfigCommands,
    config: daemonctl::Result<Config>,
) -> daemonctl::Result<()> {
    match subcmd {
        ConfigCommands::Validate => match config {
            Ok(config) => {
                println!("✓ Configuration is valid");
                tracing::debug!(?config, "Validated configuration");
                Ok(())
            }
            Err(e) => {
                println!("✗ Configuration is invalid: {}", e);
                Err(e)
            }
        },
        ConfigCommands::Show => {
            let yaml = serde_yaml::to_string(&config?)?;
            println!("{}", yaml);
            Ok(())
        }
    }
}

/// Load configuration, applying `--home`.
///
/// With `--home` and no explicit config path, `config.yaml` is looked up in
/// that directory.
fn load_config(cli: &Cli) -> daemonctl::Result<Config> {
    let config_path: Option<PathBuf> = cli.config.clone().or_else(|| {
        cli.home
            .as_ref()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    });

    let mut config = Config::load(config_path.as_deref())?;
    if let Some(home) = &cli.home {
        config.home = Some(home.clone());
    }
    Ok(config)
}
