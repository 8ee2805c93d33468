//! motion-pointer - wearable motion-to-pointer engine
//!
//! Entry point for the engine binary. Stdout carries the host bridge (JSON
//! lines), so all logging goes to stderr or a log file.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use motion_pointer::config::Config;
use motion_pointer::device::ProfileStore;
use motion_pointer::engine::Engine;
use motion_pointer::interaction::Scene;
use motion_pointer::transport::{self, JsonLinesRenderer, JsonLinesSink, TransportOptions};
use motion_pointer::utils::format_user_error;

/// Command-line arguments for motion-pointer
#[derive(Parser, Debug)]
#[command(name = "motion-pointer")]
#[command(version, about = "Wearable motion-to-pointer engine", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "MOTION_POINTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Device hub WebSocket URL
    #[arg(short, long, env = "MOTION_POINTER_URL")]
    pub url: Option<String>,

    /// Scene layout file (JSON)
    #[arg(short, long)]
    pub scene: Option<PathBuf>,

    /// Profile store file
    #[arg(short, long, env = "MOTION_POINTER_PROFILES")]
    pub profiles: Option<PathBuf>,

    /// Disable dwell-click
    #[arg(long)]
    pub no_dwell: bool,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "compact")]
    pub log_format: String,

    /// Write logs to file (in addition to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_error) = match load_config(&args) {
        Ok(config) => (config, None),
        Err(e) => (Config::default_config(), Some(e)),
    };
    let config = config.with_overrides(args.url.clone(), args.profiles.clone(), args.no_dwell);

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let _log_guard = init_logging(&args, &config)?;

    info!("════════════════════════════════════════════════════════");
    info!("  motion-pointer v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {}", env!("BUILD_DATE"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    if let Some(e) = config_error {
        warn!("Failed to load config: {:#}, using defaults", e);
    }
    debug!("Config: {:?}", config);

    if let Err(e) = run(config, args.scene.as_deref()).await {
        eprintln!("{}", format_user_error(&e));
        return Err(e);
    }

    info!("motion-pointer shut down");
    Ok(())
}

async fn run(config: Config, scene_path: Option<&std::path::Path>) -> Result<()> {
    let profiles_path = config.profiles.resolved_path();
    let profiles = match &profiles_path {
        Some(path) => ProfileStore::load(path).unwrap_or_else(|e| {
            warn!("{}; starting from default profiles", e);
            ProfileStore::with_defaults()
        }),
        None => ProfileStore::with_defaults(),
    };

    let scene = match scene_path {
        Some(path) => Scene::load(path)?,
        None => {
            info!("No scene layout given; clicks will not hit any element");
            Scene::new()
        }
    };

    let options = TransportOptions::from_config(&config);
    let mut engine = Engine::new(
        config.engine_options(),
        profiles,
        scene,
        JsonLinesSink::stdout(),
        JsonLinesRenderer::stdout(),
    );

    let (commands, reader) = transport::spawn_command_reader();
    let result = transport::run(&mut engine, options, commands).await;
    reader.abort();

    if config.profiles.autosave {
        if let Err(e) = engine.save_profiles() {
            warn!("Saving profiles on exit failed: {}", e);
        }
    }

    result.context("Device hub link failed")
}

/// Explicit path, then the per-user config file, then defaults
fn load_config(args: &Args) -> Result<Config> {
    if let Some(path) = &args.config {
        return Config::load(path);
    }

    match dirs::config_dir().map(|d| d.join("motion-pointer").join("config.toml")) {
        Some(path) if path.exists() => Config::load(&path),
        _ => Ok(Config::default_config()),
    }
}

fn init_logging(args: &Args, config: &Config) -> Result<Option<WorkerGuard>> {
    let log_level = match args.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // tungstenite at debug logs every frame
        tracing_subscriber::EnvFilter::new(format!(
            "motion_pointer={level},tokio_tungstenite=info,tungstenite=info,warn",
            level = log_level
        ))
    });

    let mut guard = None;
    let file_writer: Option<BoxMakeWriter> = if let Some(path) = &args.log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        Some(BoxMakeWriter::new(file))
    } else if let Some(dir) = &config.logging.log_dir {
        let appender = tracing_appender::rolling::daily(dir, "motion-pointer.log");
        let (writer, worker) = tracing_appender::non_blocking(appender);
        guard = Some(worker);
        Some(BoxMakeWriter::new(writer))
    } else {
        None
    };

    match args.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .with(file_writer.map(|w| {
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(w)
                        .with_ansi(false)
                }))
                .init();
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .with(
                    file_writer
                        .map(|w| tracing_subscriber::fmt::layer().with_writer(w).with_ansi(false)),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .with(file_writer.map(|w| {
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(w)
                        .with_ansi(false)
                }))
                .init();
        }
    }

    if let Some(path) = &args.log_file {
        info!("Logging to file: {}", path.display());
    } else if let Some(dir) = &config.logging.log_dir {
        info!("Logging to directory: {}", dir.display());
    }

    Ok(guard)
}
