// SPDX-License-Identifier: GPL-3.0-only

use barcode_scanner::Config;
use barcode_scanner::constants::APP_ID;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "barcode-scanner")]
#[command(about = "Scan barcodes and QR codes with a camera")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Read configuration from this file instead of the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run in terminal mode (default)
    Terminal,

    /// List available cameras
    List,

    /// Scan continuously and print each decoded code
    Scan {
        /// Camera index (from 'barcode-scanner list') or device id
        #[arg(short, long)]
        camera: Option<String>,

        /// Exit after the first decoded code
        #[arg(long)]
        once: bool,
    },

    /// Decode a code from an image file
    Decode {
        /// Image file to decode
        path: PathBuf,
    },

    /// Write the current configuration to the config file
    InitConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let init_config = matches!(cli.command, Some(Commands::InitConfig));
    let config = match &cli.config {
        Some(path) if init_config && !path.exists() => Config::default(),
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    let terminal_mode = matches!(cli.command, None | Some(Commands::Terminal));
    init_logging(&config, terminal_mode);

    match cli.command {
        Some(Commands::Terminal) | None => barcode_scanner::terminal::run(&config),
        Some(Commands::List) => cli::list_cameras(&config),
        Some(Commands::Scan { camera, once }) => cli::scan(&config, camera, once),
        Some(Commands::Decode { path }) => cli::decode_image(&config, &path),
        Some(Commands::InitConfig) => cli::write_config(&config, cli.config.as_deref()),
    }
}

/// Initialize logging
///
/// Set RUST_LOG to control the level (e.g. RUST_LOG=barcode_scanner=debug).
/// Without it the config's `log_filter` applies, then `warn`. Terminal mode
/// logs to a file in the cache directory so output does not corrupt the UI.
fn init_logging(config: &Config, terminal_mode: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .with_level(true);

    if !terminal_mode {
        builder.with_writer(std::io::stderr).init();
        return;
    }

    match open_log_file() {
        Some(file) => builder.with_writer(Mutex::new(file)).with_ansi(false).init(),
        None => builder.with_writer(std::io::sink).init(),
    }
}

fn env_filter(config: &Config) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    config
        .log_filter
        .as_deref()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"))
}

fn open_log_file() -> Option<File> {
    let dir = dirs::cache_dir()?.join(APP_ID);
    std::fs::create_dir_all(&dir).ok()?;
    File::create(dir.join(format!("{}.log", APP_ID))).ok()
}
