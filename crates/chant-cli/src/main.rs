//! `chant`: terminal chant player for the attorney register.
//!
//! Fetches recent register changes, fades each one in and out to an audio
//! cue, and shows the same collection as a paginated table. When there is
//! nothing to show it chants the quote of the day instead.

mod chant;
mod config;
mod cue;
mod logging;
mod server_api;
mod table;
mod ui;
mod worker;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use time::Date;

use crate::chant::lines::{self, DisplayMode, Filter};
use crate::config::{ChantConfig, Overrides, Settings};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "chant", version = VERSION)]
struct Args {
    /// Base URL of the register API, e.g. http://localhost:5000
    #[arg(long)]
    server: Option<String>,

    /// Path to a TOML config file (default: ./chant.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial display mode.
    #[arg(long, value_enum)]
    mode: Option<DisplayMode>,

    /// Register filter; repeat for several.
    #[arg(long, value_enum)]
    filter: Vec<Filter>,

    /// Start of the change-log window (YYYY-MM-DD).
    #[arg(long, value_parser = lines::parse_date)]
    first_date: Option<Date>,

    /// End of the window (YYYY-MM-DD); also the day the register snapshot tabs read.
    #[arg(long, value_parser = lines::parse_date)]
    last_date: Option<Date>,

    /// Never open an audio device.
    #[arg(long)]
    no_audio: bool,

    /// List output devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Output device name (substring match).
    #[arg(long)]
    device: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        logging::init_stderr();
        return chant_audio::device::list_default_host_devices();
    }

    let config_path = config::locate(args.config.as_deref())?;
    let (file_cfg, base_dir) = match config_path.as_deref() {
        Some(path) => (
            ChantConfig::load(path)?,
            path.parent().map(Path::to_path_buf).unwrap_or_default(),
        ),
        None => (ChantConfig::default(), std::env::current_dir().unwrap_or_default()),
    };
    let settings = Settings::resolve(
        file_cfg,
        Overrides {
            server: args.server,
            mode: args.mode,
            filters: args.filter,
            first_date: args.first_date,
            last_date: args.last_date,
            device: args.device,
            no_audio: args.no_audio,
        },
        &base_dir,
    )?;

    let log_rx = logging::init_channel();
    tracing::info!(
        server = %settings.server,
        mode = settings.query.mode.title(),
        config = ?config_path,
        "chant {VERSION}"
    );
    ui::run_tui(settings, log_rx)
}
