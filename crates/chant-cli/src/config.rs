//! Configuration loading and resolution.
//!
//! The TOML file is optional; command-line flags override it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chant_audio::config::CueConfig;
use serde::Deserialize;
use time::Date;

use crate::chant::fade::FadeConfig;
use crate::chant::lines::{self, DataQuery, DateWindow, DisplayMode, Filter, QuotePool};

/// Default config file name looked up when `--config` is not given.
pub(crate) const CONFIG_FILE_NAME: &str = "chant.toml";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Top-level configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ChantConfig {
    /// Base URL of the register API.
    pub(crate) server: Option<String>,
    /// Initial display mode.
    pub(crate) mode: Option<DisplayMode>,
    /// Register filters applied to every request.
    pub(crate) filters: Option<Vec<Filter>>,
    /// Start of the change-log window, `YYYY-MM-DD`.
    pub(crate) first_date: Option<String>,
    /// End of the window, `YYYY-MM-DD`; snapshot tabs read the register on
    /// this day.
    pub(crate) last_date: Option<String>,
    /// Upper bound on one HTTP request, connect to last byte.
    pub(crate) request_timeout_ms: Option<u64>,
    /// Replacement quote-of-the-day pool.
    pub(crate) quotes: Option<Vec<String>>,
    pub(crate) fade: Option<FadeSection>,
    pub(crate) cues: Option<CueSection>,
    pub(crate) table: Option<TableSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FadeSection {
    pub(crate) tick_ms: Option<u64>,
    pub(crate) step: Option<f32>,
    pub(crate) hold_before_fade_in_ms: Option<u64>,
    pub(crate) hold_before_fade_out_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CueSection {
    /// Cue file played with real data. Relative paths resolve against the
    /// config file's directory.
    pub(crate) normal: Option<PathBuf>,
    /// Cue file played with the fallback quote.
    pub(crate) fallback: Option<PathBuf>,
    /// Output device name filter.
    pub(crate) device: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TableSection {
    pub(crate) per_page: Option<u32>,
}

impl ChantConfig {
    /// Load configuration from disk.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        toml::from_str::<ChantConfig>(&raw).with_context(|| format!("parse config {:?}", path))
    }
}

/// Locate the config file: the explicit path, else `chant.toml` in the
/// working directory, else next to the executable.
pub(crate) fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(anyhow!("config file {:?} does not exist", path));
        }
        return Ok(Some(path.to_path_buf()));
    }
    let candidates = [
        std::env::current_dir().ok().map(|dir| dir.join(CONFIG_FILE_NAME)),
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME))),
    ];
    Ok(candidates.into_iter().flatten().find(|path| path.is_file()))
}

/// Values taken from the command line.
#[derive(Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) server: Option<String>,
    pub(crate) mode: Option<DisplayMode>,
    pub(crate) filters: Vec<Filter>,
    pub(crate) first_date: Option<Date>,
    pub(crate) last_date: Option<Date>,
    pub(crate) device: Option<String>,
    pub(crate) no_audio: bool,
}

/// Fully resolved runtime settings.
#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) server: String,
    pub(crate) query: DataQuery,
    pub(crate) fade: FadeConfig,
    pub(crate) cues: CueConfig,
    pub(crate) audio: bool,
    pub(crate) quotes: QuotePool,
    pub(crate) per_page: Option<u32>,
    pub(crate) request_timeout: Duration,
}

impl Settings {
    /// Merge the file (if any) with command-line overrides and validate.
    /// `base_dir` anchors relative cue paths.
    pub(crate) fn resolve(cfg: ChantConfig, overrides: Overrides, base_dir: &Path) -> Result<Self> {
        let server = overrides
            .server
            .or(cfg.server)
            .ok_or_else(|| anyhow!("server URL is required; use --server or set `server` in {CONFIG_FILE_NAME}"))?;
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            return Err(anyhow!("server URL must start with http:// or https://: {server}"));
        }

        let filters = if overrides.filters.is_empty() {
            cfg.filters.unwrap_or_default()
        } else {
            overrides.filters
        };
        let first_date = match overrides.first_date {
            Some(date) => Some(date),
            None => config_date("first_date", cfg.first_date.as_deref())?,
        };
        let last_date = match overrides.last_date {
            Some(date) => Some(date),
            None => config_date("last_date", cfg.last_date.as_deref())?,
        };
        let window = DateWindow::new(first_date, last_date).map_err(|e| anyhow!(e))?;
        let query = DataQuery {
            mode: overrides.mode.or(cfg.mode).unwrap_or_default(),
            filters,
            window,
        };

        let request_timeout = cfg
            .request_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        if request_timeout.is_zero() {
            return Err(anyhow!("request_timeout_ms must be greater than zero"));
        }

        let fade = resolve_fade(cfg.fade.unwrap_or_default())?;

        let cue_section = cfg.cues.unwrap_or_default();
        let anchor = |path: PathBuf| {
            if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            }
        };
        let cues = CueConfig {
            normal: cue_section.normal.map(anchor),
            fallback: cue_section.fallback.map(anchor),
            device: overrides.device.or(cue_section.device),
            ..CueConfig::default()
        };

        let quotes = cfg
            .quotes
            .map(QuotePool::from_quotes)
            .unwrap_or_default();

        Ok(Self {
            server,
            query,
            fade,
            cues,
            audio: !overrides.no_audio,
            quotes,
            per_page: cfg.table.and_then(|t| t.per_page),
            request_timeout,
        })
    }
}

fn config_date(key: &str, raw: Option<&str>) -> Result<Option<Date>> {
    raw.map(lines::parse_date)
        .transpose()
        .map_err(|e| anyhow!("{key}: {e}"))
}

fn resolve_fade(section: FadeSection) -> Result<FadeConfig> {
    let defaults = FadeConfig::default();
    let tick = section
        .tick_ms
        .map(Duration::from_millis)
        .unwrap_or(defaults.tick);
    if tick.is_zero() {
        return Err(anyhow!("fade.tick_ms must be greater than zero"));
    }
    let step = section.step.unwrap_or(defaults.step);
    if !(step > 0.0 && step <= 1.0) {
        return Err(anyhow!("fade.step must be in (0, 1], got {step}"));
    }
    Ok(FadeConfig {
        tick,
        step,
        hold_before_fade_in: section
            .hold_before_fade_in_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.hold_before_fade_in),
        hold_before_fade_out: section
            .hold_before_fade_out_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.hold_before_fade_out),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ChantConfig {
        toml::from_str(raw).unwrap()
    }

    fn with_server() -> Overrides {
        Overrides {
            server: Some("http://localhost:5000".into()),
            ..Overrides::default()
        }
    }

    #[test]
    fn defaults_apply_when_file_is_empty() {
        let settings = Settings::resolve(ChantConfig::default(), with_server(), Path::new("/etc")).unwrap();
        assert_eq!(settings.query.mode, DisplayMode::Registrations);
        assert!(settings.query.filters.is_empty());
        assert_eq!(settings.fade, FadeConfig::default());
        assert_eq!(settings.quotes, QuotePool::default());
        assert!(settings.audio);
        assert_eq!(settings.per_page, None);
        assert_eq!(settings.query.window, DateWindow::default());
        assert_eq!(settings.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn file_values_are_parsed() {
        let cfg = parse(
            r#"
server = "https://register.example"
mode = "longest-names"
filters = ["pat"]
quotes = ["Only quote - Someone"]
first_date = "2024-01-01"
last_date = "2024-01-31"
request_timeout_ms = 2500

[fade]
tick_ms = 20
step = 0.05
hold_before_fade_in_ms = 1000
hold_before_fade_out_ms = 4000

[cues]
normal = "cues/chant.flac"
fallback = "/abs/quote.wav"
device = "USB"

[table]
per_page = 25
"#,
        );
        let settings = Settings::resolve(cfg, Overrides::default(), Path::new("/etc/chant")).unwrap();
        assert_eq!(settings.server, "https://register.example");
        assert_eq!(settings.query.mode, DisplayMode::LongestNames);
        assert_eq!(settings.query.filters, vec![Filter::Pat]);
        assert_eq!(settings.quotes.quote_for_day(5), "Only quote - Someone");
        assert_eq!(settings.fade.tick, Duration::from_millis(20));
        assert_eq!(settings.fade.step, 0.05);
        assert_eq!(settings.fade.hold_before_fade_out, Duration::from_millis(4000));
        assert_eq!(settings.cues.normal, Some(PathBuf::from("/etc/chant/cues/chant.flac")));
        assert_eq!(settings.cues.fallback, Some(PathBuf::from("/abs/quote.wav")));
        assert_eq!(settings.cues.device.as_deref(), Some("USB"));
        assert_eq!(settings.per_page, Some(25));
        assert_eq!(settings.query.window.first, lines::parse_date("2024-01-01").ok());
        assert_eq!(settings.query.window.last, lines::parse_date("2024-01-31").ok());
        assert_eq!(settings.request_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn command_line_overrides_file() {
        let cfg = parse(
            r#"
server = "http://file"
mode = "lapses"
filters = ["pat"]
first_date = "2024-01-01"
[cues]
device = "file-dev"
"#,
        );
        let overrides = Overrides {
            server: Some("http://flag".into()),
            mode: Some(DisplayMode::Movements),
            filters: vec![Filter::Tm],
            first_date: lines::parse_date("2024-02-01").ok(),
            last_date: None,
            device: Some("flag-dev".into()),
            no_audio: true,
        };
        let settings = Settings::resolve(cfg, overrides, Path::new(".")).unwrap();
        assert_eq!(settings.server, "http://flag");
        assert_eq!(settings.query.mode, DisplayMode::Movements);
        assert_eq!(settings.query.filters, vec![Filter::Tm]);
        assert_eq!(settings.cues.device.as_deref(), Some("flag-dev"));
        assert_eq!(settings.query.window.first, lines::parse_date("2024-02-01").ok());
        assert!(!settings.audio);
    }

    #[test]
    fn bad_dates_are_rejected() {
        let garbled = parse("first_date = \"01/02/2024\"\n");
        let err = Settings::resolve(garbled, with_server(), Path::new(".")).unwrap_err();
        assert!(err.to_string().starts_with("first_date: invalid date"));

        let inverted = parse("first_date = \"2024-02-01\"\nlast_date = \"2024-01-01\"\n");
        assert!(Settings::resolve(inverted, with_server(), Path::new(".")).is_err());
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let cfg = parse("request_timeout_ms = 0\n");
        assert!(Settings::resolve(cfg, with_server(), Path::new(".")).is_err());
    }

    #[test]
    fn missing_server_is_an_error() {
        let err = Settings::resolve(ChantConfig::default(), Overrides::default(), Path::new("."))
            .unwrap_err();
        assert!(err.to_string().contains("server URL is required"));
    }

    #[test]
    fn server_must_be_http() {
        let overrides = Overrides {
            server: Some("localhost:5000".into()),
            ..Overrides::default()
        };
        assert!(Settings::resolve(ChantConfig::default(), overrides, Path::new(".")).is_err());
    }

    #[test]
    fn invalid_fade_values_are_rejected() {
        let zero_tick = parse("[fade]\ntick_ms = 0\n");
        assert!(Settings::resolve(zero_tick, with_server(), Path::new(".")).is_err());
        let big_step = parse("[fade]\nstep = 1.5\n");
        assert!(Settings::resolve(big_step, with_server(), Path::new(".")).is_err());
        let zero_step = parse("[fade]\nstep = 0.0\n");
        assert!(Settings::resolve(zero_step, with_server(), Path::new(".")).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<ChantConfig>("colour = \"red\"\n").is_err());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        assert!(locate(Some(Path::new("/definitely/not/here/chant.toml"))).is_err());
    }
}
