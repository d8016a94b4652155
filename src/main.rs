//! Crop Match — harvest pairs of ripe crops on a small farm before the clock runs out.

mod app;
mod crops;
mod game;
mod grid;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppConfig};
use clap::Parser;
use game::{Session, SessionConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref()).unwrap_or_else(|e| {
        log::warn!("theme not loaded ({}), using defaults", e);
        theme::Theme::default()
    });
    let config = args.session_config();
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let session = Session::new(config, rng).context("invalid game settings")?;
    let mut app = App::new(session, theme, args.app_config())?;
    app.run()?;
    Ok(())
}

/// Send `log` records to `path` when given; otherwise logging stays off so the
/// alternate screen is never written over.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(())
}

/// Match pairs of ripe crops on a farm grid before time runs out.
#[derive(Debug, Parser)]
#[command(
    name = "cropmatch",
    version,
    about = "Match pairs of ripe crops on a small farm grid before the clock runs out.",
    long_about = "Crops sprout on a square farm and ripen over a few seconds. Pick two ripe crops \
        of the same kind to harvest them; consecutive harvests build a combo multiplier, and any \
        miss (unripe crop, different kinds, same plot twice) resets it.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor    Enter / Space  Select (or start)\n  \
        Mouse click    Select plot    R              Retry after game over\n  Q / Esc        Quit"
)]
pub struct Args {
    /// Side length of the square farm grid.
    #[arg(long, default_value_t = game::DEFAULT_GRID_SIZE as u8, value_name = "N",
          value_parser = clap::value_parser!(u8).range(1..=16))]
    pub grid_size: u8,

    /// Countdown length in seconds (ticks).
    #[arg(short, long, default_value_t = game::DEFAULT_TIME_LIMIT, value_name = "SECS")]
    pub time_limit: u32,

    /// Plots left empty when a game starts.
    #[arg(long, default_value_t = game::DEFAULT_EMPTY_CELLS, value_name = "N")]
    pub empty_cells: usize,

    /// Milliseconds per growth/countdown tick.
    #[arg(long, default_value_t = game::DEFAULT_TICK_MS, value_name = "MS")]
    pub tick_ms: u64,

    /// Seed for the crop spawner (random if not set).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Skip the start screen and begin immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the harvest flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Ring the terminal bell on harvests, misses and game over.
    #[arg(long)]
    pub bell: bool,

    /// Write log records to FILE (level from RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            grid_size: usize::from(self.grid_size),
            initial_time: self.time_limit,
            empty_cells: self.empty_cells,
            tick_interval: Duration::from_millis(self.tick_ms),
            ..SessionConfig::default()
        }
    }

    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            no_menu: self.no_menu,
            no_animation: self.no_animation,
            bell: self.bell,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_engine_constants() {
        let args = Args::parse_from(["cropmatch"]);
        assert_eq!(args.session_config(), SessionConfig::default());
        assert_eq!(args.app_config(), AppConfig::default());
    }

    #[test]
    fn test_flags_flow_into_configs() {
        let args = Args::parse_from([
            "cropmatch",
            "--grid-size",
            "4",
            "-t",
            "10",
            "--empty-cells",
            "2",
            "--tick-ms",
            "250",
            "--no-menu",
            "--bell",
        ]);
        let config = args.session_config();
        assert_eq!(config.grid_size, 4);
        assert_eq!(config.initial_time, 10);
        assert_eq!(config.empty_cells, 2);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert!(args.app_config().no_menu);
        assert!(args.app_config().bell);
        assert!(!args.app_config().no_animation);
    }

    #[test]
    fn test_grid_size_range_enforced() {
        assert!(Args::try_parse_from(["cropmatch", "--grid-size", "0"]).is_err());
    }
}
