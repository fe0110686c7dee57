//! meme_stage: interactive entry point.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use meme_rules::AssetDirs;
use meme_stage::audio::SoundBackend;
use meme_stage::{run, AppConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "meme_stage")]
#[command(about = "Show a meme when you strike a pose", long_about = None)]
struct Cli {
    /// Meme definition document
    #[arg(short, long, default_value = "config/memes.json")]
    config: PathBuf,

    /// Asset root holding `memes/` and `sounds/`
    #[arg(short, long, default_value = "assets")]
    assets: PathBuf,

    /// Replay recorded frames (JSON lines) instead of the keyboard simulator
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Run without a window; requires --replay
    #[arg(long, requires = "replay")]
    headless: bool,

    /// Disable sound output
    #[arg(long)]
    no_sound: bool,

    /// Hide landmark dots
    #[arg(long)]
    no_landmarks: bool,

    /// Milliseconds between replayed frames
    #[arg(long)]
    frame_ms: Option<u64>,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn app_config(&self) -> AppConfig {
        AppConfig {
            config_path:    self.config.clone(),
            assets:         AssetDirs::under(&self.assets),
            replay:         self.replay.clone(),
            headless:       self.headless,
            sound:          if self.no_sound { SoundBackend::Silent } else { SoundBackend::preferred() },
            show_landmarks: !self.no_landmarks,
            frame_interval: self.frame_ms.map(Duration::from_millis),
            ..AppConfig::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let cfg = cli.app_config();
    info!(
        config   = %cfg.config_path.display(),
        replay   = ?cfg.replay,
        headless = cfg.headless,
        "starting meme stage",
    );

    run(cfg).context("meme stage failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_app_config() {
        let cli = Cli::parse_from(["meme_stage"]);
        let cfg = cli.app_config();
        let want = AppConfig::default();
        assert_eq!(cfg.config_path, want.config_path);
        assert_eq!(cfg.assets, want.assets);
        assert_eq!(cfg.sound, SoundBackend::preferred());
        assert!(cfg.show_landmarks);
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "meme_stage", "--replay", "run.jsonl", "--headless", "--no-sound",
            "--no-landmarks", "--frame-ms", "20", "--assets", "media",
        ]);
        let cfg = cli.app_config();
        assert!(cfg.headless);
        assert_eq!(cfg.replay, Some(PathBuf::from("run.jsonl")));
        assert_eq!(cfg.sound, SoundBackend::Silent);
        assert!(!cfg.show_landmarks);
        assert_eq!(cfg.frame_interval, Some(Duration::from_millis(20)));
        assert_eq!(cfg.assets.images, PathBuf::from("media/memes"));
    }

    #[test]
    fn headless_requires_replay() {
        assert!(Cli::try_parse_from(["meme_stage", "--headless"]).is_err());
    }
}
