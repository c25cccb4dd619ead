use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tap_chaos",
    version,
    about = "Tap once, then watch the terminal escalate from calm to total chaos in ten seconds"
)]
pub struct Config {
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Seed for every random stream; entropy when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip the audio device entirely.
    #[arg(long, default_value_t = false)]
    pub mute: bool,

    /// Substring of the output device name to use.
    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    /// Write logs here; nothing is logged without it.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub hud: bool,
}

impl Config {
    pub fn seed_or_entropy(&self) -> u64 {
        self.seed.unwrap_or_else(|| fastrand::u64(..))
    }

    pub fn frame_budget(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f32(1.0 / self.fps.clamp(1, 240) as f32)
    }
}
