use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = tap_chaos::config::Config::parse();
    if cfg.list_devices {
        tap_chaos::audio::synth::list_output_devices()?;
        return Ok(());
    }

    tap_chaos::logging::init(cfg.log_file.as_deref())?;
    tap_chaos::app::run(cfg)
}
