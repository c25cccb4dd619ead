use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tap_chaos::audio::SilentAudio;
use tap_chaos::entity::Family;
use tap_chaos::gesture::{Point, RawInput};
use tap_chaos::media::ClockedMedia;
use tap_chaos::session::ChaosSession;

/// Runs a session without a terminal and prints one line per second of virtual time.
#[derive(Parser, Debug)]
#[command(name = "chaos_timeline", version)]
struct Args {
    #[arg(long, default_value_t = 1)]
    seed: u64,

    #[arg(long, default_value_t = 12_000)]
    duration_ms: u64,

    /// Frame step of the virtual clock.
    #[arg(long, default_value_t = 16)]
    step_ms: u64,

    /// Times (ms) at which to swipe up to the next video.
    #[arg(long, value_delimiter = ',')]
    swipe_at: Vec<u64>,

    /// Video sources that fail to play, to exercise recovery.
    #[arg(long, value_delimiter = ',')]
    broken: Vec<String>,

    #[arg(long)]
    log_file: Option<PathBuf>,
}

const FAMILIES: [(Family, &str); 8] = [
    (Family::VideoClone, "clones"),
    (Family::BrandImage, "images"),
    (Family::BrandText, "brand"),
    (Family::BrandLogo, "logos"),
    (Family::MemeText, "memes"),
    (Family::BirthdayText, "bday"),
    (Family::CorruptionRect, "glitch"),
    (Family::FakePopup, "popups"),
];

fn main() -> Result<()> {
    let args = Args::parse();
    tap_chaos::logging::init(args.log_file.as_deref())?;

    let broken: Vec<&str> = args.broken.iter().map(String::as_str).collect();
    let media = ClockedMedia::new(4_000).with_broken(&broken);
    let mut session = ChaosSession::new(Box::new(SilentAudio::new(600)), Box::new(media), args.seed, 0);

    let tap = Point::new(100.0, 100.0);
    let _ = session.handle_input(&RawInput::PointerDown(tap), 0);
    let _ = session.handle_input(&RawInput::PointerUp(tap), 0);

    let mut out = io::stdout().lock();
    let step = args.step_ms.max(1);
    let mut swipes = args.swipe_at.clone();
    swipes.sort_unstable();
    let mut swipes = swipes.into_iter().peekable();
    let mut next_report = 0u64;
    let mut now = 0u64;

    while now <= args.duration_ms {
        while swipes.peek().is_some_and(|&t| t <= now) {
            let _ = swipes.next();
            let from = Point::new(100.0, 400.0);
            let to = Point::new(100.0, 200.0);
            let _ = session.handle_input(&RawInput::PointerDown(from), now);
            let _ = session.handle_input(&RawInput::PointerUp(to), now);
            writeln!(out, "{now:>6}ms  swipe -> media {}", session.media_index())?;
        }

        session.advance(now);
        if now >= next_report {
            report(&mut out, &session, now).context("write timeline")?;
            next_report += 1000;
        }
        now += step;
    }
    Ok(())
}

fn report(out: &mut impl Write, session: &ChaosSession, now: u64) -> io::Result<()> {
    let stage = session.stage();
    let level = session.level().map_or(0, |l| l.get());
    let f = stage.filters();
    write!(
        out,
        "{now:>6}ms  level {level:>2}  media {}  videos {:>2}",
        session.media_index(),
        stage.video_count()
    )?;
    for (family, name) in FAMILIES {
        let n = stage.pool(family).map_or(0, |p| p.len());
        write!(out, "  {name} {n:>2}")?;
    }
    let shake = stage.shake_offset();
    writeln!(
        out,
        "  sounds {}  shake ({:+.1},{:+.1})  hue {:>5.1}  sat {:>5.1}  inv {}  aberr {:.1}  timers {}",
        session.audio().open_count(),
        shake.x,
        shake.y,
        f.hue,
        f.saturation,
        if f.inverted { 'y' } else { 'n' },
        f.chromatic_aberration,
        stage.pending_timers() + session.clock().pending_timers(),
    )
}
