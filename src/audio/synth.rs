//! cpal-backed [`AudioEngine`] that synthesises every stinger on the fly.
//!
//! The main thread never touches voice state. Commands go to the output callback through one
//! SPSC ring, end-of-sound notices come back through another.

use super::{AudioEngine, AudioError, AudioEvent, SoundHandle};
use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::f32::consts::TAU;
use std::io::{self, Write};

const COMMAND_CAPACITY: usize = 512;
const NOTICE_CAPACITY: usize = 256;
const MASTER_GAIN: f32 = 0.25;
const ATTACK_MS: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wave {
    Sine,
    Square,
    Saw,
    Noise,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Recipe {
    pub wave: Wave,
    pub start_hz: f32,
    pub end_hz: f32,
    pub duration_ms: u32,
    /// Amplitude wobble, `0` for none.
    pub tremolo_hz: f32,
}

impl Recipe {
    const fn new(wave: Wave, start_hz: f32, end_hz: f32, duration_ms: u32, tremolo_hz: f32) -> Self {
        Self {
            wave,
            start_hz,
            end_hz,
            duration_ms,
            tremolo_hz,
        }
    }
}

/// Synth patch for a manifest id; `None` for anything it cannot "decode".
pub fn recipe_for(source: &str) -> Option<Recipe> {
    let name = source.rsplit('/').next()?;
    let r = match name {
        "airhorn" => Recipe::new(Wave::Saw, 440.0, 445.0, 900, 14.0),
        "vine-boom" => Recipe::new(Wave::Sine, 95.0, 38.0, 700, 0.0),
        "bruh" => Recipe::new(Wave::Square, 140.0, 105.0, 500, 0.0),
        "sad-violin" => Recipe::new(Wave::Saw, 660.0, 520.0, 1400, 6.0),
        "record-scratch" => Recipe::new(Wave::Noise, 0.0, 0.0, 380, 22.0),
        "oof" => Recipe::new(Wave::Square, 320.0, 150.0, 300, 0.0),
        "bonk" => Recipe::new(Wave::Sine, 820.0, 180.0, 180, 0.0),
        "explosion" => Recipe::new(Wave::Noise, 0.0, 0.0, 1100, 0.0),
        "error-ding" => Recipe::new(Wave::Sine, 880.0, 880.0, 500, 0.0),
        "dial-up" => Recipe::new(Wave::Square, 1200.0, 2400.0, 1500, 30.0),
        "kazoo-birthday" => Recipe::new(Wave::Saw, 523.0, 392.0, 1200, 8.0),
        "laugh-track" => Recipe::new(Wave::Noise, 0.0, 0.0, 1300, 7.0),
        _ => return None,
    };
    Some(r)
}

#[derive(Clone, Copy, Debug)]
enum Command {
    Create {
        handle: SoundHandle,
        recipe: Recipe,
        volume: f32,
    },
    Play(SoundHandle),
    SetVolume(SoundHandle, f32),
    Fade {
        handle: SoundHandle,
        from: f32,
        to: f32,
        duration_ms: u64,
    },
    Unload(SoundHandle),
}

#[derive(Clone, Copy, Debug)]
struct Fade {
    from: f32,
    to: f32,
    total: u64,
    done: u64,
}

#[derive(Clone, Debug)]
struct Voice {
    handle: SoundHandle,
    recipe: Recipe,
    volume: f32,
    fade: Option<Fade>,
    playing: bool,
    t: u64,
    phase: f32,
    noise: u32,
}

impl Voice {
    fn gain(&mut self) -> f32 {
        let Some(f) = self.fade.as_mut() else {
            return self.volume;
        };
        f.done += 1;
        let g = f.from + (f.to - f.from) * (f.done as f32 / f.total.max(1) as f32);
        if f.done >= f.total {
            self.volume = f.to;
            self.fade = None;
        }
        g
    }

    fn next_sample(&mut self, sr: f32) -> Option<f32> {
        let total = (self.recipe.duration_ms as f32 * sr / 1000.0) as u64;
        if self.t >= total {
            return None;
        }
        let p = self.t as f32 / total.max(1) as f32;
        let hz = self.recipe.start_hz + (self.recipe.end_hz - self.recipe.start_hz) * p;
        self.phase = (self.phase + hz / sr).fract();

        let raw = match self.recipe.wave {
            Wave::Sine => (self.phase * TAU).sin(),
            Wave::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Wave::Saw => self.phase * 2.0 - 1.0,
            Wave::Noise => {
                // xorshift32
                let mut x = self.noise;
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                self.noise = x;
                (x as f32 / u32::MAX as f32) * 2.0 - 1.0
            }
        };

        let secs = self.t as f32 / sr;
        let attack = (secs * 1000.0 / ATTACK_MS).min(1.0);
        let env = attack * (1.0 - p);
        let trem = if self.recipe.tremolo_hz > 0.0 {
            0.6 + 0.4 * (TAU * self.recipe.tremolo_hz * secs).sin()
        } else {
            1.0
        };
        self.t += 1;
        Some(raw * env * trem * self.gain())
    }
}

struct Mixer {
    voices: Vec<Voice>,
    commands: HeapCons<Command>,
    notices: HeapProd<SoundHandle>,
    /// End notices the ring had no room for; retried every callback.
    unsent: Vec<SoundHandle>,
    sample_rate: f32,
}

impl Mixer {
    fn drain_commands(&mut self) {
        while let Some(cmd) = self.commands.try_pop() {
            match cmd {
                Command::Create {
                    handle,
                    recipe,
                    volume,
                } => self.voices.push(Voice {
                    handle,
                    recipe,
                    volume,
                    fade: None,
                    playing: false,
                    t: 0,
                    phase: 0.0,
                    noise: 0x9e37_79b9 ^ (handle.0 as u32).wrapping_mul(2_654_435_761),
                }),
                Command::Play(handle) => {
                    if let Some(v) = self.voice_mut(handle) {
                        v.playing = true;
                    }
                }
                Command::SetVolume(handle, volume) => {
                    if let Some(v) = self.voice_mut(handle) {
                        v.volume = volume;
                    }
                }
                Command::Fade {
                    handle,
                    from,
                    to,
                    duration_ms,
                } => {
                    let total = (duration_ms as f32 * self.sample_rate / 1000.0) as u64;
                    if let Some(v) = self.voice_mut(handle) {
                        v.fade = Some(Fade {
                            from,
                            to,
                            total,
                            done: 0,
                        });
                    }
                }
                Command::Unload(handle) => self.voices.retain(|v| v.handle != handle),
            }
        }
    }

    fn voice_mut(&mut self, handle: SoundHandle) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.handle == handle)
    }

    fn render<T>(&mut self, data: &mut [T], channels: usize)
    where
        T: SizedSample + FromSample<f32>,
    {
        self.drain_commands();
        let sr = self.sample_rate;
        for frame in data.chunks_mut(channels.max(1)) {
            let mut acc = 0.0f32;
            for v in self.voices.iter_mut().filter(|v| v.playing) {
                match v.next_sample(sr) {
                    Some(s) => acc += s,
                    None => {
                        v.playing = false;
                        self.unsent.push(v.handle);
                    }
                }
            }
            let out = (acc * MASTER_GAIN).clamp(-1.0, 1.0);
            for s in frame.iter_mut() {
                *s = T::from_sample(out);
            }
        }
        self.flush_notices();
    }

    fn flush_notices(&mut self) {
        let notices = &mut self.notices;
        self.unsent.retain(|h| notices.try_push(*h).is_err());
    }
}

pub struct SynthAudio {
    stream: cpal::Stream,
    commands: HeapProd<Command>,
    notices: HeapCons<SoundHandle>,
    next: u64,
    pub sample_rate_hz: u32,
}

impl SynthAudio {
    /// Builds the output stream paused; [`AudioEngine::resume`] starts it.
    pub fn new(device_query: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_output_device(&host, device_query)?;
        let supported = device
            .default_output_config()
            .context("get default output config")?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();

        let (commands, command_rx) = HeapRb::<Command>::new(COMMAND_CAPACITY).split();
        let (notice_tx, notices) = HeapRb::<SoundHandle>::new(NOTICE_CAPACITY).split();
        let mut mixer = Mixer {
            voices: Vec::new(),
            commands: command_rx,
            notices: notice_tx,
            unsent: Vec::new(),
            sample_rate: sample_rate_hz as f32,
        };

        let err_fn = |err| tracing::warn!("audio stream error: {err}");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_output_stream(
                &config,
                move |data: &mut [f32], _| mixer.render(data, channels),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _| mixer.render(data, channels),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_output_stream(
                &config,
                move |data: &mut [u16], _| mixer.render(data, channels),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };
        // Some backends start streams on creation; hold it until the first gesture.
        let _ = stream.pause();

        Ok(Self {
            stream,
            commands,
            notices,
            next: 1,
            sample_rate_hz,
        })
    }

    fn send(&mut self, cmd: Command) -> Result<(), AudioError> {
        self.commands
            .try_push(cmd)
            .map_err(|_| AudioError::Backend("command queue full".to_string()))
    }
}

impl AudioEngine for SynthAudio {
    fn name(&self) -> &'static str {
        "synth"
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.stream
            .play()
            .map_err(|e| AudioError::ContextSuspended(e.to_string()))
    }

    fn create(&mut self, source: &str, volume: f32) -> Result<SoundHandle, AudioError> {
        let recipe = recipe_for(source).ok_or_else(|| AudioError::UnknownSource(source.to_string()))?;
        let handle = SoundHandle(self.next);
        self.next += 1;
        self.send(Command::Create {
            handle,
            recipe,
            volume,
        })?;
        Ok(handle)
    }

    fn play(&mut self, handle: SoundHandle) -> Result<(), AudioError> {
        self.send(Command::Play(handle))
    }

    fn set_volume(&mut self, handle: SoundHandle, volume: f32) {
        let _ = self.send(Command::SetVolume(handle, volume));
    }

    fn fade(&mut self, handle: SoundHandle, from: f32, to: f32, duration_ms: u64) {
        let _ = self.send(Command::Fade {
            handle,
            from,
            to,
            duration_ms,
        });
    }

    fn unload(&mut self, handle: SoundHandle) {
        let _ = self.send(Command::Unload(handle));
    }

    fn poll_events(&mut self, _now_ms: u64) -> Vec<AudioEvent> {
        let mut out = Vec::new();
        while let Some(handle) = self.notices.try_pop() {
            out.push(AudioEvent::End(handle));
        }
        out
    }
}

pub fn list_output_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .context("enumerate output devices")?;

    let mut out = io::stdout();
    writeln!(out, "Output devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

fn select_output_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> anyhow::Result<cpal::Device> {
    if let Some(want) = device_query.map(|s| s.to_lowercase()) {
        let devices = host
            .output_devices()
            .context("enumerate output devices")?
            .collect::<Vec<_>>();
        if let Some(dev) = devices.iter().find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(&want))
                .unwrap_or(false)
        }) {
            return Ok(dev.clone());
        }
        return Err(anyhow!("no output device matching {want:?}"));
    }
    host.default_output_device()
        .ok_or_else(|| anyhow!("no default output device"))
}
