use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Timing, video and audio parameters of the emulated 48K machine.
///
/// Every field has a default matching the real hardware (or the value the
/// emulator has always used), so a partial JSON document is enough to
/// override a single knob.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// CPU clock in kHz, i.e. cycles per millisecond.
    pub cpu_frequency_khz: u32,
    /// Nominal duration of one frame (one maskable interrupt) in ms.
    pub frame_time_ms: f64,
    /// Host deltas above this are treated as a stall and replaced by one frame.
    pub max_frame_delta_ms: f64,
    /// FLASH attribute inversion period in ms.
    pub flash_period_ms: f64,
    /// Extra cycles charged for each access to contended RAM.
    pub contention_penalty: u32,
    pub x_border: usize,
    pub y_border: usize,
    /// Border colour shown before the program writes the ULA port.
    pub initial_border: u8,

    pub sample_rate: u32,
    /// Samples per host audio buffer; must be a power of two.
    pub buffer_size: usize,
    pub supersample_factor: usize,
    pub amplitude: f32,
    /// Seconds of silent buffers after which the beeper cursor is resynced.
    pub resync_after_secs: f64,
    /// Longest stretch of speaker transitions kept for the audio side, in ms
    /// of emulated time. Older ones are dropped when nobody renders.
    pub max_backlog_ms: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cpu_frequency_khz: 3500,
            frame_time_ms: 20.0,
            max_frame_delta_ms: 500.0,
            flash_period_ms: 320.0,
            contention_penalty: 8000,
            x_border: 32,
            y_border: 24,
            initial_border: 7,

            sample_rate: 44_100,
            buffer_size: 2048,
            supersample_factor: 4,
            amplitude: 0.125,
            resync_after_secs: 0.2,
            max_backlog_ms: 1000.0,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Config =
            serde_json::from_str(json).context("Unable to parse machine configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.cpu_frequency_khz > 0, "cpu_frequency_khz must be positive");
        ensure!(self.frame_time_ms > 0.0, "frame_time_ms must be positive");
        ensure!(
            self.max_frame_delta_ms >= self.frame_time_ms,
            "max_frame_delta_ms ({}) must not be shorter than a frame ({})",
            self.max_frame_delta_ms,
            self.frame_time_ms
        );
        ensure!(self.flash_period_ms > 0.0, "flash_period_ms must be positive");
        ensure!(self.initial_border < 8, "initial_border must be a colour index 0-7");
        ensure!(self.sample_rate > 0, "sample_rate must be positive");
        ensure!(
            self.buffer_size.is_power_of_two(),
            "buffer_size must be a power of two, got {}",
            self.buffer_size
        );
        ensure!(self.supersample_factor >= 1, "supersample_factor must be at least 1");
        ensure!(
            self.amplitude > 0.0 && self.amplitude <= 1.0,
            "amplitude must be in (0, 1]"
        );
        ensure!(self.max_backlog_ms > 0.0, "max_backlog_ms must be positive");
        Ok(())
    }

    /// CPU cycles in one nominal frame.
    pub fn cycles_per_frame(&self) -> i64 {
        (self.cpu_frequency_khz as f64 * self.frame_time_ms).round() as i64
    }

    pub fn frame_width(&self) -> usize {
        256 + 2 * self.x_border
    }

    pub fn frame_height(&self) -> usize {
        192 + 2 * self.y_border
    }

    /// Number of consecutive silent buffers that arms a beeper resync.
    pub fn resync_threshold(&self) -> u32 {
        (self.resync_after_secs * self.sample_rate as f64 / self.buffer_size as f64) as u32
    }
}
