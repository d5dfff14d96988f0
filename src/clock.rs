use crate::config::Config;

/// Events produced when a frame is closed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    FlashToggled(bool),
    FrameEnd(u64),
}

/// Frame pacing for the machine.
///
/// Host time is accumulated in milliseconds and spent one nominal frame at a
/// time. Within a frame, CPU cycles are counted against a fixed budget; what
/// an instruction overshoots is carried into the next frame instead of being
/// dropped, which keeps emulated time (and with it the beeper timestamps)
/// in step with the CPU.
#[derive(Debug, Clone)]
pub struct Clock {
    frame_time_ms: f64,
    max_frame_delta_ms: f64,
    flash_period_ms: f64,
    cycles_per_ms: f64,
    cycles_per_frame: i64,

    /// Host time not yet turned into frames
    accumulated_ms: f64,

    /// Timestamp of the previous host tick, if any
    last_timestamp_ms: Option<f64>,

    flash_elapsed_ms: f64,
    flash_inverted: bool,

    frame_count: u64,

    /// Cycles into the current frame, including carry from the previous one
    cycle_count: i64,

    total_cycles: u64,
}

impl Clock {
    pub fn new(config: &Config) -> Self {
        Self {
            frame_time_ms: config.frame_time_ms,
            max_frame_delta_ms: config.max_frame_delta_ms,
            flash_period_ms: config.flash_period_ms,
            cycles_per_ms: config.cpu_frequency_khz as f64,
            cycles_per_frame: config.cycles_per_frame(),
            accumulated_ms: 0.0,
            last_timestamp_ms: None,
            flash_elapsed_ms: 0.0,
            flash_inverted: false,
            frame_count: 0,
            cycle_count: 0,
            total_cycles: 0,
        }
    }

    /// Adds `delta_ms` of host time. A delta longer than the stall limit
    /// (hidden tab, debugger) counts as a single frame.
    pub fn elapse(&mut self, delta_ms: f64) {
        let delta = if delta_ms > self.max_frame_delta_ms {
            self.frame_time_ms
        } else {
            delta_ms.max(0.0)
        };
        self.accumulated_ms += delta;
    }

    /// Host timestamp flavour of `elapse`. The first timestamp after a reset
    /// of the baseline only records it.
    pub fn elapse_to(&mut self, timestamp_ms: f64) {
        if let Some(last) = self.last_timestamp_ms {
            self.elapse(timestamp_ms - last);
        }
        self.last_timestamp_ms = Some(timestamp_ms);
    }

    /// Forgets the previous host timestamp and any unspent host time.
    pub fn reset_baseline(&mut self) {
        self.last_timestamp_ms = None;
        self.accumulated_ms = 0.0;
    }

    pub fn frame_due(&self) -> bool {
        self.accumulated_ms >= self.frame_time_ms
    }

    pub fn budget_exhausted(&self) -> bool {
        self.cycle_count >= self.cycles_per_frame
    }

    pub fn add_cycles(&mut self, cycles: u32) {
        self.cycle_count += cycles as i64;
        self.total_cycles += cycles as u64;
    }

    /// Spends the rest of the frame budget idling, as a halted CPU does
    /// until the next interrupt.
    pub fn idle_to_frame_end(&mut self) {
        let remaining = self.cycles_per_frame - self.cycle_count;
        if remaining > 0 {
            self.cycle_count += remaining;
            self.total_cycles += remaining as u64;
        }
    }

    /// Closes the current frame: carries the cycle overshoot, advances the
    /// FLASH phase and spends one frame of host time.
    pub fn end_frame(&mut self) -> Vec<ClockEvent> {
        let mut events = Vec::new();

        self.cycle_count -= self.cycles_per_frame;

        self.flash_elapsed_ms += self.frame_time_ms;
        if self.flash_elapsed_ms >= self.flash_period_ms {
            self.flash_elapsed_ms -= self.flash_period_ms;
            self.flash_inverted = !self.flash_inverted;
            events.push(ClockEvent::FlashToggled(self.flash_inverted));
        }

        self.frame_count += 1;
        self.accumulated_ms -= self.frame_time_ms;
        events.push(ClockEvent::FrameEnd(self.frame_count));

        events
    }

    /// Emulated time in ms: whole frames plus the cycles run in this one.
    pub fn now_ms(&self) -> f64 {
        self.frame_count as f64 * self.frame_time_ms + self.cycle_count as f64 / self.cycles_per_ms
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn cycle_count(&self) -> i64 {
        self.cycle_count
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn cycles_per_frame(&self) -> i64 {
        self.cycles_per_frame
    }

    pub fn is_flash_inverted(&self) -> bool {
        self.flash_inverted
    }

    pub fn accumulated_ms(&self) -> f64 {
        self.accumulated_ms
    }
}
