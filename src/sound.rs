use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, trace};

use crate::{config::Config, error::CoreError};

/// One-bit beeper reconstructed from the instants the speaker bit toggles.
///
/// The emulation thread pushes transition times through a `BeeperHandle`
/// while the host audio callback pulls samples through a `BeeperSource`.
/// Both halves share the same state behind a mutex. Times are converted to
/// supersample indices on arrival, and the source walks a cursor over that
/// timeline, flipping polarity every time it reaches a queued transition.
pub fn beeper(config: &Config) -> (BeeperHandle, BeeperSource) {
    let state = Arc::new(Mutex::new(BeeperState::new(config)));
    (
        BeeperHandle {
            state: state.clone(),
        },
        BeeperSource { state },
    )
}

#[derive(Debug)]
struct BeeperState {
    /// Supersample indices of pending transitions, strictly increasing.
    transitions: VecDeque<i64>,
    bit: bool,
    cursor: i64,
    must_sync: bool,
    silent_buffers: u32,

    supersamples_per_ms: f64,
    supersample_factor: usize,
    amplitude: f32,
    resync_threshold: u32,
    /// Widest span, in supersamples, the queue may cover.
    max_backlog: i64,
    supersamples: Vec<f32>,
}

impl BeeperState {
    fn new(config: &Config) -> Self {
        let supersamples_per_ms =
            (config.supersample_factor as f64 * config.sample_rate as f64) / 1000.0;
        Self {
            transitions: VecDeque::new(),
            bit: false,
            cursor: 0,
            must_sync: true,
            silent_buffers: 0,
            supersamples_per_ms,
            supersample_factor: config.supersample_factor,
            amplitude: config.amplitude,
            resync_threshold: config.resync_threshold(),
            max_backlog: ((config.max_backlog_ms * supersamples_per_ms).round() as i64).max(1),
            supersamples: vec![0.0; config.buffer_size * config.supersample_factor],
        }
    }

    fn level(&self) -> f32 {
        if self.bit {
            self.amplitude
        } else {
            -self.amplitude
        }
    }

    fn notify(&mut self, time_ms: f64) {
        let sample = (time_ms * self.supersamples_per_ms).round() as i64;

        // two toggles on the same sample cancel out
        if self.transitions.back() == Some(&sample) {
            self.transitions.pop_back();
            return;
        }
        self.transitions.push_back(sample);

        let oldest = sample - self.max_backlog;
        let mut dropped = 0;
        while self.transitions.front().map_or(false, |&s| s < oldest) {
            self.transitions.pop_front();
            dropped += 1;
        }
        if dropped > 0 {
            // dropped transitions count as played
            if dropped % 2 == 1 {
                self.bit = !self.bit;
            }
            if !self.must_sync {
                debug!(
                    "[BEEPER] Backlog over {} supersamples, dropping oldest transitions",
                    self.max_backlog
                );
            }
            self.must_sync = true;
        }
    }

    fn render(&mut self, out: &mut [f32]) {
        if self.transitions.is_empty() {
            let level = self.level();
            out.fill(level);

            self.silent_buffers += 1;
            if self.silent_buffers > self.resync_threshold {
                self.silent_buffers = 0;
                self.must_sync = true;
            }
            return;
        }
        self.silent_buffers = 0;

        let factor = self.supersample_factor;
        let len = out.len() * factor;

        if self.must_sync {
            self.must_sync = false;
            if let Some(&last) = self.transitions.back() {
                self.cursor = last - (1.5 * len as f64) as i64;
                debug!("[BEEPER] Resync, cursor now at {}", self.cursor);
            }
        }

        let mut supersamples = std::mem::take(&mut self.supersamples);
        supersamples.resize(len, 0.0);

        let mut next = self.transitions.front().copied().unwrap_or(i64::MAX);
        for slot in supersamples.iter_mut() {
            while self.cursor >= next {
                self.bit = !self.bit;
                self.transitions.pop_front();
                next = self.transitions.front().copied().unwrap_or(i64::MAX);
            }
            *slot = self.level();
            self.cursor += 1;
        }

        for (sample, chunk) in out.iter_mut().zip(supersamples.chunks_exact(factor)) {
            *sample = chunk.iter().sum::<f32>() / factor as f32;
        }

        self.supersamples = supersamples;
    }
}

fn lock(state: &Mutex<BeeperState>) -> MutexGuard<'_, BeeperState> {
    // state is consistent between statements, so a panicked holder is harmless
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Producer half, owned by the ULA.
#[derive(Debug, Clone)]
pub struct BeeperHandle {
    state: Arc<Mutex<BeeperState>>,
}

impl BeeperHandle {
    /// Records a speaker bit toggle at `time_ms` of emulated time.
    pub fn notify_transition(&self, time_ms: f64) {
        trace!("[BEEPER] Transition at {:.3}ms", time_ms);
        lock(&self.state).notify(time_ms);
    }

    pub fn pending(&self) -> usize {
        lock(&self.state).transitions.len()
    }
}

/// Consumer half, handed to the host audio callback.
#[derive(Debug, Clone)]
pub struct BeeperSource {
    state: Arc<Mutex<BeeperState>>,
}

impl BeeperSource {
    /// Fills `out` with the next `out.len()` samples.
    pub fn render(&self, out: &mut [f32]) {
        lock(&self.state).render(out);
    }

    pub fn render_vec(&self, len: usize) -> Vec<f32> {
        let mut out = vec![0.0; len];
        self.render(&mut out);
        out
    }

    pub fn pending(&self) -> usize {
        lock(&self.state).transitions.len()
    }
}

/// Host audio device fed from a `BeeperSource`.
pub trait AudioOutput {
    fn start(&mut self, source: BeeperSource) -> Result<(), CoreError>;
}
