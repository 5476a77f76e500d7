//! Wall-clock audio output.
//!
//! Plays nothing; it keeps the time a real device would, so the remote voice
//! can be driven from a terminal.  Clones share state: the engine owns one
//! handle while the host polls another for clip ends.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::audio::AudioClip;

use super::remote::AudioOutput;

#[derive(Debug)]
struct ClipEnd {
    id: u64,
    at: f64,
}

#[derive(Debug)]
struct ClockState {
    origin: Instant,
    suspended_at: Option<Instant>,
    suspended_total: Duration,
    clip: Option<ClipEnd>,
    next_id: u64,
}

impl ClockState {
    fn now(&self) -> f64 {
        let reading = self.suspended_at.unwrap_or_else(Instant::now);
        reading
            .saturating_duration_since(self.origin)
            .saturating_sub(self.suspended_total)
            .as_secs_f64()
    }
}

#[derive(Debug, Clone)]
pub struct ClockOutput {
    state: Arc<Mutex<ClockState>>,
}

impl Default for ClockOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockOutput {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState {
                origin: Instant::now(),
                suspended_at: None,
                suspended_total: Duration::ZERO,
                clip: None,
                next_id: 1,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Id of the clip that has just run out, reported once.
    pub fn ended_clip(&self) -> Option<u64> {
        let mut s = self.state();
        let now = s.now();
        if s.clip.as_ref().is_some_and(|end| now >= end.at) {
            s.clip.take().map(|end| end.id)
        } else {
            None
        }
    }
}

impl AudioOutput for ClockOutput {
    fn now(&self) -> f64 {
        self.state().now()
    }

    fn play(&mut self, clip: &AudioClip, offset: f64) -> anyhow::Result<u64> {
        let mut s = self.state();
        let id = s.next_id;
        s.next_id += 1;
        let remaining = (clip.duration() - offset).max(0.0);
        let at = s.now() + remaining;
        s.clip = Some(ClipEnd { id, at });
        Ok(id)
    }

    fn suspend(&mut self) -> anyhow::Result<()> {
        let mut s = self.state();
        if s.suspended_at.is_none() {
            s.suspended_at = Some(Instant::now());
        }
        Ok(())
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        let mut s = self.state();
        if let Some(at) = s.suspended_at.take() {
            s.suspended_total += at.elapsed();
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.state().clip = None;
    }
}
