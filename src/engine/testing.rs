//! Test doubles for the two timing-source boundaries.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::bail;

use crate::audio::AudioClip;
use crate::fetch::AudioItem;
use crate::timing;

use super::local::SpeechEngine;
use super::remote::AudioOutput;

/// Silent clip of `duration` seconds with estimated timings for `words`.
pub fn clip_item(words: &[String], duration: f64) -> AudioItem {
    let sample_rate = 1_000;
    let clip = AudioClip {
        samples: vec![0.0; (duration * sample_rate as f64).round() as usize],
        sample_rate,
        channels: 1,
    };
    let timings = timing::estimate(words, clip.duration());
    AudioItem { clip, timings }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Play {
    pub id: u64,
    pub offset: f64,
    pub duration: f64,
}

#[derive(Default)]
struct OutputState {
    now: f64,
    rate: Option<f64>,
    suspended: bool,
    plays: Vec<Play>,
    suspends: usize,
    resumes: usize,
    stops: usize,
    fail_next: bool,
}

/// Audio output whose clock only moves when told to.
#[derive(Clone, Default)]
pub struct ManualOutput(Arc<Mutex<OutputState>>);

impl ManualOutput {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, OutputState> {
        self.0.lock().unwrap()
    }

    /// Move the clock forward, unless suspended.
    pub fn advance(&self, seconds: f64) {
        let mut s = self.state();
        if !s.suspended {
            s.now += seconds;
        }
    }

    pub fn set_rate(&self, rate: f64) {
        self.state().rate = Some(rate);
    }

    pub fn fail_next_play(&self) {
        self.state().fail_next = true;
    }

    pub fn plays(&self) -> Vec<Play> {
        self.state().plays.clone()
    }

    pub fn last_id(&self) -> u64 {
        self.state().plays.last().map(|p| p.id).unwrap()
    }

    pub fn suspends(&self) -> usize {
        self.state().suspends
    }

    pub fn resumes(&self) -> usize {
        self.state().resumes
    }

    pub fn stops(&self) -> usize {
        self.state().stops
    }
}

impl AudioOutput for ManualOutput {
    fn now(&self) -> f64 {
        self.state().now
    }

    fn play(&mut self, clip: &AudioClip, offset: f64) -> anyhow::Result<u64> {
        let mut s = self.state();
        if std::mem::take(&mut s.fail_next) {
            bail!("device lost");
        }
        let id = s.plays.len() as u64 + 100;
        s.plays.push(Play { id, offset, duration: clip.duration() });
        Ok(id)
    }

    fn suspend(&mut self) -> anyhow::Result<()> {
        let mut s = self.state();
        s.suspended = true;
        s.suspends += 1;
        Ok(())
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        let mut s = self.state();
        s.suspended = false;
        s.resumes += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.state().stops += 1;
    }

    fn playback_rate(&self) -> f64 {
        self.state().rate.unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: u64,
    pub text: String,
    pub rate: f32,
}

#[derive(Default)]
struct EngineState {
    spoken: Vec<Utterance>,
    pauses: usize,
    resumes: usize,
    cancels: usize,
}

/// Speech engine that records what it was asked to say.
#[derive(Clone, Default)]
pub struct RecordingEngine(Arc<Mutex<EngineState>>);

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.0.lock().unwrap().spoken.clone()
    }

    pub fn last(&self) -> Utterance {
        self.spoken().pop().unwrap()
    }

    pub fn pauses(&self) -> usize {
        self.0.lock().unwrap().pauses
    }

    pub fn resumes(&self) -> usize {
        self.0.lock().unwrap().resumes
    }

    pub fn cancels(&self) -> usize {
        self.0.lock().unwrap().cancels
    }
}

impl SpeechEngine for RecordingEngine {
    fn speak(&mut self, text: &str, rate: f32) -> anyhow::Result<u64> {
        let mut s = self.0.lock().unwrap();
        let id = s.spoken.len() as u64 + 1;
        s.spoken.push(Utterance { id, text: text.to_string(), rate });
        Ok(id)
    }

    fn pause(&mut self) -> anyhow::Result<()> {
        self.0.lock().unwrap().pauses += 1;
        Ok(())
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        self.0.lock().unwrap().resumes += 1;
        Ok(())
    }

    fn cancel(&mut self) {
        self.0.lock().unwrap().cancels += 1;
    }
}
