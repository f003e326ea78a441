//! Simulation clock.
//!
//! Turns wall-clock frames into [`SimParams`]: one delta time and one fresh
//! random seed per simulation step.
//!
//! # Example
//!
//! ```ignore
//! use wgpu_gallery::clock::SimClock;
//!
//! let mut clock = SimClock::seeded(42);
//! clock.set_fixed_delta(Some(1.0 / 60.0));
//!
//! // In the frame loop:
//! let params = clock.tick();
//! queue.write_buffer(&sim_params_buffer, 0, bytemuck::bytes_of(&params));
//! ```

use std::time::{Duration, Instant};

use glam::Vec4;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::particle::SimParams;

/// Largest variable delta handed to the simulation. Longer frames (window
/// drags, debugger pauses) are clamped so particles do not tunnel the ground.
pub const MAX_DELTA: f32 = 0.1;

/// Frame timing plus the per-step seed generator.
#[derive(Debug)]
pub struct SimClock {
    last_frame: Instant,
    delta_secs: f32,
    sim_time: f64,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
    fixed_delta: Option<f32>,
    time_scale: f32,
    rng: SmallRng,
}

impl SimClock {
    /// A clock seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    /// A clock whose seed sequence is reproducible.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rng: SmallRng) -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            delta_secs: 0.0,
            sim_time: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
            rng,
        }
    }

    /// Advance one frame and return the parameters for this step.
    ///
    /// While paused the delta is 0; a new seed is still drawn.
    pub fn tick(&mut self) -> SimParams {
        let now = Instant::now();

        if self.paused {
            self.delta_secs = 0.0;
        } else {
            let raw_delta = now.duration_since(self.last_frame).as_secs_f32().min(MAX_DELTA);
            self.delta_secs = self.fixed_delta.unwrap_or(raw_delta) * self.time_scale;
            self.last_frame = now;
            self.sim_time += f64::from(self.delta_secs);
            self.frame_count += 1;

            let fps_elapsed = now.duration_since(self.fps_update_time);
            if fps_elapsed >= self.fps_update_interval {
                let frames_since = self.frame_count - self.fps_frame_count;
                self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
                self.fps_frame_count = self.frame_count;
                self.fps_update_time = now;
            }
        }

        SimParams::new(self.delta_secs, self.next_seed())
    }

    /// Seed layout: two large offsets and two multipliers slightly above 1.
    fn next_seed(&mut self) -> Vec4 {
        Vec4::new(
            self.rng.gen::<f32>() * 100.0,
            self.rng.gen::<f32>() * 100.0,
            1.0 + self.rng.gen::<f32>(),
            1.0 + self.rng.gen::<f32>(),
        )
    }

    /// Simulated seconds so far: the sum of every step's scaled delta.
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.sim_time
    }

    /// Steps taken so far (paused frames do not count).
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            // The paused span must not show up as one long delta.
            self.last_frame = Instant::now();
            self.paused = false;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Use a constant step instead of frame timing. `None` restores frame timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }

    /// Negative scales clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fixed_delta() {
        let mut clock = SimClock::seeded(1);
        clock.set_fixed_delta(Some(1.0 / 60.0));
        thread::sleep(Duration::from_millis(20));
        let params = clock.tick();
        assert!((params.delta_time - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_variable_delta_is_clamped() {
        let mut clock = SimClock::seeded(1);
        thread::sleep(Duration::from_millis(150));
        let params = clock.tick();
        assert!(params.delta_time <= MAX_DELTA);
        assert!(params.delta_time > 0.0);
    }

    #[test]
    fn test_pause_zeroes_delta() {
        let mut clock = SimClock::seeded(1);
        clock.set_fixed_delta(Some(0.01));
        clock.pause();
        let params = clock.tick();
        assert_eq!(params.delta_time, 0.0);
        assert_eq!(clock.frame(), 0);

        clock.toggle_pause();
        assert!(!clock.is_paused());
        assert!(clock.tick().delta_time > 0.0);
    }

    #[test]
    fn test_seed_ranges() {
        let mut clock = SimClock::seeded(9);
        for _ in 0..50 {
            let seed = clock.tick().seed;
            assert!((0.0..100.0).contains(&seed.x));
            assert!((0.0..100.0).contains(&seed.y));
            assert!((1.0..2.0).contains(&seed.z));
            assert!((1.0..2.0).contains(&seed.w));
        }
    }

    #[test]
    fn test_seeded_clocks_repeat() {
        let mut a = SimClock::seeded(5);
        let mut b = SimClock::seeded(5);
        for _ in 0..5 {
            assert_eq!(a.tick().seed, b.tick().seed);
        }
    }

    #[test]
    fn test_elapsed_sums_simulated_steps() {
        let mut clock = SimClock::seeded(1);
        clock.set_fixed_delta(Some(0.25));
        clock.tick();
        clock.tick();
        clock.pause();
        clock.tick();
        clock.resume();
        clock.set_time_scale(2.0);
        clock.tick();
        assert_eq!(clock.elapsed(), 1.0);
    }

    #[test]
    fn test_resume_skips_paused_span() {
        let mut clock = SimClock::seeded(1);
        clock.pause();
        thread::sleep(Duration::from_millis(60));
        clock.resume();
        assert!(clock.tick().delta_time < 0.05);
    }

    #[test]
    fn test_time_scale() {
        let mut clock = SimClock::seeded(1);
        clock.set_fixed_delta(Some(0.01));
        clock.set_time_scale(2.0);
        assert!((clock.tick().delta_time - 0.02).abs() < 1e-6);
        clock.set_time_scale(-1.0);
        assert_eq!(clock.time_scale(), 0.0);
    }
}
