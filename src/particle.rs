//! Particle integration and recycling.
//!
//! Particles fall under constant gravity, bounce off the ground plane and are
//! respawned in place once their lifetime runs out. The respawn position is
//! drawn from a [`MipPyramid`], so bright (or opaque) regions of the source
//! image emit more particles.
//!
//! [`Particle::step`] is the CPU rendition of the `simulate` compute kernel in
//! `shaders/simulate.wgsl`. Both consume random draws in the same order:
//!
//! 1. two draws for the ground-collision scatter (only when bouncing),
//! 2. one draw per pyramid level for the spawn texel (only when respawning),
//! 3. three draws for the launch velocity, one for lifetime, one for size.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use crate::mip::MipPyramid;
use crate::rng::{ParticleRng, UniformSource};

/// Downward acceleration along -Z (units/s²).
pub const GRAVITY: f32 = 0.8;
/// Height of the ground plane.
pub const GROUND_HEIGHT: f32 = 0.0;
/// Largest particle radius; particles rest this far above the ground.
pub const PARTICLE_MAX_RADIUS: f32 = 0.02;
/// Fraction of vertical speed kept after a bounce.
pub const BOUNCE_DAMPING: f32 = 0.5;
/// Blend factor toward a random horizontal direction on impact.
pub const COLLISION_SCATTER: f32 = 0.25;
/// Lifetime of a freshly spawned particle, in seconds.
pub const LIFETIME_RANGE: Range<f32> = 1.0..6.0;
/// Particle radius of a freshly spawned particle.
pub const SIZE_RANGE: Range<f32> = 0.005..PARTICLE_MAX_RADIUS;
/// Horizontal launch jitter (full width).
pub const LAUNCH_JITTER: f32 = 0.1;
/// Largest upward launch speed.
pub const LAUNCH_LIFT: f32 = 0.3;
/// Seconds to fade in after spawning.
pub const FADE_IN_TIME: f32 = 0.2;
/// Seconds of remaining lifetime over which to fade out.
pub const FADE_OUT_TIME: f32 = 0.5;
/// World-space width and height of the spawn image plane.
pub const SPAWN_EXTENT: f32 = 3.0;
/// Height of the spawn image center above the origin.
pub const SPAWN_CENTER_HEIGHT: f32 = 1.75;

/// One particle record, laid out exactly like the WGSL `Particle` struct.
///
/// ```wgsl
/// struct Particle {
///     position: vec3<f32>,  // offset 0
///     lifetime: f32,        // offset 12
///     velocity: vec3<f32>,  // offset 16
///     age: f32,             // offset 28
///     color: vec4<f32>,     // offset 32
///     size: f32,            // offset 48
/// }                         // size 64
/// ```
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub position: Vec3,
    /// Remaining lifetime in seconds. `<= 0` means due for respawn.
    pub lifetime: f32,
    pub velocity: Vec3,
    /// Seconds since the last respawn.
    pub age: f32,
    /// RGB from the spawn texel; alpha is the fade factor.
    pub color: Vec4,
    pub size: f32,
    pub _pad: [f32; 3],
}

/// Byte offset of `color` within [`Particle`].
pub const COLOR_OFFSET: u64 = 32;
/// Byte offset of `size` within [`Particle`].
pub const SIZE_OFFSET: u64 = 48;

/// Per-step uniform block, laid out like the WGSL `SimParams` struct.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct SimParams {
    pub delta_time: f32,
    pub _pad: [f32; 3],
    /// Per-step seed shared by all invocations.
    pub seed: Vec4,
}

impl SimParams {
    pub fn new(delta_time: f32, seed: Vec4) -> Self {
        Self {
            delta_time,
            _pad: [0.0; 3],
            seed,
        }
    }
}

/// What happened to a particle during one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Still within its lifetime.
    Alive,
    /// Lifetime ran out and it was re-emitted from the pyramid.
    Respawned,
}

impl Particle {
    /// A dead particle; it respawns on its first step.
    pub fn dormant() -> Self {
        Self::zeroed()
    }

    /// Whether the particle is due for respawn.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0
    }

    /// Advance one simulation step.
    pub fn step<S: UniformSource + ?Sized>(
        &mut self,
        delta_time: f32,
        rng: &mut S,
        pyramid: &MipPyramid,
    ) -> StepOutcome {
        self.velocity.z -= GRAVITY * delta_time;
        self.position += self.velocity * delta_time;
        self.collide_with_ground(rng);

        self.lifetime -= delta_time;
        self.age += delta_time;

        let outcome = if self.is_expired() {
            self.respawn(rng, pyramid);
            StepOutcome::Respawned
        } else {
            StepOutcome::Alive
        };

        self.color.w = fade_alpha(self.age, self.lifetime);
        outcome
    }

    fn collide_with_ground<S: UniformSource + ?Sized>(&mut self, rng: &mut S) {
        let floor = GROUND_HEIGHT + PARTICLE_MAX_RADIUS;
        if self.position.z >= floor {
            return;
        }
        self.position.z = floor;
        if self.velocity.z < 0.0 {
            let speed = self.velocity.length();
            let jx = rng.next_f32();
            let jy = rng.next_f32();
            let scatter = (Vec2::new(jx, jy) - Vec2::splat(0.5)) * 2.0 * speed;
            let horizontal = self.velocity.truncate().lerp(scatter, COLLISION_SCATTER);
            self.velocity = horizontal.extend(-self.velocity.z * BOUNCE_DAMPING);
        }
    }

    /// Re-emit the particle from a pyramid sample.
    pub fn respawn<S: UniformSource + ?Sized>(&mut self, rng: &mut S, pyramid: &MipPyramid) {
        let spawn = pyramid.sample(rng);
        self.position = spawn_position(spawn.uv());
        self.color = spawn.color;
        let vx = (rng.next_f32() - 0.5) * LAUNCH_JITTER;
        let vy = (rng.next_f32() - 0.5) * LAUNCH_JITTER;
        let vz = rng.next_f32() * LAUNCH_LIFT;
        self.velocity = Vec3::new(vx, vy, vz);
        self.age = 0.0;
        self.lifetime = rng.next_range(LIFETIME_RANGE.start, LIFETIME_RANGE.end);
        self.size = rng.next_range(SIZE_RANGE.start, SIZE_RANGE.end);
    }
}

/// World position of an image uv on the vertical spawn plane (y = 0).
pub fn spawn_position(uv: Vec2) -> Vec3 {
    Vec3::new(
        (uv.x - 0.5) * SPAWN_EXTENT,
        0.0,
        SPAWN_CENTER_HEIGHT + (0.5 - uv.y) * SPAWN_EXTENT,
    )
}

/// Fade-in over the first [`FADE_IN_TIME`] seconds times fade-out over the
/// last [`FADE_OUT_TIME`] seconds.
pub fn fade_alpha(age: f32, lifetime: f32) -> f32 {
    smoothstep(0.0, FADE_IN_TIME, age) * smoothstep(0.0, FADE_OUT_TIME, lifetime)
}

/// Same definition as WGSL `smoothstep`.
pub fn smoothstep(low: f32, high: f32, x: f32) -> f32 {
    let t = ((x - low) / (high - low)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// CPU rendition of one compute dispatch over the whole particle array.
///
/// Returns how many particles respawned.
pub fn simulate(particles: &mut [Particle], params: &SimParams, pyramid: &MipPyramid) -> usize {
    particles
        .iter_mut()
        .enumerate()
        .map(|(index, p)| {
            let mut rng = ParticleRng::new(params.seed, index as u32);
            p.step(params.delta_time, &mut rng, pyramid)
        })
        .filter(|outcome| *outcome == StepOutcome::Respawned)
        .count()
}

/// WGSL constant block matching the constants of this module.
pub fn constants_wgsl() -> String {
    format!(
        "const GRAVITY: f32 = {GRAVITY:?};
const GROUND_HEIGHT: f32 = {GROUND_HEIGHT:?};
const PARTICLE_MAX_RADIUS: f32 = {PARTICLE_MAX_RADIUS:?};
const BOUNCE_DAMPING: f32 = {BOUNCE_DAMPING:?};
const COLLISION_SCATTER: f32 = {COLLISION_SCATTER:?};
const LIFETIME_MIN: f32 = {:?};
const LIFETIME_MAX: f32 = {:?};
const SIZE_MIN: f32 = {:?};
const SIZE_MAX: f32 = {:?};
const LAUNCH_JITTER: f32 = {LAUNCH_JITTER:?};
const LAUNCH_LIFT: f32 = {LAUNCH_LIFT:?};
const FADE_IN_TIME: f32 = {FADE_IN_TIME:?};
const FADE_OUT_TIME: f32 = {FADE_OUT_TIME:?};
const SPAWN_EXTENT: f32 = {SPAWN_EXTENT:?};
const SPAWN_CENTER_HEIGHT: f32 = {SPAWN_CENTER_HEIGHT:?};
",
        LIFETIME_RANGE.start,
        LIFETIME_RANGE.end,
        SIZE_RANGE.start,
        SIZE_RANGE.end,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mip::WeightChannel;

    fn flat_pyramid() -> MipPyramid {
        MipPyramid::from_fn(4, WeightChannel::Alpha, |_, _| Vec4::ONE).unwrap()
    }

    #[test]
    fn test_particle_layout() {
        assert_eq!(std::mem::size_of::<Particle>(), 64);
        assert_eq!(std::mem::size_of::<SimParams>(), 32);
        assert_eq!(std::mem::offset_of!(Particle, color) as u64, COLOR_OFFSET);
        assert_eq!(std::mem::offset_of!(Particle, size) as u64, SIZE_OFFSET);
    }

    #[test]
    fn test_dormant_particle_respawns_first_step() {
        let pyramid = flat_pyramid();
        let mut p = Particle::dormant();
        let mut rng = ParticleRng::new(Vec4::new(3.0, 4.0, 1.5, 1.2), 0);
        assert_eq!(p.step(1.0 / 60.0, &mut rng, &pyramid), StepOutcome::Respawned);
        assert!(LIFETIME_RANGE.contains(&p.lifetime));
        assert!(SIZE_RANGE.contains(&p.size));
        assert_eq!(p.position.y, 0.0);
    }

    #[test]
    fn test_alive_particle_ages() {
        let pyramid = flat_pyramid();
        let mut p = Particle {
            position: Vec3::new(0.0, 0.0, 1.0),
            lifetime: 2.0,
            ..Particle::dormant()
        };
        let mut rng = ParticleRng::new(Vec4::ONE, 0);
        assert_eq!(p.step(0.1, &mut rng, &pyramid), StepOutcome::Alive);
        assert!((p.lifetime - 1.9).abs() < 1e-6);
        assert!((p.age - 0.1).abs() < 1e-6);
        assert!(p.velocity.z < 0.0);
    }

    #[test]
    fn test_resting_particle_does_not_draw() {
        // Upward velocity below the floor: clamp only, no scatter draws.
        struct NoDraws;
        impl UniformSource for NoDraws {
            fn next_f32(&mut self) -> f32 {
                panic!("unexpected draw")
            }
        }
        let mut p = Particle {
            position: Vec3::new(0.0, 0.0, -1.0),
            velocity: Vec3::new(0.0, 0.0, 5.0),
            lifetime: 3.0,
            ..Particle::dormant()
        };
        p.step(0.01, &mut NoDraws, &flat_pyramid());
        assert_eq!(p.position.z, GROUND_HEIGHT + PARTICLE_MAX_RADIUS);
    }

    #[test]
    fn test_fade_alpha() {
        assert_eq!(fade_alpha(0.0, 3.0), 0.0);
        assert_eq!(fade_alpha(1.0, 3.0), 1.0);
        assert_eq!(fade_alpha(1.0, 0.0), 0.0);
        let mid = fade_alpha(0.1, 3.0);
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn test_spawn_position_plane() {
        let top_left = spawn_position(Vec2::ZERO);
        let bottom_right = spawn_position(Vec2::ONE);
        assert_eq!(top_left, Vec3::new(-1.5, 0.0, 3.25));
        assert_eq!(bottom_right, Vec3::new(1.5, 0.0, 0.25));
    }

    #[test]
    fn test_simulate_counts_respawns() {
        let pyramid = flat_pyramid();
        let mut particles = vec![Particle::dormant(); 32];
        let params = SimParams::new(0.016, Vec4::new(10.0, 20.0, 1.2, 1.8));
        assert_eq!(simulate(&mut particles, &params, &pyramid), 32);
        assert_eq!(simulate(&mut particles, &params, &pyramid), 0);
    }

    #[test]
    fn test_constants_wgsl_mentions_every_constant() {
        let code = constants_wgsl();
        for name in ["GRAVITY", "GROUND_HEIGHT", "LIFETIME_MIN", "SIZE_MAX", "SPAWN_CENTER_HEIGHT"] {
            assert!(code.contains(&format!("const {name}: f32")), "missing {name}");
        }
        assert!(code.contains("const LIFETIME_MAX: f32 = 6.0;"));
    }
}
