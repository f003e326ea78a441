//! Per-invocation random streams.
//!
//! Every particle (GPU invocation) owns an independent generator seeded from
//! the per-step seed and its own index. The state is an explicit value that is
//! passed to whoever draws from it, on the CPU as `&mut ParticleRng` and in
//! WGSL as `ptr<function, u32>`.
//!
//! Both sides run the same 32-bit PCG generator (LCG state, RXS-M-XS output)
//! on integers, so a stream draws bit-identical values on either side.

use glam::Vec4;

/// Largest f32 below 1.0. Draws are clamped to it so they stay in `[0, 1)`.
pub const ONE_MINUS_EPSILON: f32 = 0.999_999_94;

const PCG_MULTIPLIER: u32 = 747_796_405;
const PCG_INCREMENT: u32 = 2_891_336_453;
const PCG_OUTPUT_MULTIPLIER: u32 = 277_803_737;

/// A source of uniform floats in `[0, 1)`.
///
/// The sampler and the particle step only need this, so tests can script the
/// exact values they want drawn.
pub trait UniformSource {
    /// Next uniform value in `[0, 1)`.
    fn next_f32(&mut self) -> f32;

    /// Uniform value in `[min, max)`.
    #[inline]
    fn next_range(&mut self, min: f32, max: f32) -> f32 {
        (min + self.next_f32() * (max - min)).min(max.next_below())
    }
}

trait NextBelow {
    fn next_below(self) -> f32;
}

impl NextBelow for f32 {
    #[inline]
    fn next_below(self) -> f32 {
        if self > 0.0 {
            f32::from_bits(self.to_bits() - 1)
        } else if self == 0.0 {
            -f32::from_bits(1)
        } else {
            f32::from_bits(self.to_bits() + 1)
        }
    }
}

#[inline]
fn pcg_output(state: u32) -> u32 {
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(PCG_OUTPUT_MULTIPLIER);
    (word >> 22) ^ word
}

#[inline]
fn pcg_step(state: u32) -> u32 {
    state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(PCG_INCREMENT)
}

/// One round of the PCG hash: advance the LCG once, then permute.
#[inline]
pub fn pcg_hash(value: u32) -> u32 {
    pcg_output(pcg_step(value))
}

/// Explicit generator state for one simulation invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticleRng {
    state: u32,
}

impl ParticleRng {
    /// Seed a stream from the per-step seed and an invocation index.
    ///
    /// The seed components are mixed in by their bit patterns.
    pub fn new(seed: Vec4, invocation: u32) -> Self {
        let state = seed
            .to_array()
            .into_iter()
            .fold(pcg_hash(invocation), |h, s| pcg_hash(h ^ s.to_bits()));
        Self { state }
    }

    /// Current raw state, mainly for tests.
    pub fn state(&self) -> u32 {
        self.state
    }
}

impl UniformSource for ParticleRng {
    /// The top 24 bits of the output, so every value is exact in f32.
    #[inline]
    fn next_f32(&mut self) -> f32 {
        self.state = pcg_step(self.state);
        (pcg_output(self.state) >> 8) as f32 * (1.0 / 16_777_216.0)
    }
}

impl UniformSource for rand::rngs::SmallRng {
    #[inline]
    fn next_f32(&mut self) -> f32 {
        rand::Rng::gen::<f32>(self)
    }
}

/// WGSL rendition of [`ParticleRng`].
///
/// `rng_init` returns the state value; `rand` advances it through a pointer.
pub const RANDOM_WGSL: &str = r#"
fn pcg_output(state: u32) -> u32 {
    let word = ((state >> ((state >> 28u) + 4u)) ^ state) * 277803737u;
    return (word >> 22u) ^ word;
}

fn pcg_hash(value: u32) -> u32 {
    return pcg_output(value * 747796405u + 2891336453u);
}

fn rng_init(invocation: u32, seed: vec4<f32>) -> u32 {
    let bits = bitcast<vec4<u32>>(seed);
    var h = pcg_hash(invocation);
    h = pcg_hash(h ^ bits.x);
    h = pcg_hash(h ^ bits.y);
    h = pcg_hash(h ^ bits.z);
    h = pcg_hash(h ^ bits.w);
    return h;
}

fn rand(state: ptr<function, u32>) -> f32 {
    *state = *state * 747796405u + 2891336453u;
    return f32(pcg_output(*state) >> 8u) * (1.0 / 16777216.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_draws_stay_in_unit_interval() {
        let seed = Vec4::new(37.0, 81.5, 1.3, 1.9);
        for invocation in 0..64 {
            let mut rng = ParticleRng::new(seed, invocation);
            for _ in 0..256 {
                let v = rng.next_f32();
                assert!((0.0..1.0).contains(&v), "draw {v} out of range");
            }
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let seed = Vec4::new(12.0, 55.0, 1.1, 1.7);
        let mut a = ParticleRng::new(seed, 7);
        let mut b = ParticleRng::new(seed, 7);
        for _ in 0..32 {
            assert_eq!(a.next_f32(), b.next_f32());
        }
    }

    #[test]
    fn test_invocations_get_distinct_streams() {
        let seed = Vec4::new(12.0, 55.0, 1.1, 1.7);
        let a = ParticleRng::new(seed, 1);
        let b = ParticleRng::new(seed, 2);
        assert_ne!(a.state(), b.state());
    }

    #[test]
    fn test_next_range_is_half_open() {
        struct Max;
        impl UniformSource for Max {
            fn next_f32(&mut self) -> f32 {
                ONE_MINUS_EPSILON
            }
        }
        let v = Max.next_range(1.0, 6.0);
        assert!(v < 6.0);
        assert!(v >= 1.0);
    }

    #[test]
    fn test_first_draw_is_hash_of_state() {
        // The first draw from state 0 is the hash of 0.
        assert_eq!(pcg_hash(0), pcg_output(PCG_INCREMENT));
        assert_ne!(pcg_hash(0), pcg_hash(1));
        let mut rng = ParticleRng { state: 0 };
        let first = rng.next_f32();
        assert_eq!(first, (pcg_hash(0) >> 8) as f32 / 16_777_216.0);
    }

    #[test]
    fn test_adjacent_invocations_are_uncorrelated() {
        // Mean of the first draw over many consecutive invocations stays near 1/2.
        let seed = Vec4::new(37.0, 81.5, 1.3, 1.9);
        let n = 20_000;
        let mean = (0..n).map(|i| ParticleRng::new(seed, i).next_f32() as f64).sum::<f64>() / n as f64;
        assert!((mean - 0.5).abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn test_wgsl_matches_constants() {
        assert!(RANDOM_WGSL.contains(&format!("{PCG_MULTIPLIER}u")));
        assert!(RANDOM_WGSL.contains(&format!("{PCG_INCREMENT}u")));
        assert!(RANDOM_WGSL.contains(&format!("{PCG_OUTPUT_MULTIPLIER}u")));
    }

    #[test]
    fn test_small_rng_source() {
        let mut rng = rand::rngs::SmallRng::seed_from_u64(3);
        for _ in 0..100 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
