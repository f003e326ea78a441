//! # wgpu-gallery
//!
//! Small wgpu demonstrations of three techniques:
//!
//! - **Importance-sampled particle spawning.** A [`MipPyramid`] turns an image
//!   into a stack of cumulative thresholds; descending it with one uniform
//!   number per level picks a texel with probability proportional to its
//!   weight. The same descent runs on the CPU ([`MipPyramid::sample`]) and in
//!   the `simulate` compute kernel.
//! - **Shadow mapping with percentage-closer filtering.** Particles are drawn
//!   into a light-space depth map through an alpha test; the ground averages a
//!   3x3 grid of depth comparisons ([`shadow::shadow_visibility`]).
//! - **Reversed-Z depth.** [`DepthMode::Reversed`] swaps the near and far
//!   planes, tests with `Greater` and clears to 0 for better far-range
//!   precision.
//!
//! ## Quick Start
//!
//! ```ignore
//! use wgpu_gallery::prelude::*;
//!
//! fn main() -> Result<(), DemoError> {
//!     init_logging(LoggingConfig::default());
//!     ParticleDemo::new()
//!         .with_particle_count(50_000)
//!         .with_image("assets/logo.png")
//!         .run()
//! }
//! ```
//!
//! ## CPU reference
//!
//! Every kernel has a CPU twin that consumes random numbers in the same order,
//! so the numeric parts can be tested without a GPU:
//!
//! ```ignore
//! let pyramid = MipPyramid::from_fn(64, WeightChannel::Alpha, |x, y| /* ... */)?;
//! let mut particles = vec![Particle::dormant(); 1024];
//! let params = SimParams::new(1.0 / 60.0, Vec4::new(12.0, 34.0, 1.5, 1.25));
//! let respawned = particle::simulate(&mut particles, &params, &pyramid);
//! ```

pub mod clock;
pub mod config;
pub mod demo;
pub mod error;
mod gpu;
pub mod logging;
pub mod mip;
pub mod particle;
pub mod projection;
pub mod rng;
pub mod shaders;
pub mod shadow;

pub use bytemuck;
pub use glam::{Mat4, Vec2, Vec3, Vec4};

pub use clock::SimClock;
pub use config::DemoConfig;
pub use demo::ParticleDemo;
pub use error::{ConfigError, DemoError, GpuError, PyramidError};
pub use gpu::Camera;
pub use mip::{MipPyramid, Quadrant, SpawnSample, WeightChannel};
pub use particle::{Particle, SimParams};
pub use projection::DepthMode;
pub use rng::{ParticleRng, UniformSource};

/// Common imports for demos.
pub mod prelude {
    pub use crate::clock::SimClock;
    pub use crate::config::DemoConfig;
    pub use crate::demo::ParticleDemo;
    pub use crate::error::DemoError;
    pub use crate::gpu::Camera;
    pub use crate::logging::{init_logging, LoggingConfig};
    pub use crate::mip::{MipPyramid, WeightChannel};
    pub use crate::particle::{Particle, SimParams};
    pub use crate::projection::DepthMode;
    pub use glam::{Vec2, Vec3, Vec4};
}
