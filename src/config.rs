//! Demo configuration.
//!
//! Settings can be loaded from a JSON file; every field is optional and falls
//! back to its default.
//!
//! ```json
//! {
//!     "particle_count": 100000,
//!     "image": "assets/logo.png",
//!     "weight_channel": "luminance",
//!     "depth_mode": "standard",
//!     "light_direction": [-0.4, 0.3, -1.0]
//! }
//! ```

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mip::WeightChannel;
use crate::particle::Particle;
use crate::projection::DepthMode;
use crate::shaders::SIMULATE_WORKGROUP_SIZE;

/// Most particles one device with default limits can hold and dispatch.
///
/// The particle buffer is bound whole as storage and the kernel is launched
/// as a single row of workgroups, so three limits apply.
pub fn max_particle_count() -> u32 {
    let limits = wgpu::Limits::default();
    let stride = std::mem::size_of::<Particle>() as u64;
    let by_binding = u64::from(limits.max_storage_buffer_binding_size) / stride;
    let by_buffer = limits.max_buffer_size / stride;
    let by_dispatch =
        u64::from(limits.max_compute_workgroups_per_dimension) * u64::from(SIMULATE_WORKGROUP_SIZE);
    by_binding.min(by_buffer).min(by_dispatch).min(u64::from(u32::MAX)) as u32
}

/// Largest width or height of the shadow map and the probability map.
pub fn max_texture_size() -> u32 {
    wgpu::Limits::default().max_texture_dimension_2d
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of simulated particles.
    pub particle_count: u32,
    /// Spawn image (PNG or JPEG). `None` uses a procedural ring.
    pub image: Option<PathBuf>,
    /// Upper bound for the pyramid's level-0 size (power of two).
    pub pyramid_size: u32,
    /// Channel the spawn weight is read from.
    pub weight_channel: WeightChannel,
    /// Depth range of the main camera.
    pub depth_mode: DepthMode,
    /// Shadow map width and height (power of two).
    pub shadow_map_size: u32,
    /// Direction the sun light travels.
    pub light_direction: [f32; 3],
    /// Ambient light term in `[0, 1]`.
    pub ambient: f32,
    /// Constant simulation step in seconds; `None` follows the frame rate.
    pub fixed_delta: Option<f32>,
    /// Seed for the per-step seed sequence; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            particle_count: 50_000,
            image: None,
            pyramid_size: 512,
            weight_channel: WeightChannel::Alpha,
            depth_mode: DepthMode::Reversed,
            shadow_map_size: 2048,
            light_direction: [-0.4, 0.3, -1.0],
            ambient: 0.2,
            fixed_delta: None,
            seed: None,
        }
    }
}

impl DemoConfig {
    /// Read and validate a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::debug!("loaded config from '{}'", path.as_ref().display());
        Ok(config)
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the renderer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.particle_count == 0 {
            return Err(ConfigError::Invalid("particle_count must be > 0".into()));
        }
        let max_particles = max_particle_count();
        if self.particle_count > max_particles {
            return Err(ConfigError::Invalid(format!(
                "particle_count must be at most {max_particles}, got {}",
                self.particle_count
            )));
        }
        check_texture_size("pyramid_size", self.pyramid_size)?;
        check_texture_size("shadow_map_size", self.shadow_map_size)?;
        let light = self.light();
        if !light.is_finite() || light.length_squared() < 1e-12 {
            return Err(ConfigError::Invalid("light_direction must be a non-zero vector".into()));
        }
        if !(0.0..=1.0).contains(&self.ambient) {
            return Err(ConfigError::Invalid(format!(
                "ambient must be in [0, 1], got {}",
                self.ambient
            )));
        }
        if let Some(dt) = self.fixed_delta {
            if !(dt.is_finite() && dt > 0.0) {
                return Err(ConfigError::Invalid(format!("fixed_delta must be > 0, got {dt}")));
            }
        }
        Ok(())
    }

    /// Light direction as a vector.
    pub fn light(&self) -> Vec3 {
        Vec3::from_array(self.light_direction)
    }
}

/// Power of two no larger than the device's 2D texture limit.
pub(crate) fn check_texture_size(name: &str, size: u32) -> Result<(), ConfigError> {
    if !size.is_power_of_two() {
        return Err(ConfigError::Invalid(format!("{name} must be a power of two, got {size}")));
    }
    let max = max_texture_size();
    if size > max {
        return Err(ConfigError::Invalid(format!("{name} must be at most {max}, got {size}")));
    }
    Ok(())
}
