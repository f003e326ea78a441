//! # Shadow mapping with PCF
//!
//! A low sun throws long, soft-edged particle shadows across the ground.
//! Fading particles cast thinner shadows through the alpha-tested caster pass.
//!
//! Run with: `cargo run --example shadow_map --release`

use wgpu_gallery::prelude::*;

fn main() -> Result<(), DemoError> {
    init_logging(LoggingConfig::default());

    let config = DemoConfig {
        particle_count: 30_000,
        shadow_map_size: 4096,
        ambient: 0.15,
        ..DemoConfig::default()
    };

    let camera = Camera {
        pitch: 0.9,
        distance: 7.0,
        ..Camera::new()
    };

    ParticleDemo::from_config(config)
        .with_light_direction(Vec3::new(-1.0, 0.6, -0.5))
        .with_camera(camera)
        .with_fixed_delta(1.0 / 60.0)
        .with_title("wgpu gallery: shadow map")
        .run()
}
