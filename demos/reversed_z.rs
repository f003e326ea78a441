//! # Reversed-Z depth
//!
//! Starts far from the scene with a standard depth buffer, where the ground
//! and the grazing particles z-fight. Press `R` to switch to reversed-Z and
//! watch the flicker disappear.
//!
//! Run with: `cargo run --example reversed_z --release`

use wgpu_gallery::prelude::*;

fn main() -> Result<(), DemoError> {
    init_logging(LoggingConfig::default());

    let camera = Camera {
        pitch: 0.04,
        distance: 120.0,
        ..Camera::new()
    };

    log::info!("press R to toggle standard / reversed-Z depth");
    ParticleDemo::new()
        .with_particle_count(50_000)
        .with_depth_mode(DepthMode::Standard)
        .with_camera(camera)
        .with_title("wgpu gallery: reversed-Z")
        .run()
}
