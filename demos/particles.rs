//! # Image-spawned particles
//!
//! Particles are emitted from an image in proportion to its alpha, fall,
//! bounce off the ground and cast shadows.
//!
//! Run with: `cargo run --example particles --release -- [image.png]`
//!
//! Without an image a procedural ring is used.

use wgpu_gallery::prelude::*;

fn main() -> Result<(), DemoError> {
    init_logging(LoggingConfig::default());

    let mut demo = ParticleDemo::new()
        .with_particle_count(100_000)
        .with_title("wgpu gallery: image-spawned particles");
    if let Some(path) = std::env::args().nth(1) {
        demo = demo.with_image(path);
    }
    demo.run()
}
