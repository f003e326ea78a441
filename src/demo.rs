//! Windowed particle demo.
//!
//! Particles respawn from a spawn image in proportion to its alpha (or
//! luminance), fall under gravity, bounce off the ground and cast filtered
//! shadows onto it.
//!
//! # Example
//!
//! ```ignore
//! use wgpu_gallery::prelude::*;
//!
//! ParticleDemo::new()
//!     .with_particle_count(100_000)
//!     .with_image("assets/logo.png")
//!     .with_depth_mode(DepthMode::Reversed)
//!     .run()?;
//! ```
//!
//! # Controls
//!
//! - Drag: orbit the camera
//! - Wheel: zoom
//! - `Space`: pause / resume
//! - `R`: toggle standard / reversed-Z depth
//! - `Escape`: quit

use std::f32::consts::TAU;
use std::path::PathBuf;
use std::sync::Arc;

use glam::{Vec3, Vec4};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::clock::SimClock;
use crate::config::{check_texture_size, DemoConfig};
use crate::error::{DemoError, PyramidError};
use crate::gpu::{Camera, GpuContext, Renderer};
use crate::mip::{MipPyramid, WeightChannel};
use crate::projection::DepthMode;

/// Largest procedural pyramid; the ring has no detail worth more texels.
const RING_MAX_SIZE: u32 = 256;

/// Builder for the particle demo window.
pub struct ParticleDemo {
    config: DemoConfig,
    pyramid: Option<MipPyramid>,
    camera: Camera,
    title: String,
}

impl ParticleDemo {
    pub fn new() -> Self {
        Self::from_config(DemoConfig::default())
    }

    pub fn from_config(config: DemoConfig) -> Self {
        Self {
            config,
            pyramid: None,
            camera: Camera::new(),
            title: "wgpu gallery: particles".to_string(),
        }
    }

    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.config.particle_count = count;
        self
    }

    /// Spawn from an image file (PNG or JPEG).
    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.image = Some(path.into());
        self
    }

    /// Spawn from a ready-made pyramid. Takes precedence over an image path.
    pub fn with_pyramid(mut self, pyramid: MipPyramid) -> Self {
        self.pyramid = Some(pyramid);
        self
    }

    pub fn with_depth_mode(mut self, mode: DepthMode) -> Self {
        self.config.depth_mode = mode;
        self
    }

    pub fn with_fixed_delta(mut self, delta: f32) -> Self {
        self.config.fixed_delta = Some(delta);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn with_light_direction(mut self, direction: Vec3) -> Self {
        self.config.light_direction = direction.to_array();
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Resolve the spawn pyramid: explicit pyramid, then image, then ring.
    fn build_pyramid(&mut self) -> Result<MipPyramid, DemoError> {
        if let Some(pyramid) = self.pyramid.take() {
            return Ok(pyramid);
        }
        let pyramid = match &self.config.image {
            Some(path) => MipPyramid::open(path, self.config.weight_channel, self.config.pyramid_size)?,
            None => ring_pyramid(self.config.pyramid_size.min(RING_MAX_SIZE))?,
        };
        Ok(pyramid)
    }

    /// Open the window and run until it is closed.
    pub fn run(mut self) -> Result<(), DemoError> {
        self.config.validate()?;
        let pyramid = self.build_pyramid()?;
        check_texture_size("spawn pyramid size", pyramid.size())?;
        log::info!(
            "spawn pyramid {}x{} ({} levels)",
            pyramid.size(),
            pyramid.size(),
            pyramid.level_count()
        );

        let mut clock = match self.config.seed {
            Some(seed) => SimClock::seeded(seed),
            None => SimClock::new(),
        };
        clock.set_fixed_delta(self.config.fixed_delta);

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App {
            config: self.config,
            pyramid,
            title: self.title,
            camera: self.camera,
            clock,
            window: None,
            gpu: None,
            mouse_pressed: false,
            last_mouse_pos: None,
            error: None,
        };
        event_loop.run_app(&mut app)?;

        match app.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for ParticleDemo {
    fn default() -> Self {
        Self::new()
    }
}

/// Procedural spawn image: a rainbow ring on a transparent background.
pub fn ring_pyramid(size: u32) -> Result<MipPyramid, PyramidError> {
    MipPyramid::from_fn(size, WeightChannel::Alpha, |x, y| {
        let uv = (glam::Vec2::new(x as f32, y as f32) + 0.5) / size as f32 - 0.5;
        let radius = uv.length();
        let hue = uv.y.atan2(uv.x) / TAU;
        let ring = (-((radius - 0.35) / 0.06).powi(2)).exp();
        let rgb = Vec3::new(hue, hue + 1.0 / 3.0, hue + 2.0 / 3.0) * TAU;
        Vec4::new(
            0.5 + 0.5 * rgb.x.cos(),
            0.5 + 0.5 * rgb.y.cos(),
            0.5 + 0.5 * rgb.z.cos(),
            ring,
        )
    })
}

struct GpuScene {
    ctx: GpuContext,
    renderer: Renderer,
}

struct App {
    config: DemoConfig,
    pyramid: MipPyramid,
    title: String,
    camera: Camera,
    clock: SimClock,
    window: Option<Arc<Window>>,
    gpu: Option<GpuScene>,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    error: Option<DemoError>,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), DemoError> {
        let window_attrs = Window::default_attributes()
            .with_title(self.window_title(self.config.depth_mode))
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let ctx = pollster::block_on(GpuContext::new(window.clone()))?;
        let renderer = Renderer::new(&ctx, &self.pyramid, &self.config);

        self.window = Some(window);
        self.gpu = Some(GpuScene { ctx, renderer });
        Ok(())
    }

    fn window_title(&self, mode: DepthMode) -> String {
        format!("{} [{}]", self.title, mode.label())
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Escape) => event_loop.exit(),
            PhysicalKey::Code(KeyCode::Space) => {
                self.clock.toggle_pause();
                log::info!("{}", if self.clock.is_paused() { "paused" } else { "resumed" });
            }
            PhysicalKey::Code(KeyCode::KeyR) => {
                if let Some(gpu) = &mut self.gpu {
                    let mode = gpu.renderer.depth_mode().toggled();
                    gpu.renderer.set_depth_mode(&gpu.ctx, mode);
                    if let Some(window) = &self.window {
                        window.set_title(&format!("{} [{}]", self.title, mode.label()));
                    }
                }
            }
            _ => {}
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        let params = self.clock.tick();
        match gpu.renderer.render(&gpu.ctx, &self.camera, &params) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let (width, height) = (gpu.ctx.config.width, gpu.ctx.config.height);
                if gpu.ctx.resize(width, height) {
                    gpu.renderer.resize(&gpu.ctx);
                }
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => log::error!("render error: {e:?}"),
        }

        if self.clock.frame() % 300 == 0 && self.clock.frame() > 0 {
            log::debug!("{:.1} fps, {:.1}s simulated", self.clock.fps(), self.clock.elapsed());
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            log::error!("{err}");
            self.error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu) = &mut self.gpu {
                    if gpu.ctx.resize(physical_size.width, physical_size.height) {
                        gpu.renderer.resize(&gpu.ctx);
                    }
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, &event);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        self.camera
                            .orbit((position.x - last_x) as f32, (position.y - last_y) as f32);
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                self.camera.zoom(scroll);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_pyramid_weights_the_ring() {
        let pyramid = ring_pyramid(64).unwrap();
        assert_eq!(pyramid.size(), 64);
        // Center and corners are nearly empty, the ring is dense.
        assert!(pyramid.weight(32, 32) < 1e-6);
        assert!(pyramid.weight(0, 0) < 1e-6);
        let on_ring = (32.0 + 0.35 * 64.0) as u32;
        assert!(pyramid.weight(on_ring, 32) > 0.5);
    }

    #[test]
    fn test_builder_overrides_config() {
        let demo = ParticleDemo::new()
            .with_particle_count(123)
            .with_depth_mode(DepthMode::Standard)
            .with_fixed_delta(0.02)
            .with_seed(7)
            .with_image("spawn.png");
        assert_eq!(demo.config.particle_count, 123);
        assert_eq!(demo.config.depth_mode, DepthMode::Standard);
        assert_eq!(demo.config.fixed_delta, Some(0.02));
        assert_eq!(demo.config.seed, Some(7));
        assert_eq!(demo.config.image, Some(PathBuf::from("spawn.png")));
    }

    #[test]
    fn test_explicit_pyramid_wins() {
        let pyramid = MipPyramid::from_weights(2, vec![Vec4::ONE; 4], vec![1.0; 4]).unwrap();
        let mut demo = ParticleDemo::new()
            .with_image("does-not-exist.png")
            .with_pyramid(pyramid);
        assert_eq!(demo.build_pyramid().unwrap().size(), 2);
    }

    #[test]
    fn test_missing_image_is_reported() {
        let mut demo = ParticleDemo::new().with_image("/nonexistent/spawn.png");
        assert!(matches!(demo.build_pyramid(), Err(DemoError::Pyramid(_))));
    }
}
