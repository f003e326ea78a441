//! Per-frame orchestration: simulate, shadow pass, main pass, present.

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;

use super::camera::Camera;
use super::particles::ParticlePipelines;
use super::shadow::{GroundPass, ShadowPass};
use super::{create_depth_texture, uniform_entry, GpuContext};
use crate::config::DemoConfig;
use crate::mip::MipPyramid;
use crate::particle::SimParams;
use crate::projection::DepthMode;
use crate::shaders::RenderUniforms;
use crate::shadow::LightRig;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.05,
    a: 1.0,
};

/// Owns every GPU resource of the particle scene.
pub struct Renderer {
    uniform_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    particles: ParticlePipelines,
    shadow: ShadowPass,
    ground: GroundPass,
    depth_texture: wgpu::TextureView,
    depth_mode: DepthMode,
    light: LightRig,
    ambient: f32,
}

impl Renderer {
    pub fn new(ctx: &GpuContext, pyramid: &MipPyramid, config: &DemoConfig) -> Self {
        let device = &ctx.device;
        let depth_mode = config.depth_mode;
        let light = LightRig::new(config.light());

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Render Uniform Buffer"),
            contents: bytemuck::bytes_of(&RenderUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT)],
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let particles = ParticlePipelines::new(
            device,
            &ctx.queue,
            pyramid,
            config.particle_count,
            ctx.config.format,
            &scene_layout,
            depth_mode,
        );
        let shadow = ShadowPass::new(device, config.shadow_map_size);
        let ground = GroundPass::new(device, ctx.config.format, &uniform_buffer, &shadow, depth_mode);
        let depth_texture = create_depth_texture(
            device,
            "Depth Texture",
            ctx.config.width,
            ctx.config.height,
            wgpu::TextureUsages::empty(),
        );

        log::info!(
            "scene ready: {} particles, {}x{} probability map, {}px shadow map, {}",
            particles.num_particles(),
            particles.probability_map().size(),
            particles.probability_map().size(),
            shadow.size(),
            depth_mode.label()
        );

        Self {
            uniform_buffer,
            scene_bind_group,
            particles,
            shadow,
            ground,
            depth_texture,
            depth_mode,
            light,
            ambient: config.ambient,
        }
    }

    /// Recreate the depth buffer after the surface changed size.
    pub fn resize(&mut self, ctx: &GpuContext) {
        self.depth_texture = create_depth_texture(
            &ctx.device,
            "Depth Texture",
            ctx.config.width,
            ctx.config.height,
            wgpu::TextureUsages::empty(),
        );
    }

    pub fn depth_mode(&self) -> DepthMode {
        self.depth_mode
    }

    /// Switch the main camera's depth range and rebuild the pipelines that test
    /// against it.
    pub fn set_depth_mode(&mut self, ctx: &GpuContext, depth_mode: DepthMode) {
        if depth_mode == self.depth_mode {
            return;
        }
        self.particles.set_depth_mode(&ctx.device, depth_mode);
        self.ground.set_depth_mode(&ctx.device, depth_mode);
        self.depth_mode = depth_mode;
        log::info!("depth mode: {}", depth_mode.label());
    }

    fn update_uniforms(&self, ctx: &GpuContext, camera: &Camera) {
        let (light_view, light_proj) = self.light.view_and_projection();
        let uniforms = RenderUniforms::new(
            camera.view_matrix(),
            camera.projection(ctx.aspect(), self.depth_mode),
            light_view,
            light_proj,
            self.light.direction,
            self.ambient,
        );
        ctx.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Simulate one step and draw the frame.
    pub fn render(&mut self, ctx: &GpuContext, camera: &Camera, params: &SimParams) -> Result<(), wgpu::SurfaceError> {
        self.update_uniforms(ctx, camera);

        let output = ctx.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        self.particles.simulate(&ctx.queue, &mut encoder, params);
        self.shadow.encode(&mut encoder, &self.scene_bind_group, &self.particles);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.depth_mode.clear_depth()),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.ground.draw(&mut render_pass);
            render_pass.set_bind_group(0, &self.scene_bind_group, &[]);
            self.particles.draw(&mut render_pass);
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
