//! Particle buffer, the `simulate` compute pipeline and the billboard
//! pipelines that draw the buffer as instances.

use wgpu::util::DeviceExt;

use super::probability_map::ProbabilityMap;
use super::{primitive_state, uniform_entry, DEPTH_FORMAT};
use crate::mip::MipPyramid;
use crate::particle::{Particle, SimParams, COLOR_OFFSET, SIZE_OFFSET};
use crate::projection::DepthMode;
use crate::shaders::{particle_shader, simulate_shader, SIMULATE_WORKGROUP_SIZE};

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
    wgpu::VertexAttribute {
        offset: 0,
        shader_location: 0,
        format: wgpu::VertexFormat::Float32x3, // position
    },
    wgpu::VertexAttribute {
        offset: COLOR_OFFSET,
        shader_location: 1,
        format: wgpu::VertexFormat::Float32x4, // color
    },
    wgpu::VertexAttribute {
        offset: SIZE_OFFSET,
        shader_location: 2,
        format: wgpu::VertexFormat::Float32, // size
    },
];

fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Particle>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &INSTANCE_ATTRIBUTES,
    }
}

/// Everything needed to simulate and draw one particle buffer.
pub struct ParticlePipelines {
    particle_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    compute_pipeline: wgpu::ComputePipeline,
    compute_bind_group: wgpu::BindGroup,
    render_shader: wgpu::ShaderModule,
    render_layout: wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    render_pipeline: wgpu::RenderPipeline,
    caster_pipeline: wgpu::RenderPipeline,
    probability_map: ProbabilityMap,
    num_particles: u32,
}

impl ParticlePipelines {
    /// `scene_layout` is the bind group layout holding the render uniforms.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pyramid: &MipPyramid,
        num_particles: u32,
        color_format: wgpu::TextureFormat,
        scene_layout: &wgpu::BindGroupLayout,
        depth_mode: DepthMode,
    ) -> Self {
        let probability_map = ProbabilityMap::upload(device, queue, pyramid);

        // Every particle starts expired and respawns on the first step.
        let particles = vec![Particle::dormant(); num_particles as usize];
        let particle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Buffer"),
            contents: bytemuck::cast_slice(&particles),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sim Params Buffer"),
            contents: bytemuck::bytes_of(&SimParams::new(0.0, glam::Vec4::ONE)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let compute_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Simulate Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                uniform_entry(1, wgpu::ShaderStages::COMPUTE),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let compute_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Simulate Bind Group"),
            layout: &compute_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: particle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&probability_map.view),
                },
            ],
        });

        let compute_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Simulate Shader"),
            source: wgpu::ShaderSource::Wgsl(simulate_shader().into()),
        });

        let compute_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Simulate Pipeline Layout"),
            bind_group_layouts: &[&compute_bind_group_layout],
            push_constant_ranges: &[],
        });

        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Simulate Pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &compute_shader,
            entry_point: Some("simulate"),
            compilation_options: Default::default(),
            cache: None,
        });

        let render_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(particle_shader().into()),
        });

        let render_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[scene_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = create_color_pipeline(device, &render_shader, &render_layout, color_format, depth_mode);
        let caster_pipeline = create_caster_pipeline(device, &render_shader, &render_layout);

        log::info!("created {num_particles} particles");

        Self {
            particle_buffer,
            params_buffer,
            compute_pipeline,
            compute_bind_group,
            render_shader,
            render_layout,
            color_format,
            render_pipeline,
            caster_pipeline,
            probability_map,
            num_particles,
        }
    }

    /// Rebuild the billboard pipeline for a new depth test.
    pub fn set_depth_mode(&mut self, device: &wgpu::Device, depth_mode: DepthMode) {
        self.render_pipeline =
            create_color_pipeline(device, &self.render_shader, &self.render_layout, self.color_format, depth_mode);
    }

    /// Upload `params` and record one simulation dispatch.
    pub fn simulate(&self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder, params: &SimParams) {
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(params));

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Simulate Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.compute_pipeline);
        compute_pass.set_bind_group(0, &self.compute_bind_group, &[]);
        compute_pass.dispatch_workgroups(self.num_particles.div_ceil(SIMULATE_WORKGROUP_SIZE), 1, 1);
    }

    /// Draw colored billboards. The scene bind group must already be set.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_vertex_buffer(0, self.particle_buffer.slice(..));
        render_pass.draw(0..6, 0..self.num_particles);
    }

    /// Draw alpha-tested billboards into the shadow map.
    pub fn draw_casters(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.caster_pipeline);
        render_pass.set_vertex_buffer(0, self.particle_buffer.slice(..));
        render_pass.draw(0..6, 0..self.num_particles);
    }

    pub fn num_particles(&self) -> u32 {
        self.num_particles
    }

    pub fn probability_map(&self) -> &ProbabilityMap {
        &self.probability_map
    }
}

fn create_color_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    depth_mode: DepthMode,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Particle Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_particle"),
            buffers: &[instance_layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_particle"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: primitive_state(),
        // Blended billboards test against the ground but do not occlude each other.
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: depth_mode.compare(),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_caster_pipeline(
    device: &wgpu::Device,
    shader: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Shadow Caster Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_caster"),
            buffers: &[instance_layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_caster"),
            targets: &[],
            compilation_options: Default::default(),
        }),
        primitive: primitive_state(),
        // The light projection always uses the standard range.
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
