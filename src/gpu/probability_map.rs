//! GPU copy of a [`MipPyramid`].

use crate::mip::MipPyramid;

/// Format of every level: level 0 holds colors, upper levels hold thresholds.
pub const PROBABILITY_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Mipmapped `Rgba32Float` texture read by the `simulate` kernel.
pub struct ProbabilityMap {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl ProbabilityMap {
    /// Create the texture and upload every level.
    pub fn upload(device: &wgpu::Device, queue: &wgpu::Queue, pyramid: &MipPyramid) -> Self {
        let size = pyramid.size();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Probability Map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: pyramid.level_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PROBABILITY_MAP_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for level in 0..pyramid.level_count() {
            let level_size = pyramid.level_size(level);
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: level,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                bytemuck::cast_slice(pyramid.level_texels(level)),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(16 * level_size),
                    rows_per_image: Some(level_size),
                },
                wgpu::Extent3d {
                    width: level_size,
                    height: level_size,
                    depth_or_array_layers: 1,
                },
            );
        }
        log::debug!(
            "uploaded probability map {size}x{size} with {} levels",
            pyramid.level_count()
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Level-0 width and height.
    pub fn size(&self) -> u32 {
        self.texture.width()
    }
}
