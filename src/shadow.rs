//! Shadow visibility with percentage-closer filtering.
//!
//! The ground plane looks up its light-space position in a depth-comparison
//! shadow map and averages a 3x3 grid of comparisons around it. Particles cast
//! shadows through an alpha-tested depth-only pass.

use glam::{IVec2, Mat4, Vec2, Vec3};

/// Texel offsets of the 3x3 filter kernel.
pub const PCF_OFFSETS: [IVec2; 9] = [
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 0),
    IVec2::new(0, 0),
    IVec2::new(1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, 1),
    IVec2::new(1, 1),
];

/// Depth bias subtracted from the receiver depth to avoid self-shadowing.
pub const SHADOW_BIAS: f32 = 0.005;

/// A depth texture that can answer comparison lookups.
pub trait DepthCompare {
    /// Width and height in texels.
    fn size(&self) -> u32;

    /// 1.0 if `reference` passes the comparison against the stored depth at
    /// `texel`, else 0.0. Out-of-range texels clamp to the edge.
    fn compare(&self, texel: IVec2, reference: f32) -> f32;
}

/// CPU depth map with `LessEqual` comparison, like the GPU comparison sampler.
#[derive(Debug, Clone)]
pub struct ShadowMap {
    size: u32,
    depths: Vec<f32>,
}

impl ShadowMap {
    /// A map cleared to the far plane. A size of 0 stores nothing and every
    /// lookup is lit.
    pub fn cleared(size: u32) -> Self {
        Self {
            size,
            depths: vec![1.0; (size as usize) * (size as usize)],
        }
    }

    /// Write a depth, keeping the closer value.
    pub fn write(&mut self, x: u32, y: u32, depth: f32) {
        let i = self.texel_index(x, y);
        self.depths[i] = self.depths[i].min(depth);
    }

    /// Stored depth at a texel.
    pub fn depth(&self, x: u32, y: u32) -> f32 {
        self.depths[self.texel_index(x, y)]
    }

    #[inline]
    fn texel_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size as usize + x as usize
    }
}

impl DepthCompare for ShadowMap {
    fn size(&self) -> u32 {
        self.size
    }

    fn compare(&self, texel: IVec2, reference: f32) -> f32 {
        if self.size == 0 {
            return 1.0;
        }
        let max = self.size as i32 - 1;
        let x = texel.x.clamp(0, max) as u32;
        let y = texel.y.clamp(0, max) as u32;
        if reference <= self.depth(x, y) {
            1.0
        } else {
            0.0
        }
    }
}

/// Project a world position into light space (NDC xy, depth z).
pub fn light_space_position(light_view_proj: Mat4, world: Vec3) -> Vec3 {
    light_view_proj.project_point3(world)
}

/// Shadow-map uv of a light-space position (v grows downward).
pub fn shadow_uv(light_space: Vec3) -> Vec2 {
    light_space.truncate() * Vec2::new(0.5, -0.5) + Vec2::splat(0.5)
}

/// Fraction of the 3x3 kernel around `light_space` that sees the light.
///
/// Always in `[0, 1]`. Non-finite input and an empty map are treated as
/// fully lit.
pub fn shadow_visibility<M: DepthCompare + ?Sized>(map: &M, light_space: Vec3) -> f32 {
    if !light_space.is_finite() || map.size() == 0 {
        return 1.0;
    }
    let size = map.size() as f32;
    let uv = shadow_uv(light_space);
    let texel = (uv * size).floor();
    // Keep far-off coordinates in i32 range; they clamp to the edge anyway.
    let center = texel.clamp(Vec2::splat(-1.0), Vec2::splat(size)).as_ivec2();
    let reference = light_space.z - SHADOW_BIAS;

    let lit: f32 = PCF_OFFSETS
        .iter()
        .map(|&offset| map.compare(center + offset, reference))
        .sum();
    lit / PCF_OFFSETS.len() as f32
}

/// Ambient plus shadowed directional (Lambert) lighting.
pub fn shade(albedo: Vec3, normal: Vec3, light_dir: Vec3, visibility: f32, ambient: f32) -> Vec3 {
    let lambert = normal.dot(-light_dir.normalize_or_zero()).max(0.0);
    albedo * (ambient + (1.0 - ambient) * visibility * lambert)
}

/// Result of one shadow-caster fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FragmentOutcome {
    /// The fragment writes this depth.
    Depth(f32),
    /// The fragment contributes nothing.
    Discarded,
}

/// Alpha-tested particle fragment of the shadow pass.
///
/// `quad_uv` is the position inside the billboard in `[-1, 1]²`. The fragment
/// is kept inside the unit disc when its alpha beats the per-pixel noise, so a
/// fading particle casts a proportionally thinner shadow.
pub fn caster_fragment(quad_uv: Vec2, alpha: f32, noise: f32, depth: f32) -> FragmentOutcome {
    if quad_uv.length() > 1.0 || alpha <= noise {
        FragmentOutcome::Discarded
    } else {
        FragmentOutcome::Depth(depth)
    }
}

/// Interleaved gradient noise in `[0, 1)` for a fragment position.
pub fn interleaved_gradient_noise(frag: Vec2) -> f32 {
    let inner = frag.dot(Vec2::new(0.067_110_56, 0.005_837_15));
    let x = 52.982_918_9 * (inner - inner.floor());
    x - x.floor()
}

/// Orthographic directional light aimed at the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightRig {
    /// Direction the light travels (not normalized).
    pub direction: Vec3,
    /// Half-width of the square region covered by the shadow map.
    pub extent: f32,
    /// Distance from `target` to the light's eye point.
    pub distance: f32,
    /// Point the light looks at.
    pub target: Vec3,
}

impl LightRig {
    pub fn new(direction: Vec3) -> Self {
        Self {
            direction,
            extent: 4.0,
            distance: 10.0,
            target: Vec3::new(0.0, 0.0, 1.0),
        }
    }

    /// Light view and orthographic projection (depth in `[0, 1]`).
    pub fn view_and_projection(&self) -> (Mat4, Mat4) {
        let dir = self.direction.normalize_or(Vec3::NEG_Z);
        let eye = self.target - dir * self.distance;
        // look_at needs an up vector that is not parallel to the view direction.
        let up = if dir.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::X
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(eye, self.target, up);
        let e = self.extent;
        let proj = Mat4::orthographic_rh(-e, e, -e, e, 0.1, self.distance * 2.0);
        (view, proj)
    }

    /// Combined light view-projection.
    pub fn view_proj(&self) -> Mat4 {
        let (view, proj) = self.view_and_projection();
        proj * view
    }
}

/// WGSL filter over `shadow_map: texture_depth_2d` and
/// `shadow_sampler: sampler_comparison`.
pub fn shadow_wgsl() -> String {
    format!(
        r#"
const SHADOW_BIAS: f32 = {SHADOW_BIAS:?};

fn shadow_uv(light_space: vec3<f32>) -> vec2<f32> {{
    return light_space.xy * vec2<f32>(0.5, -0.5) + vec2<f32>(0.5);
}}

fn shadow_visibility(light_space: vec3<f32>) -> f32 {{
    let texel = 1.0 / vec2<f32>(textureDimensions(shadow_map));
    let uv = shadow_uv(light_space);
    let reference = light_space.z - SHADOW_BIAS;
    var visibility = 0.0;
    for (var y = -1; y <= 1; y = y + 1) {{
        for (var x = -1; x <= 1; x = x + 1) {{
            let offset = vec2<f32>(f32(x), f32(y)) * texel;
            visibility = visibility + textureSampleCompareLevel(shadow_map, shadow_sampler, uv + offset, reference);
        }}
    }}
    return visibility / 9.0;
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_map_is_fully_lit() {
        let map = ShadowMap::cleared(16);
        assert_eq!(shadow_visibility(&map, Vec3::new(0.0, 0.0, 0.5)), 1.0);
    }

    #[test]
    fn test_occluded_receiver_is_dark() {
        let mut map = ShadowMap::cleared(8);
        for y in 0..8 {
            for x in 0..8 {
                map.write(x, y, 0.2);
            }
        }
        assert_eq!(shadow_visibility(&map, Vec3::new(0.0, 0.0, 0.8)), 0.0);
    }

    #[test]
    fn test_edge_is_partially_lit() {
        // Occluder covers the left half of the map.
        let mut map = ShadowMap::cleared(8);
        for y in 0..8 {
            for x in 0..4 {
                map.write(x, y, 0.2);
            }
        }
        // NDC x = 0 is texel 4: offsets -1 hit the occluded column 3.
        let v = shadow_visibility(&map, Vec3::new(0.0, 0.0, 0.8));
        assert!((v - 6.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_bias_prevents_self_shadowing() {
        let mut map = ShadowMap::cleared(4);
        for y in 0..4 {
            for x in 0..4 {
                map.write(x, y, 0.5);
            }
        }
        assert_eq!(shadow_visibility(&map, Vec3::new(0.0, 0.0, 0.5 + SHADOW_BIAS * 0.5)), 1.0);
    }

    #[test]
    fn test_write_keeps_closest() {
        let mut map = ShadowMap::cleared(2);
        map.write(1, 1, 0.4);
        map.write(1, 1, 0.7);
        assert_eq!(map.depth(1, 1), 0.4);
    }

    #[test]
    fn test_shade_blends_ambient() {
        let albedo = Vec3::ONE;
        let lit = shade(albedo, Vec3::Z, Vec3::NEG_Z, 1.0, 0.2);
        let dark = shade(albedo, Vec3::Z, Vec3::NEG_Z, 0.0, 0.2);
        assert!((lit - Vec3::ONE).length() < 1e-6);
        assert!((dark - Vec3::splat(0.2)).length() < 1e-6);
    }

    #[test]
    fn test_caster_fragment() {
        assert_eq!(caster_fragment(Vec2::ZERO, 0.9, 0.5, 0.3), FragmentOutcome::Depth(0.3));
        assert_eq!(caster_fragment(Vec2::ZERO, 0.4, 0.5, 0.3), FragmentOutcome::Discarded);
        assert_eq!(caster_fragment(Vec2::new(0.9, 0.9), 1.0, 0.0, 0.3), FragmentOutcome::Discarded);
        // Fully faded particles never cast.
        assert_eq!(caster_fragment(Vec2::ZERO, 0.0, 0.0, 0.3), FragmentOutcome::Discarded);
    }

    #[test]
    fn test_noise_in_unit_interval() {
        for y in 0..32 {
            for x in 0..32 {
                let n = interleaved_gradient_noise(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
                assert!((0.0..1.0).contains(&n));
            }
        }
    }

    #[test]
    fn test_light_rig_maps_target_inside_frustum() {
        let rig = LightRig::new(Vec3::new(-0.4, 0.3, -1.0));
        let p = light_space_position(rig.view_proj(), rig.target);
        assert!(p.x.abs() < 1e-4 && p.y.abs() < 1e-4);
        assert!(p.z > 0.0 && p.z < 1.0);
    }

    #[test]
    fn test_straight_down_light() {
        let rig = LightRig::new(Vec3::NEG_Z);
        let m = rig.view_proj();
        assert!(m.is_finite());
    }
}
