//! WGSL sources and the uniform blocks they read.
//!
//! Each shader is assembled from the shared snippets (constants, random
//! numbers, pyramid descent, shadow filter) plus its own entry points, so the
//! GPU and CPU paths are driven by the same numbers.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

use crate::mip::SAMPLER_WGSL;
use crate::particle::constants_wgsl;
use crate::rng::RANDOM_WGSL;
use crate::shadow::shadow_wgsl;

const SIMULATE_SOURCE: &str = include_str!("shaders/simulate.wgsl");
const PARTICLES_SOURCE: &str = include_str!("shaders/particles.wgsl");
const GROUND_SOURCE: &str = include_str!("shaders/ground.wgsl");

/// Half-width of the square ground plane.
pub const GROUND_EXTENT: f32 = 4.0;

/// Invocations per workgroup of the `simulate` kernel.
pub const SIMULATE_WORKGROUP_SIZE: u32 = 64;

/// Two triangles covering `[-1, 1]²`, indexed by `vertex_index`.
pub const QUAD_CORNERS: [Vec2; 6] = [
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(-1.0, 1.0),
    Vec2::new(-1.0, 1.0),
    Vec2::new(1.0, -1.0),
    Vec2::new(1.0, 1.0),
];

const RENDER_UNIFORMS_WGSL: &str = r#"
struct RenderUniforms {
    view_proj: mat4x4<f32>,
    light_view_proj: mat4x4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
    light_right: vec4<f32>,
    light_up: vec4<f32>,
    light_dir: vec4<f32>,
}
"#;

/// Per-frame uniforms shared by the particle, caster and ground passes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct RenderUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub camera_right: [f32; 4],
    pub camera_up: [f32; 4],
    pub light_right: [f32; 4],
    pub light_up: [f32; 4],
    /// xyz: light travel direction, w: ambient term.
    pub light_dir: [f32; 4],
}

impl RenderUniforms {
    /// Billboard axes are the first two rows of each view rotation.
    pub fn new(view: Mat4, proj: Mat4, light_view: Mat4, light_proj: Mat4, light_dir: Vec3, ambient: f32) -> Self {
        let axis = |m: Mat4, row: usize| m.row(row).truncate().normalize_or_zero().extend(0.0).to_array();
        Self {
            view_proj: (proj * view).to_cols_array_2d(),
            light_view_proj: (light_proj * light_view).to_cols_array_2d(),
            camera_right: axis(view, 0),
            camera_up: axis(view, 1),
            light_right: axis(light_view, 0),
            light_up: axis(light_view, 1),
            light_dir: light_dir.normalize_or(Vec3::NEG_Z).extend(ambient).to_array(),
        }
    }
}

fn quad_corner_wgsl() -> String {
    let corners = QUAD_CORNERS
        .iter()
        .map(|c| format!("        vec2<f32>({:?}, {:?}),", c.x, c.y))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "
fn quad_corner(vertex_index: u32) -> vec2<f32> {{
    var corners = array<vec2<f32>, 6>(
{corners}
    );
    return corners[vertex_index];
}}
"
    )
}

/// Compute shader with the `simulate` entry point.
pub fn simulate_shader() -> String {
    format!(
        "{}{}{}{}",
        constants_wgsl(),
        RANDOM_WGSL,
        SAMPLER_WGSL,
        SIMULATE_SOURCE
    )
}

/// Billboard shader: `vs_particle`/`fs_particle` for color and
/// `vs_caster`/`fs_caster` for the shadow map.
pub fn particle_shader() -> String {
    format!("{}{}{}", RENDER_UNIFORMS_WGSL, quad_corner_wgsl(), PARTICLES_SOURCE)
}

/// Shadow-receiving ground plane: `vs_ground`/`fs_ground`.
pub fn ground_shader() -> String {
    format!(
        "{}const GROUND_HEIGHT: f32 = {:?};\nconst GROUND_EXTENT: f32 = {GROUND_EXTENT:?};\n{}{}{}",
        RENDER_UNIFORMS_WGSL,
        crate::particle::GROUND_HEIGHT,
        quad_corner_wgsl(),
        shadow_wgsl(),
        GROUND_SOURCE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<RenderUniforms>(), 208);
        assert_eq!(std::mem::size_of::<RenderUniforms>() % 16, 0);
    }

    #[test]
    fn test_billboard_axes_face_camera() {
        let eye = Vec3::new(3.0, -2.0, 1.5);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Z);
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 50.0);
        let u = RenderUniforms::new(view, proj, view, proj, Vec3::NEG_Z, 0.2);
        let right = Vec3::from_slice(&u.camera_right[..3]);
        let up = Vec3::from_slice(&u.camera_up[..3]);
        let forward = (Vec3::ZERO - eye).normalize();
        assert!(right.dot(forward).abs() < 1e-5);
        assert!(up.dot(forward).abs() < 1e-5);
        assert!((right.length() - 1.0).abs() < 1e-5);
        assert_eq!(u.light_dir[3], 0.2);
    }

    #[test]
    fn test_quad_covers_unit_square() {
        let min = QUAD_CORNERS.iter().fold(Vec2::MAX, |a, &c| a.min(c));
        let max = QUAD_CORNERS.iter().fold(Vec2::MIN, |a, &c| a.max(c));
        assert_eq!(min, Vec2::splat(-1.0));
        assert_eq!(max, Vec2::splat(1.0));
        assert!(particle_shader().contains("vec2<f32>(1.0, -1.0)"));
    }

    #[test]
    fn test_sources_carry_entry_points() {
        assert!(simulate_shader().contains("fn simulate("));
        assert!(simulate_shader().contains("fn sample_spawn_texel("));
        assert!(particle_shader().contains("fn vs_caster("));
        assert!(ground_shader().contains("fn shadow_visibility("));
    }
}
