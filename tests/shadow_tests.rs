//! Integration tests for shadow visibility and the reversed-Z projection.

use glam::{IVec2, Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use wgpu_gallery::projection::{ndc_depth, DepthMode};
use wgpu_gallery::shadow::{
    caster_fragment, interleaved_gradient_noise, light_space_position, shadow_visibility, DepthCompare,
    FragmentOutcome, LightRig, ShadowMap,
};
use wgpu_gallery::Camera;

fn random_map(rng: &mut SmallRng, size: u32) -> ShadowMap {
    let mut map = ShadowMap::cleared(size);
    for y in 0..size {
        for x in 0..size {
            if rng.gen_bool(0.5) {
                map.write(x, y, rng.gen());
            }
        }
    }
    map
}

#[test]
fn test_visibility_is_bounded() {
    let mut rng = SmallRng::seed_from_u64(77);
    let map = random_map(&mut rng, 32);

    let specials = [
        Vec3::new(f32::NAN, 0.0, 0.5),
        Vec3::new(f32::INFINITY, 0.0, 0.5),
        Vec3::new(0.0, f32::NEG_INFINITY, 0.5),
        Vec3::new(1e30, -1e30, 2.0),
        Vec3::new(-3.0, 3.0, -1.0),
    ];
    for p in specials {
        let v = shadow_visibility(&map, p);
        assert!((0.0..=1.0).contains(&v), "{p:?} -> {v}");
    }

    for _ in 0..5_000 {
        let p = Vec3::new(
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-0.5..1.5),
        );
        let v = shadow_visibility(&map, p);
        assert!((0.0..=1.0).contains(&v), "{p:?} -> {v}");
        // Nine taps: visibility is a multiple of 1/9.
        let taps = v * 9.0;
        assert!((taps - taps.round()).abs() < 1e-4);
    }
}

#[test]
fn test_empty_map_is_lit() {
    let map = ShadowMap::cleared(0);
    assert_eq!(shadow_visibility(&map, Vec3::new(0.0, 0.0, 0.5)), 1.0);
    assert_eq!(map.compare(IVec2::new(3, -2), 0.9), 1.0);
}

/// A map that counts every lookup.
struct CountingMap {
    lookups: std::cell::Cell<u32>,
}

impl DepthCompare for CountingMap {
    fn size(&self) -> u32 {
        16
    }

    fn compare(&self, _texel: IVec2, _reference: f32) -> f32 {
        self.lookups.set(self.lookups.get() + 1);
        1.0
    }
}

#[test]
fn test_kernel_takes_nine_taps() {
    let map = CountingMap {
        lookups: std::cell::Cell::new(0),
    };
    assert_eq!(shadow_visibility(&map, Vec3::new(0.2, -0.1, 0.4)), 1.0);
    assert_eq!(map.lookups.get(), 9);
}

#[test]
fn test_particle_above_ground_shadows_it() {
    // Rasterize one opaque caster the way the caster pass would, then look
    // up the ground point straight below it along the light.
    let rig = LightRig::new(Vec3::new(0.0, 0.0, -1.0));
    let light = rig.view_proj();
    let size = 64;
    let mut map = ShadowMap::cleared(size);

    let caster = light_space_position(light, Vec3::new(0.0, 0.0, 1.0));
    let uv = caster.truncate() * Vec2::new(0.5, -0.5) + Vec2::splat(0.5);
    let center = (uv * size as f32).floor().as_uvec2();
    for y in center.y - 2..=center.y + 2 {
        for x in center.x - 2..=center.x + 2 {
            let noise = interleaved_gradient_noise(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
            if let FragmentOutcome::Depth(d) = caster_fragment(Vec2::ZERO, 1.0, noise, caster.z) {
                map.write(x, y, d);
            }
        }
    }

    let below = light_space_position(light, Vec3::new(0.0, 0.0, 0.0));
    let beside = light_space_position(light, Vec3::new(2.5, 0.0, 0.0));
    assert_eq!(shadow_visibility(&map, below), 0.0);
    assert_eq!(shadow_visibility(&map, beside), 1.0);
}

// ============================================================================
// Reversed-Z
// ============================================================================

#[test]
fn test_reversed_z_keeps_far_depths_apart() {
    let distinct = |mode: DepthMode| {
        let proj = mode.projection(std::f32::consts::FRAC_PI_4, 1.0, 0.01, 10_000.0);
        let mut bits: Vec<u32> = (0..4_000)
            .map(|i| ndc_depth(proj, 1_000.0 + i as f32 * 0.25).to_bits())
            .collect();
        bits.dedup();
        bits.len()
    };
    assert!(distinct(DepthMode::Reversed) > distinct(DepthMode::Standard));
}

#[test]
fn test_camera_depth_ordering_follows_mode() {
    let camera = Camera::new();
    for mode in [DepthMode::Standard, DepthMode::Reversed] {
        let view_proj = camera.view_proj(1.5, mode);
        let near = view_proj.project_point3(camera.target).z;
        let behind_target = camera.target + (camera.target - camera.position()) * 3.0;
        let far = view_proj.project_point3(behind_target).z;
        assert!(mode.is_closer(near, far), "{mode:?}: near {near} far {far}");
        assert!((0.0..=1.0).contains(&near) && (0.0..=1.0).contains(&far));
    }
}
