//! Standard and reversed-Z depth projection.
//!
//! A standard projection maps the near plane to depth 0 and the far plane to
//! depth 1. Because of the `1/z` falloff almost every depth value ends up
//! crowded against 1.0, exactly where f32 is least precise. Reversing the range
//! (near → 1, far → 0) lines the hyperbola up with float spacing, which keeps
//! distant surfaces from z-fighting.
//!
//! Everything that depends on the direction lives here: the projection
//! matrix, the depth test and the clear value.

use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};

/// Direction of the depth range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DepthMode {
    /// Near → 0, far → 1, test `Less`, clear to 1.
    Standard,
    /// Near → 1, far → 0, test `Greater`, clear to 0.
    #[default]
    Reversed,
}

impl DepthMode {
    /// Right-handed perspective projection with depth in `[0, 1]`.
    pub fn projection(self, fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        match self {
            DepthMode::Standard => Mat4::perspective_rh(fov_y_radians, aspect, near, far),
            DepthMode::Reversed => Mat4::perspective_rh(fov_y_radians, aspect, far, near),
        }
    }

    /// Depth test that keeps the closer fragment.
    pub fn compare(self) -> wgpu::CompareFunction {
        match self {
            DepthMode::Standard => wgpu::CompareFunction::Less,
            DepthMode::Reversed => wgpu::CompareFunction::Greater,
        }
    }

    /// Depth clear value (the far plane).
    pub fn clear_depth(self) -> f32 {
        match self {
            DepthMode::Standard => 1.0,
            DepthMode::Reversed => 0.0,
        }
    }

    /// Whether depth `a` is closer to the camera than depth `b`.
    pub fn is_closer(self, a: f32, b: f32) -> bool {
        match self {
            DepthMode::Standard => a < b,
            DepthMode::Reversed => a > b,
        }
    }

    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            DepthMode::Standard => DepthMode::Reversed,
            DepthMode::Reversed => DepthMode::Standard,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DepthMode::Standard => "standard depth",
            DepthMode::Reversed => "reversed-Z",
        }
    }
}

/// Depth-buffer value of a point `view_distance` in front of the camera.
pub fn ndc_depth(projection: Mat4, view_distance: f32) -> f32 {
    let clip = projection * Vec4::new(0.0, 0.0, -view_distance, 1.0);
    clip.z / clip.w
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const FOV: f32 = std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_cli_names_match_config_names() {
        use clap::ValueEnum;
        for mode in DepthMode::value_variants() {
            let name = mode.to_possible_value().map(|v| v.get_name().to_string());
            let json = serde_json::to_string(mode).unwrap();
            assert_eq!(Some(json.trim_matches('"').to_string()), name);
        }
        assert_eq!(DepthMode::from_str("reversed", false), Ok(DepthMode::Reversed));
    }

    #[test]
    fn test_standard_range() {
        let proj = DepthMode::Standard.projection(FOV, 1.0, 0.1, 100.0);
        assert!(ndc_depth(proj, 0.1).abs() < 1e-5);
        assert!((ndc_depth(proj, 100.0) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_reversed_range() {
        let proj = DepthMode::Reversed.projection(FOV, 1.0, 0.1, 100.0);
        assert!((ndc_depth(proj, 0.1) - 1.0).abs() < 1e-5);
        assert!(ndc_depth(proj, 100.0).abs() < 1e-5);
    }

    #[test]
    fn test_compare_matches_ordering() {
        for mode in [DepthMode::Standard, DepthMode::Reversed] {
            let proj = mode.projection(FOV, 1.0, 0.1, 100.0);
            let near = ndc_depth(proj, 1.0);
            let far = ndc_depth(proj, 50.0);
            assert!(mode.is_closer(near, far), "{mode:?}");
            assert!(mode.is_closer(near, mode.clear_depth()), "{mode:?}");
        }
    }

    #[test]
    fn test_reversed_has_more_far_precision() {
        let distinct = |mode: DepthMode| {
            let proj = mode.projection(FOV, 1.0, 0.1, 1000.0);
            (0..10_000)
                .map(|i| ndc_depth(proj, 500.0 + i as f32 * 0.05).to_bits())
                .collect::<HashSet<_>>()
                .len()
        };
        let standard = distinct(DepthMode::Standard);
        let reversed = distinct(DepthMode::Reversed);
        assert!(reversed > standard * 2, "reversed {reversed} vs standard {standard}");
    }

    #[test]
    fn test_toggle_and_serde_names() {
        assert_eq!(DepthMode::Reversed.toggled(), DepthMode::Standard);
        let json = serde_json::to_string(&DepthMode::Reversed).unwrap();
        assert_eq!(json, "\"reversed\"");
    }
}
