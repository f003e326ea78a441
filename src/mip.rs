//! Weighted mip-pyramid sampling.
//!
//! A spawn-probability map is stored as a mip pyramid. Level 0 is the source
//! image (color plus a non-negative weight per texel). Every texel on a coarser
//! level holds the cumulative probability thresholds of its 2x2 children:
//!
//! ```text
//! 0.0          r            g            b           1.0
//!  |  TOP-LEFT  |  TOP-RIGHT | BOTTOM-LEFT| BOTTOM-RIGHT |
//! ```
//!
//! Sampling starts at the 1x1 level and descends one level per uniform draw,
//! so the chance of landing on a level-0 texel is its weight over the total.
//!
//! # Example
//!
//! ```ignore
//! use wgpu_gallery::mip::{MipPyramid, WeightChannel};
//!
//! let pyramid = MipPyramid::open("assets/logo.png", WeightChannel::Alpha, 512)?;
//! let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
//! let spawn = pyramid.sample(&mut rng);
//! println!("spawn at {:?} with color {:?}", spawn.texel, spawn.color);
//! ```

use std::path::Path;

use glam::{UVec2, Vec2, Vec4};
use image::{imageops::FilterType, DynamicImage};
use serde::{Deserialize, Serialize};

use crate::error::PyramidError;
use crate::rng::UniformSource;

/// Which channel of the source image becomes the spawn weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightChannel {
    /// Alpha channel (default). Transparent regions never spawn.
    #[default]
    Alpha,
    /// Rec.709 luminance times alpha. Bright regions spawn more.
    Luminance,
}

impl WeightChannel {
    /// Weight of an RGBA color in `[0, 1]`.
    pub fn weight(self, color: Vec4) -> f32 {
        match self {
            WeightChannel::Alpha => color.w,
            WeightChannel::Luminance => {
                (0.2126 * color.x + 0.7152 * color.y + 0.0722 * color.z) * color.w
            }
        }
    }
}

/// One of the four children of a pyramid texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

impl Quadrant {
    const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    /// Pick the child whose sub-interval contains `v`.
    ///
    /// The index is the number of thresholds `r, g, b` that are `<= v`. With
    /// all-zero thresholds this is always `BottomRight`.
    #[inline]
    pub fn select(thresholds: Vec4, v: f32) -> Quadrant {
        let index = (v >= thresholds.x) as usize
            + (v >= thresholds.y) as usize
            + (v >= thresholds.z) as usize;
        Self::ALL[index]
    }

    /// Quadrant index in `0..4`.
    #[inline]
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Texel offset in the next finer level.
    #[inline]
    pub fn offset(self) -> UVec2 {
        let i = self.index();
        UVec2::new(i & 1, i >> 1)
    }
}

/// Result of one pyramid descent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnSample {
    /// Level-0 texel coordinate.
    pub texel: UVec2,
    /// Level-0 color at `texel`.
    pub color: Vec4,
    size: u32,
}

impl SpawnSample {
    /// Texel center in normalized `[0, 1]` image coordinates (v grows downward).
    pub fn uv(&self) -> Vec2 {
        (self.texel.as_vec2() + Vec2::splat(0.5)) / self.size as f32
    }
}

/// A spawn-probability pyramid.
#[derive(Debug, Clone)]
pub struct MipPyramid {
    size: u32,
    colors: Vec<Vec4>,
    weights: Vec<f32>,
    /// `levels[i]` is mip level `i + 1`.
    levels: Vec<Vec<Vec4>>,
    total_weight: f32,
}

impl MipPyramid {
    /// Build a pyramid from level-0 colors and weights.
    ///
    /// `size` must be a power of two; both slices hold `size * size` entries in
    /// row-major order. Negative or non-finite weights count as zero.
    pub fn from_weights(size: u32, colors: Vec<Vec4>, weights: Vec<f32>) -> Result<Self, PyramidError> {
        if size == 0 || !size.is_power_of_two() {
            return Err(PyramidError::NotPowerOfTwo {
                width: size,
                height: size,
            });
        }
        let expected = (size as usize) * (size as usize);
        for actual in [colors.len(), weights.len()] {
            if actual != expected {
                return Err(PyramidError::DataLength { expected, actual });
            }
        }

        let weights: Vec<f32> = weights
            .into_iter()
            .map(|w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
            .collect();

        let mut levels = Vec::with_capacity(size.trailing_zeros() as usize);
        let mut below = weights.clone();
        let mut below_size = size;
        while below_size > 1 {
            let level_size = below_size / 2;
            let (side, row) = (level_size as usize, below_size as usize);
            let mut thresholds = Vec::with_capacity(side * side);
            let mut means = Vec::with_capacity(side * side);
            for y in 0..side {
                for x in 0..side {
                    let i = 2 * y * row + 2 * x;
                    let children = [below[i], below[i + 1], below[i + row], below[i + row + 1]];
                    thresholds.push(cumulative_thresholds(children));
                    means.push(children.iter().sum::<f32>() / 4.0);
                }
            }
            levels.push(thresholds);
            below = means;
            below_size = level_size;
        }

        let total_weight = weights.iter().sum();
        Ok(Self {
            size,
            colors,
            weights,
            levels,
            total_weight,
        })
    }

    /// Build a pyramid from tightly packed RGBA8 bytes.
    pub fn from_rgba8(size: u32, bytes: &[u8], channel: WeightChannel) -> Result<Self, PyramidError> {
        let expected = (size as usize) * (size as usize) * 4;
        if bytes.len() != expected {
            return Err(PyramidError::DataLength {
                expected,
                actual: bytes.len(),
            });
        }
        let colors: Vec<Vec4> = bytes
            .chunks_exact(4)
            .map(|px| Vec4::new(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32) / 255.0)
            .collect();
        let weights = colors.iter().map(|&c| channel.weight(c)).collect();
        Self::from_weights(size, colors, weights)
    }

    /// Build a pyramid from a decoded image.
    ///
    /// The image is resized to the largest power-of-two square that is no
    /// bigger than its longer side and no bigger than `max_size`.
    pub fn from_image(image: &DynamicImage, channel: WeightChannel, max_size: u32) -> Result<Self, PyramidError> {
        let (width, height) = (image.width(), image.height());
        let longest = width.max(height).min(max_size);
        if longest == 0 {
            return Err(PyramidError::NotPowerOfTwo { width, height });
        }
        let size = 1u32 << (31 - longest.leading_zeros());
        let rgba = image.to_rgba8();
        let resized = if rgba.width() == size && rgba.height() == size {
            rgba
        } else {
            image::imageops::resize(&rgba, size, size, FilterType::Triangle)
        };
        Self::from_rgba8(size, resized.as_raw(), channel)
    }

    /// Load an image file (PNG or JPEG) and build its pyramid.
    pub fn open<P: AsRef<Path>>(path: P, channel: WeightChannel, max_size: u32) -> Result<Self, PyramidError> {
        let image = image::open(path.as_ref())?;
        log::info!(
            "loaded spawn image '{}' ({}x{})",
            path.as_ref().display(),
            image.width(),
            image.height()
        );
        Self::from_image(&image, channel, max_size)
    }

    /// Build a procedural pyramid; `f(x, y)` returns the level-0 color.
    pub fn from_fn<F>(size: u32, channel: WeightChannel, f: F) -> Result<Self, PyramidError>
    where
        F: Fn(u32, u32) -> Vec4,
    {
        let mut colors = Vec::with_capacity((size as usize) * (size as usize));
        for y in 0..size {
            for x in 0..size {
                colors.push(f(x, y));
            }
        }
        let weights = colors.iter().map(|&c| channel.weight(c)).collect();
        Self::from_weights(size, colors, weights)
    }

    /// Level-0 width and height.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of mip levels including level 0 (`log2(size) + 1`).
    #[inline]
    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32 + 1
    }

    /// Width and height of a level.
    #[inline]
    pub fn level_size(&self, level: u32) -> u32 {
        self.size >> level
    }

    /// Child thresholds stored at `(x, y)` on `level` (must be >= 1).
    pub fn thresholds(&self, level: u32, x: u32, y: u32) -> Vec4 {
        debug_assert!(level >= 1 && level < self.level_count());
        let row = self.level_size(level) as usize;
        self.levels[(level - 1) as usize][y as usize * row + x as usize]
    }

    /// All texels of a level in row-major order. Level 0 yields colors.
    pub fn level_texels(&self, level: u32) -> &[Vec4] {
        if level == 0 {
            &self.colors
        } else {
            &self.levels[(level - 1) as usize]
        }
    }

    /// Level-0 color.
    pub fn color(&self, x: u32, y: u32) -> Vec4 {
        self.colors[self.texel_index(x, y)]
    }

    /// Level-0 weight.
    pub fn weight(&self, x: u32, y: u32) -> f32 {
        self.weights[self.texel_index(x, y)]
    }

    #[inline]
    fn texel_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size as usize + x as usize
    }

    /// Sum of all level-0 weights.
    pub fn total_weight(&self) -> f32 {
        self.total_weight
    }

    /// Probability that [`sample`](Self::sample) returns `(x, y)`.
    ///
    /// Returns 0 for every texel when the whole image has zero weight.
    pub fn probability(&self, x: u32, y: u32) -> f32 {
        if self.total_weight > 0.0 {
            self.weight(x, y) / self.total_weight
        } else {
            0.0
        }
    }

    /// Draw a level-0 texel with probability proportional to its weight.
    ///
    /// Consumes exactly `level_count() - 1` values from `rng`.
    pub fn sample<S: UniformSource + ?Sized>(&self, rng: &mut S) -> SpawnSample {
        let mut coord = UVec2::ZERO;
        for level in (1..self.level_count()).rev() {
            let thresholds = self.thresholds(level, coord.x, coord.y);
            let quadrant = Quadrant::select(thresholds, rng.next_f32());
            coord = coord * 2 + quadrant.offset();
        }
        SpawnSample {
            texel: coord,
            color: self.color(coord.x, coord.y),
            size: self.size,
        }
    }
}

/// Ascending thresholds `(r, g, b, a)` for children `[tl, tr, bl, br]`.
///
/// An all-zero block gives `(0, 0, 0, 0)`. Otherwise `a` is 1 and every
/// threshold with only zero weight after it is pinned to exactly 1, so empty
/// children can never be drawn.
fn cumulative_thresholds(children: [f32; 4]) -> Vec4 {
    let sum: f32 = children.iter().sum();
    if sum <= 0.0 {
        return Vec4::ZERO;
    }
    let mut out = [1.0f32; 4];
    let mut running = 0.0;
    for i in 0..3 {
        running += children[i];
        let rest: f32 = children[i + 1..].iter().sum();
        if rest > 0.0 {
            out[i] = (running / sum).min(1.0);
        }
    }
    Vec4::from_array(out)
}

/// WGSL descent over a `texture_2d<f32>` named `probability_map`.
///
/// Requires [`RANDOM_WGSL`](crate::rng::RANDOM_WGSL) for `rand`.
pub const SAMPLER_WGSL: &str = r#"
fn sample_spawn_texel(state: ptr<function, u32>) -> vec2<u32> {
    var coord = vec2<u32>(0u, 0u);
    let levels = textureNumLevels(probability_map);
    for (var level = levels - 1u; level > 0u; level = level - 1u) {
        let t = textureLoad(probability_map, coord, level);
        let v = rand(state);
        let q = select(0u, 1u, v >= t.x) + select(0u, 1u, v >= t.y) + select(0u, 1u, v >= t.z);
        coord = coord * 2u + vec2<u32>(q & 1u, q >> 1u);
    }
    return coord;
}
"#;
