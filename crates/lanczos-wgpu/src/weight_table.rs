//! Resampling weight table generation
//!
//! For a 1D resize from `src_size` to `dst_size` pixels, every destination pixel
//! reads `src_samples` source pixels. The table stores, per destination pixel and
//! per sample, the kernel weight and the normalised source coordinate to fetch.
//! The GPU sees it as a two-channel texture of `src_samples × dst_size` texels,
//! one row per destination pixel.
//!
//! When downscaling, the kernel is stretched by `1 / r` with
//! `r = min(dst / src, 1)` so that it integrates over every source pixel that
//! maps onto a destination pixel, and the weights are multiplied by `r` to keep
//! the overall gain at one.

use crate::kernel::{LANCZOS_RADIUS, lanczos};
use bytemuck::{Pod, Zeroable};
use half::f16;

/// One `(weight, coordinate)` entry of a weight table
///
/// Laid out as the two channels of a texel: red is the weight, green the
/// normalised source coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct WeightSample {
    /// Kernel weight, already scaled by the radius scaling factor
    pub weight: f32,
    /// Texture coordinate of the source pixel centre; may leave `[0, 1)`
    pub coord: f32,
}

/// Precomputed Lanczos weights for one resampling axis
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    src_size: u32,
    dst_size: u32,
    int_radius: u32,
    samples: Vec<WeightSample>,
}

/// Source position that destination pixel `dst_index` is centred on
///
/// Pixel centres sit at half-integer coordinates on both sides, so the mapping
/// is `(dst_index + 0.5) · src / dst − 0.5`.
pub fn source_center(src_size: u32, dst_size: u32, dst_index: u32) -> f64 {
    (dst_index as f64 + 0.5) * src_size as f64 / dst_size as f64 - 0.5
}

/// Kernel stretch factor `min(dst / src, 1)`
pub fn radius_scaling_factor(src_size: u32, dst_size: u32) -> f64 {
    (dst_size as f64 / src_size as f64).min(1.0)
}

/// Number of source samples each destination pixel reads
///
/// Equal to `2 · round(a / r) + 1`, where `a` is [`LANCZOS_RADIUS`]. Computed in
/// `u64`: extreme downscales need more samples than any texture can hold.
pub fn sample_count(src_size: u32, dst_size: u32) -> u64 {
    2 * integer_radius(radius_scaling_factor(src_size, dst_size)) + 1
}

/// `round(a / r)`; at most `3 · u32::MAX` since `r >= 1 / u32::MAX`
fn integer_radius(radius_scaling_factor: f64) -> u64 {
    (LANCZOS_RADIUS / radius_scaling_factor).round() as u64
}

impl WeightTable {
    /// Computes the weight table for resizing `src_size` pixels to `dst_size`
    ///
    /// Source indices outside `[0, src_size)` are kept as-is; their coordinates
    /// fall outside `[0, 1)` and the sampler's address mode decides what they read.
    /// Weights are not renormalised.
    ///
    /// # Arguments
    /// * `src_size` - Number of pixels along the axis in the input
    /// * `dst_size` - Number of pixels along the axis in the output
    ///
    /// # Panics
    /// Panics if either size is zero, or if [`sample_count`] exceeds `u32::MAX`.
    pub fn build(src_size: u32, dst_size: u32) -> Self {
        assert!(src_size > 0, "weight table source size must be non-zero");
        assert!(dst_size > 0, "weight table destination size must be non-zero");

        let r = radius_scaling_factor(src_size, dst_size);
        let src_samples = u32::try_from(sample_count(src_size, dst_size))
            .unwrap_or_else(|_| panic!("weight table for {src_size} -> {dst_size} needs more than u32::MAX samples per row"));
        let int_radius = src_samples / 2;

        let mut samples = Vec::with_capacity(dst_size as usize * src_samples as usize);
        for y in 0..dst_size {
            let center = source_center(src_size, dst_size, y);
            let base = center.round() as i64;

            for i in 0..src_samples {
                let src = base + i as i64 - int_radius as i64;
                let weight = lanczos(r * (src as f64 - center), LANCZOS_RADIUS) * r;
                let coord = (src as f64 + 0.5) / src_size as f64;
                samples.push(WeightSample {
                    weight: weight as f32,
                    coord: coord as f32,
                });
            }
        }

        Self {
            src_size,
            dst_size,
            int_radius,
            samples,
        }
    }

    pub fn src_size(&self) -> u32 {
        self.src_size
    }

    pub fn dst_size(&self) -> u32 {
        self.dst_size
    }

    /// Half-width of the sampling window in source pixels
    pub fn int_radius(&self) -> u32 {
        self.int_radius
    }

    /// Samples per destination pixel; the width of the weight texture
    pub fn src_samples(&self) -> u32 {
        2 * self.int_radius + 1
    }

    /// The samples read by destination pixel `dst_index`
    ///
    /// # Panics
    /// Panics if `dst_index >= dst_size`.
    pub fn row(&self, dst_index: u32) -> &[WeightSample] {
        let width = self.src_samples() as usize;
        let start = dst_index as usize * width;
        &self.samples[start..start + width]
    }

    /// All samples in row-major order (`[dst_index][sample_index]`)
    pub fn samples(&self) -> &[WeightSample] {
        &self.samples
    }

    /// Flattens the table into interleaved half floats for an RG16F upload
    pub fn to_rg16f(&self) -> Vec<f16> {
        let floats: &[f32] = bytemuck::cast_slice(&self.samples);
        floats.iter().copied().map(f16::from_f32).collect()
    }
}
