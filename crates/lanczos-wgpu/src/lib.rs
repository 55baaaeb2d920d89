//! Separable Lanczos image resampling for GPU effect graphs
//!
//! A [`Resampler`] rescales an image from its input size to a requested output
//! size with a three-lobed Lanczos kernel, split into a horizontal and a vertical
//! 1D pass. Each pass precomputes a table of `(weight, source coordinate)` pairs
//! per destination pixel, uploads it as a half float texture, and exposes the
//! uniforms its fragment shader reads. GPU access goes through the narrow
//! [`GpuContext`](gpu::GpuContext) interface, implemented for wgpu by
//! [`WgpuContext`](gpu::WgpuContext).

mod effect_chain;
mod resampler;
mod single_pass;

pub mod effect;
pub mod error;
pub mod gpu;
pub mod kernel;
pub mod parameters;
pub mod weight_table;

pub use effect::{Effect, EffectGraph, PassHandle, ResamplerId};
pub use effect_chain::{DrawCall, EffectChain, NodeEffect, NodeId};
pub use error::{ChainError, GpuError, UnknownParameter};
pub use parameters::{Direction, Extent, PassParameter, ResamplerParameter};
pub use resampler::{PassEffect, Resampler};
pub use single_pass::{PassSize, SinglePass};
pub use weight_table::{WeightSample, WeightTable};
