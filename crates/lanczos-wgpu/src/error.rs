//! Error types for GPU operations, parameter parsing and chain execution

use crate::{effect::ResamplerId, effect_chain::NodeId, gpu::TextureHandle};
use thiserror::Error;

/// Failure reported by a [`GpuContext`](crate::gpu::GpuContext) driver error hook
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    /// An operation referenced a texture that was never created or already deleted
    #[error("texture {0:?} does not exist in this context")]
    UnknownTexture(TextureHandle),
    /// The requested texture exceeds the device's 2D texture limit
    #[error("texture of {width}x{height} exceeds the maximum dimension of {max}")]
    TextureTooLarge {
        /// Requested width in texels
        width: u64,
        /// Requested height in texels
        height: u32,
        /// Largest dimension the device accepts
        max: u32,
    },
    /// Any other error raised by the graphics driver
    #[error("graphics driver error: {0}")]
    Driver(String),
}

/// A configuration key that no effect recognises
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown parameter `{0}`")]
pub struct UnknownParameter(pub String);

/// Errors raised while finalizing or drawing an [`EffectChain`](crate::EffectChain)
#[derive(Debug, Error)]
pub enum ChainError {
    /// The enabled nodes do not form a directed acyclic graph
    #[error("effect chain contains a cycle")]
    Cycle,
    /// A node that needs an input has no incoming edge
    #[error("node {0:?} has no input")]
    MissingInput(NodeId),
    /// A node references a resampler the chain does not own
    #[error("resampler {0:?} is not part of this chain")]
    UnknownResampler(ResamplerId),
    /// A GPU operation failed while drawing
    #[error(transparent)]
    Gpu(#[from] GpuError),
}
