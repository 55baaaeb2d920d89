//! GPU capability interface
//!
//! The resampler needs only a handful of GPU primitives: allocate a texture,
//! upload a two-channel half float image into it, bind it to a texture unit,
//! configure sampling and publish uniforms. [`GpuContext`] captures exactly
//! those, so the pass logic runs unchanged against [`WgpuContext`] or the
//! call-recording [`RecordingContext`].

mod recording;
mod wgpu_context;

pub use recording::{GpuCall, RecordingContext};
pub use wgpu_context::WgpuContext;

use crate::error::GpuError;
use half::f16;

/// Opaque identifier of a texture owned by a [`GpuContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Opaque identifier of a compiled shader program, assigned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

/// Texture sampling filter modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerFilterMode {
    /// Nearest neighbor sampling
    Nearest,
    /// Linear interpolation sampling
    Linear,
}

/// Behaviour for coordinates outside `[0, 1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Wrap around, tiling the texture
    Repeat,
    /// Clamp to the outermost texel
    ClampToEdge,
}

/// Complete sampler configuration of a texture unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerParams {
    pub min_filter: SamplerFilterMode,
    pub mag_filter: SamplerFilterMode,
    /// Address mode along x
    pub address_mode_u: AddressMode,
    /// Address mode along y
    pub address_mode_v: AddressMode,
}

impl SamplerParams {
    /// Unfiltered, repeating lookup used for weight textures
    pub const NEAREST_REPEAT: Self = Self {
        min_filter: SamplerFilterMode::Nearest,
        mag_filter: SamplerFilterMode::Nearest,
        address_mode_u: AddressMode::Repeat,
        address_mode_v: AddressMode::Repeat,
    };
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            min_filter: SamplerFilterMode::Linear,
            mag_filter: SamplerFilterMode::Linear,
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
        }
    }
}

/// A scalar uniform value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
}

/// The GPU primitives consumed by resampling passes
///
/// Operations do not return errors themselves. As with a GL driver, failures
/// are collected by the context and reported by the next [`check_error`] call,
/// which callers make after every operation.
///
/// Texture unit 0 is the unit the input image is bound to.
///
/// [`check_error`]: GpuContext::check_error
pub trait GpuContext {
    /// Allocates a new, empty texture
    fn create_texture(&mut self) -> TextureHandle;

    /// Releases a texture; unknown handles are ignored
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Replaces the contents of `texture` with a `width × height` RG16F image
    ///
    /// `data` holds `width * height * 2` interleaved half floats in row-major order.
    fn upload_rg16f(&mut self, texture: TextureHandle, width: u32, height: u32, data: &[f16]);

    /// Makes `texture` the texture sampled through `unit`
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Sets the full sampler state of `unit`
    fn set_sampler_params(&mut self, unit: u32, params: SamplerParams);

    /// Sets only the minification filter of `unit`; mipmapping stays disabled
    fn set_min_filter(&mut self, unit: u32, filter: SamplerFilterMode);

    fn set_uniform_int(&mut self, program: ProgramHandle, name: &str, value: i32);

    fn set_uniform_float(&mut self, program: ProgramHandle, name: &str, value: f32);

    /// Largest width or height a texture may have
    fn max_texture_dimension(&self) -> u32;

    /// Driver error hook: returns and clears the first error since the last call
    fn check_error(&mut self) -> Result<(), GpuError>;
}

/// Builds the fully qualified name of a uniform owned by an effect instance
pub fn uniform_name(prefix: &str, name: &str) -> String {
    format!("{prefix}_{name}")
}
