//! In-memory GPU context that records every call
//!
//! Useful for testing effects without a graphics device: the recorded call log
//! can be inspected after a draw, and upload failures can be injected.

use super::{GpuContext, ProgramHandle, SamplerFilterMode, SamplerParams, TextureHandle, UniformValue};
use crate::error::GpuError;
use half::f16;
use std::collections::{BTreeMap, HashSet};

/// Texture limit reported by default, the same as `wgpu::Limits::default()`
const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 8192;

/// A single recorded [`GpuContext`] call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateTexture(TextureHandle),
    DeleteTexture(TextureHandle),
    UploadRg16f {
        texture: TextureHandle,
        width: u32,
        height: u32,
        data: Vec<f16>,
    },
    BindTexture {
        unit: u32,
        texture: TextureHandle,
    },
    SetSamplerParams {
        unit: u32,
        params: SamplerParams,
    },
    SetMinFilter {
        unit: u32,
        filter: SamplerFilterMode,
    },
    SetUniform {
        program: ProgramHandle,
        name: String,
        value: UniformValue,
    },
}

/// A [`GpuContext`] that performs no GPU work and logs every call
#[derive(Debug)]
pub struct RecordingContext {
    calls: Vec<GpuCall>,
    live_textures: HashSet<TextureHandle>,
    next_texture: u32,
    uniforms: BTreeMap<(ProgramHandle, String), UniformValue>,
    max_texture_dimension: u32,
    fail_next_upload: bool,
    pending_error: Option<GpuError>,
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            live_textures: HashSet::new(),
            next_texture: 0,
            uniforms: BTreeMap::new(),
            max_texture_dimension: DEFAULT_MAX_TEXTURE_DIMENSION,
            fail_next_upload: false,
            pending_error: None,
        }
    }
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes the limit returned by [`GpuContext::max_texture_dimension`]
    pub fn set_max_texture_dimension(&mut self, max: u32) {
        self.max_texture_dimension = max;
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    /// Forgets the recorded calls; textures and uniforms are kept
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded `upload_rg16f` calls, including failed ones
    pub fn upload_count(&self) -> usize {
        self.calls.iter().filter(|call| matches!(call, GpuCall::UploadRg16f { .. })).count()
    }

    /// Whether `texture` has been created and not yet deleted
    pub fn is_live(&self, texture: TextureHandle) -> bool {
        self.live_textures.contains(&texture)
    }

    /// Number of textures currently alive
    pub fn live_texture_count(&self) -> usize {
        self.live_textures.len()
    }

    /// Last value written to the uniform `name` of `program`
    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        self.uniforms.get(&(program, name.to_string())).copied()
    }

    /// Makes the next upload fail with a driver error
    ///
    /// The failure is reported by the following [`GpuContext::check_error`].
    pub fn fail_next_upload(&mut self) {
        self.fail_next_upload = true;
    }

    fn record_error(&mut self, error: GpuError) {
        // Like a GL driver, keep the first error until it is polled
        self.pending_error.get_or_insert(error);
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) {
        self.uniforms.insert((program, name.to_string()), value);
        self.calls.push(GpuCall::SetUniform {
            program,
            name: name.to_string(),
            value,
        });
    }
}

impl GpuContext for RecordingContext {
    fn create_texture(&mut self) -> TextureHandle {
        let texture = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.live_textures.insert(texture);
        self.calls.push(GpuCall::CreateTexture(texture));
        texture
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.live_textures.remove(&texture);
        self.calls.push(GpuCall::DeleteTexture(texture));
    }

    fn upload_rg16f(&mut self, texture: TextureHandle, width: u32, height: u32, data: &[f16]) {
        self.calls.push(GpuCall::UploadRg16f {
            texture,
            width,
            height,
            data: data.to_vec(),
        });

        if !self.live_textures.contains(&texture) {
            self.record_error(GpuError::UnknownTexture(texture));
        } else if std::mem::take(&mut self.fail_next_upload) {
            self.record_error(GpuError::Driver("out of memory".to_string()));
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        if !self.live_textures.contains(&texture) {
            self.record_error(GpuError::UnknownTexture(texture));
        }
        self.calls.push(GpuCall::BindTexture { unit, texture });
    }

    fn set_sampler_params(&mut self, unit: u32, params: SamplerParams) {
        self.calls.push(GpuCall::SetSamplerParams { unit, params });
    }

    fn set_min_filter(&mut self, unit: u32, filter: SamplerFilterMode) {
        self.calls.push(GpuCall::SetMinFilter { unit, filter });
    }

    fn set_uniform_int(&mut self, program: ProgramHandle, name: &str, value: i32) {
        self.set_uniform(program, name, UniformValue::Int(value));
    }

    fn set_uniform_float(&mut self, program: ProgramHandle, name: &str, value: f32) {
        self.set_uniform(program, name, UniformValue::Float(value));
    }

    fn max_texture_dimension(&self) -> u32 {
        self.max_texture_dimension
    }

    fn check_error(&mut self) -> Result<(), GpuError> {
        match self.pending_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injected_upload_failure_is_reported_once() {
        let mut gpu = RecordingContext::new();
        let texture = gpu.create_texture();
        gpu.fail_next_upload();

        gpu.upload_rg16f(texture, 1, 1, &[f16::ZERO, f16::ONE]);
        assert!(matches!(gpu.check_error(), Err(GpuError::Driver(_))));
        assert_eq!(gpu.check_error(), Ok(()));

        gpu.upload_rg16f(texture, 1, 1, &[f16::ZERO, f16::ONE]);
        assert_eq!(gpu.check_error(), Ok(()));
        assert_eq!(gpu.upload_count(), 2);
    }

    #[test]
    fn test_deleted_texture_is_unknown() {
        let mut gpu = RecordingContext::new();
        let texture = gpu.create_texture();
        gpu.delete_texture(texture);
        assert!(!gpu.is_live(texture));

        gpu.bind_texture(1, texture);
        assert_eq!(gpu.check_error(), Err(GpuError::UnknownTexture(texture)));
    }

    #[test]
    fn test_uniforms_keep_last_value() {
        let mut gpu = RecordingContext::new();
        let program = ProgramHandle(7);
        gpu.set_uniform_int(program, "eff0_num_samples", 7);
        gpu.set_uniform_int(program, "eff0_num_samples", 13);
        gpu.set_uniform_float(program, "eff0_sample_x_scale", 0.5);

        assert_eq!(gpu.uniform(program, "eff0_num_samples"), Some(UniformValue::Int(13)));
        assert_eq!(gpu.uniform(program, "eff0_sample_x_scale"), Some(UniformValue::Float(0.5)));
        assert_eq!(gpu.uniform(ProgramHandle(8), "eff0_num_samples"), None);
    }
}
