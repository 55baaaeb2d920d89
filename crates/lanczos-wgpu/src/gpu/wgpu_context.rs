//! [`GpuContext`] implementation on top of wgpu
//!
//! wgpu has no global texture units or loose uniforms, so this context keeps that
//! state on the CPU side: a table of weight textures, the texture and sampler
//! configuration of every unit, and the uniform values written for each program.
//! The host reads it back through [`WgpuContext::bound_texture`],
//! [`WgpuContext::create_sampler`] and [`WgpuContext::uniform`] when it builds
//! bind groups and uniform buffers for a draw.

use super::{AddressMode, GpuContext, ProgramHandle, SamplerFilterMode, SamplerParams, TextureHandle, UniformValue};
use crate::error::GpuError;
use half::f16;
use std::collections::{BTreeMap, HashMap};

/// Texture usage flags for weight textures
const WEIGHT_TEXTURE_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING.union(wgpu::TextureUsages::COPY_DST).union(wgpu::TextureUsages::COPY_SRC);

/// State of a single texture unit
#[derive(Debug, Clone, Copy, Default)]
struct TextureUnit {
    /// Texture bound to this unit, if any
    texture: Option<TextureHandle>,
    /// Sampler configuration
    params: SamplerParams,
}

/// A [`GpuContext`] backed by a wgpu device and queue
#[derive(Debug)]
pub struct WgpuContext {
    /// The wgpu device
    device: wgpu::Device,
    /// The wgpu command queue
    queue: wgpu::Queue,
    /// Allocated handles; `None` until the first upload gives the texture a size
    textures: HashMap<TextureHandle, Option<wgpu::Texture>>,
    /// Next handle to hand out
    next_texture: u32,
    /// Texture unit state, indexed by unit number
    units: BTreeMap<u32, TextureUnit>,
    /// Uniform values per program and fully qualified name
    uniforms: HashMap<ProgramHandle, BTreeMap<String, UniformValue>>,
    /// First error since the last `check_error`
    pending_error: Option<GpuError>,
}

impl WgpuContext {
    /// Creates a context that allocates resources on `device`
    ///
    /// # Arguments
    /// * `device` - The wgpu device for texture creation
    /// * `queue` - The queue used to upload texture data
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            textures: HashMap::new(),
            next_texture: 0,
            units: BTreeMap::new(),
            uniforms: HashMap::new(),
            pending_error: None,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The wgpu texture behind `handle`, once it has been uploaded
    pub fn texture(&self, handle: TextureHandle) -> Option<&wgpu::Texture> {
        self.textures.get(&handle).and_then(Option::as_ref)
    }

    /// The texture currently bound to `unit`
    pub fn bound_texture(&self, unit: u32) -> Option<&wgpu::Texture> {
        self.units.get(&unit).and_then(|u| u.texture).and_then(|handle| self.texture(handle))
    }

    /// Sampler configuration recorded for `unit`
    pub fn sampler_params(&self, unit: u32) -> SamplerParams {
        self.units.get(&unit).map(|u| u.params).unwrap_or_default()
    }

    /// Creates a wgpu sampler matching the recorded configuration of `unit`
    ///
    /// Mipmapping is always disabled; the resampling kernel already integrates
    /// over every source pixel when minifying.
    pub fn create_sampler(&self, unit: u32) -> wgpu::Sampler {
        let params = self.sampler_params(unit);
        let address_mode = |mode: AddressMode| match mode {
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        };
        let filter_mode = |mode: SamplerFilterMode| match mode {
            SamplerFilterMode::Nearest => wgpu::FilterMode::Nearest,
            SamplerFilterMode::Linear => wgpu::FilterMode::Linear,
        };

        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("Texture Unit {unit} Sampler")),
            address_mode_u: address_mode(params.address_mode_u),
            address_mode_v: address_mode(params.address_mode_v),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter_mode(params.mag_filter),
            min_filter: filter_mode(params.min_filter),
            mipmap_filter: wgpu::FilterMode::Nearest,
            lod_min_clamp: 0.0,
            lod_max_clamp: 0.0,
            compare: None,
            anisotropy_clamp: 1,
            border_color: None,
        })
    }

    /// Last value written to the uniform `name` of `program`
    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        self.uniforms.get(&program).and_then(|values| values.get(name)).copied()
    }

    /// All uniforms written for `program`, ordered by name
    pub fn uniforms(&self, program: ProgramHandle) -> impl Iterator<Item = (&str, UniformValue)> {
        self.uniforms.get(&program).into_iter().flat_map(|values| values.iter().map(|(name, value)| (name.as_str(), *value)))
    }

    fn record_error(&mut self, error: GpuError) {
        self.pending_error.get_or_insert(error);
    }

    fn unit_mut(&mut self, unit: u32) -> &mut TextureUnit {
        self.units.entry(unit).or_default()
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) {
        self.uniforms.entry(program).or_default().insert(name.to_string(), value);
    }
}

impl GpuContext for WgpuContext {
    fn create_texture(&mut self) -> TextureHandle {
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(handle, None);
        handle
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if let Some(Some(texture)) = self.textures.remove(&texture) {
            texture.destroy();
        }
    }

    fn upload_rg16f(&mut self, texture: TextureHandle, width: u32, height: u32, data: &[f16]) {
        if !self.textures.contains_key(&texture) {
            self.record_error(GpuError::UnknownTexture(texture));
            return;
        }

        let max = self.max_texture_dimension();
        if width > max || height > max {
            self.record_error(GpuError::TextureTooLarge {
                width: u64::from(width),
                height,
                max,
            });
            return;
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        // The size may differ from the previous upload, so always allocate anew
        let new_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("Weight Texture {}", texture.0)),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rg16Float,
            usage: WEIGHT_TEXTURE_USAGE,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &new_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 2 * 2), // 2 components * 2 bytes per f16
                rows_per_image: Some(height),
            },
            size,
        );

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            new_texture.destroy();
            self.record_error(GpuError::Driver(error.to_string()));
            return;
        }

        if let Some(old_texture) = self.textures.insert(texture, Some(new_texture)).flatten() {
            old_texture.destroy();
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        if !self.textures.contains_key(&texture) {
            self.record_error(GpuError::UnknownTexture(texture));
            return;
        }
        self.unit_mut(unit).texture = Some(texture);
    }

    fn set_sampler_params(&mut self, unit: u32, params: SamplerParams) {
        self.unit_mut(unit).params = params;
    }

    fn set_min_filter(&mut self, unit: u32, filter: SamplerFilterMode) {
        self.unit_mut(unit).params.min_filter = filter;
    }

    fn set_uniform_int(&mut self, program: ProgramHandle, name: &str, value: i32) {
        self.set_uniform(program, name, UniformValue::Int(value));
    }

    fn set_uniform_float(&mut self, program: ProgramHandle, name: &str, value: f32) {
        self.set_uniform(program, name, UniformValue::Float(value));
    }

    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn check_error(&mut self) -> Result<(), GpuError> {
        match self.pending_error.take() {
            Some(error) => {
                tracing::warn!(%error, "GPU error reported");
                Err(error)
            }
            None => Ok(()),
        }
    }
}
