//! One-dimensional resampling pass
//!
//! A [`SinglePass`] resamples along one axis. It owns the weight texture the
//! fragment shader reads its `(weight, coordinate)` pairs from, rebuilds that
//! texture lazily whenever its dimensions change, and publishes the sampler and
//! uniforms the shader expects.

use crate::{
    effect::Effect,
    error::GpuError,
    gpu::{GpuContext, ProgramHandle, SamplerFilterMode, SamplerParams, TextureHandle, uniform_name},
    parameters::{Direction, Extent, PassParameter, size_from_float, size_from_int},
    weight_table::{WeightTable, sample_count},
};

/// Shared fragment shader body for both directions
const SHADER_TEMPLATE: &str = include_str!("../shaders/resample_effect.frag");

/// Texture unit the input image is sampled through
const INPUT_TEXTURE_UNIT: u32 = 0;

/// Input and output dimensions of a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PassSize {
    pub input: Extent,
    pub output: Extent,
}

impl PassSize {
    /// Size of a horizontal pass: only the width changes
    pub fn horizontal(input: Extent, output_width: u32) -> Self {
        Self {
            input,
            output: Extent::new(output_width, input.height),
        }
    }

    /// Size of a vertical pass: only the height changes
    pub fn vertical(input: Extent, output_height: u32) -> Self {
        Self {
            input,
            output: Extent::new(input.width, output_height),
        }
    }

    /// Whether the untouched axis has the same size on both sides
    pub fn is_consistent(&self, direction: Direction) -> bool {
        match direction {
            Direction::Horizontal => self.input.height == self.output.height,
            Direction::Vertical => self.input.width == self.output.width,
        }
    }

    /// `(src_size, dst_size)` along the resampled axis
    ///
    /// # Panics
    /// Panics if the other axis differs between input and output.
    fn axis_sizes(&self, direction: Direction) -> (u32, u32) {
        match direction {
            Direction::Horizontal => {
                assert_eq!(self.input.height, self.output.height, "horizontal pass cannot change the height");
                (self.input.width, self.output.width)
            }
            Direction::Vertical => {
                assert_eq!(self.input.width, self.output.width, "vertical pass cannot change the width");
                (self.input.height, self.output.height)
            }
        }
    }
}

/// The weight texture contents currently on the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UploadedTable {
    /// Pass size the table was built for
    size: PassSize,
    /// Width of the uploaded texture
    src_samples: u32,
}

/// A horizontal or vertical Lanczos resampling stage
#[derive(Debug)]
pub struct SinglePass {
    direction: Direction,
    size: PassSize,
    /// Whether input size notifications belong to the owning resampler
    forwards_input_size: bool,
    uploaded: Option<UploadedTable>,
    weight_texture: Option<TextureHandle>,
}

impl SinglePass {
    /// Creates a pass with the default 1280x720 input and output size
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            size: PassSize::default(),
            forwards_input_size: false,
            uploaded: None,
            weight_texture: None,
        }
    }

    /// Creates a pass whose input size notifications are handed to its parent
    pub(crate) fn forwarding_input_size(direction: Direction) -> Self {
        let mut pass = Self::new(direction);
        pass.forwards_input_size = true;
        pass
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn size(&self) -> PassSize {
        self.size
    }

    /// Replaces all four dimensions at once
    pub fn set_size(&mut self, size: PassSize) {
        self.size = size;
    }

    /// Sets one dimension
    ///
    /// # Returns
    /// `false` for [`PassParameter::Direction`], which is not a dimension
    pub fn set_dimension(&mut self, parameter: PassParameter, value: u32) -> bool {
        match parameter {
            PassParameter::Direction => return false,
            PassParameter::InputWidth => self.size.input.width = value,
            PassParameter::InputHeight => self.size.input.height = value,
            PassParameter::OutputWidth => self.size.output.width = value,
            PassParameter::OutputHeight => self.size.output.height = value,
        }
        true
    }

    /// Whether notifications about the input size are meant for the owning resampler
    pub fn forwards_input_size(&self) -> bool {
        self.forwards_input_size
    }

    /// Samples per destination pixel of the uploaded weight table
    pub fn src_samples(&self) -> Option<u32> {
        self.uploaded.map(|table| table.src_samples)
    }

    /// Size the uploaded weight table was built for
    pub fn uploaded_size(&self) -> Option<PassSize> {
        self.uploaded.map(|table| table.size)
    }

    pub fn weight_texture(&self) -> Option<TextureHandle> {
        self.weight_texture
    }

    /// Fragment shader source, specialised for this pass's direction
    pub fn output_fragment_shader(&self) -> String {
        let vertical = u8::from(self.direction == Direction::Vertical);
        format!("#define DIRECTION_VERTICAL {vertical}\n{SHADER_TEMPLATE}")
    }

    /// Publishes the weight texture and uniforms for the next draw
    ///
    /// Rebuilds the weight texture first if any dimension changed since the
    /// last successful upload. If the upload fails the previous state is kept,
    /// so the next call tries again.
    ///
    /// # Arguments
    /// * `gpu` - The GPU context to issue calls on
    /// * `program` - Program owning the uniforms
    /// * `prefix` - Uniform name prefix of this pass
    /// * `sampler_slot` - Texture unit to bind the weights to; incremented by one
    ///
    /// # Panics
    /// Panics if the size is inconsistent with the direction, or a dimension is zero.
    pub fn set_gl_state(&mut self, gpu: &mut dyn GpuContext, program: ProgramHandle, prefix: &str, sampler_slot: &mut u32) -> Result<(), GpuError> {
        let texture = match self.weight_texture {
            Some(texture) => texture,
            None => {
                let texture = gpu.create_texture();
                gpu.check_error()?;
                self.weight_texture = Some(texture);
                texture
            }
        };

        let src_samples = match self.uploaded.filter(|table| table.size == self.size) {
            Some(table) => table.src_samples,
            None => self.update_texture(gpu, texture)?,
        };

        gpu.bind_texture(*sampler_slot, texture);
        gpu.check_error()?;
        gpu.set_sampler_params(*sampler_slot, SamplerParams::NEAREST_REPEAT);
        gpu.check_error()?;

        gpu.set_uniform_int(program, &uniform_name(prefix, "sample_tex"), *sampler_slot as i32);
        gpu.check_error()?;
        *sampler_slot += 1;
        gpu.set_uniform_int(program, &uniform_name(prefix, "num_samples"), src_samples as i32);
        gpu.check_error()?;

        // Maps an integer sample index to the texel centre of the weight texture
        gpu.set_uniform_float(program, &uniform_name(prefix, "sample_x_scale"), 1.0 / src_samples as f32);
        gpu.check_error()?;
        gpu.set_uniform_float(program, &uniform_name(prefix, "sample_x_offset"), 0.5 / src_samples as f32);
        gpu.check_error()?;

        // The input must be filtered bilinearly without mipmaps; mipmaps break minification
        gpu.set_min_filter(INPUT_TEXTURE_UNIT, SamplerFilterMode::Linear);
        gpu.check_error()?;

        tracing::trace!(direction = ?self.direction, prefix, src_samples, "published resample pass state");
        Ok(())
    }

    /// Rebuilds and uploads the weight table, returning its sample count
    ///
    /// Tables wider or taller than the context's texture limit are rejected
    /// before any weights are computed.
    fn update_texture(&mut self, gpu: &mut dyn GpuContext, texture: TextureHandle) -> Result<u32, GpuError> {
        let (src_size, dst_size) = self.size.axis_sizes(self.direction);

        let width = sample_count(src_size, dst_size);
        let max = gpu.max_texture_dimension();
        if width > u64::from(max) || dst_size > max {
            tracing::warn!(direction = ?self.direction, src_size, dst_size, width, max, "weight table exceeds the texture limit");
            return Err(GpuError::TextureTooLarge { width, height: dst_size, max });
        }

        let table = WeightTable::build(src_size, dst_size);
        let src_samples = table.src_samples();

        tracing::debug!(direction = ?self.direction, src_size, dst_size, src_samples, "rebuilding weight table");

        gpu.upload_rg16f(texture, src_samples, dst_size, &table.to_rg16f());
        gpu.check_error()?;

        self.uploaded = Some(UploadedTable { size: self.size, src_samples });
        Ok(src_samples)
    }

    /// Deletes the weight texture; the next draw creates a new one
    pub fn release(&mut self, gpu: &mut dyn GpuContext) {
        if let Some(texture) = self.weight_texture.take() {
            gpu.delete_texture(texture);
        }
        self.uploaded = None;
    }
}

impl Drop for SinglePass {
    fn drop(&mut self) {
        if let Some(texture) = self.weight_texture {
            tracing::warn!(?texture, direction = ?self.direction, "resample pass dropped without releasing its weight texture");
        }
    }
}

impl Effect for SinglePass {
    fn set_int(&mut self, key: &str, value: i32) -> bool {
        match key.parse::<PassParameter>() {
            Ok(PassParameter::Direction) => match Direction::try_from(value) {
                Ok(direction) => {
                    self.set_direction(direction);
                    true
                }
                Err(_) => false,
            },
            Ok(parameter) => size_from_int(value).is_some_and(|value| self.set_dimension(parameter, value)),
            Err(_) => false,
        }
    }

    fn set_float(&mut self, key: &str, value: f32) -> bool {
        match key.parse::<PassParameter>() {
            Ok(PassParameter::Direction) | Err(_) => false,
            Ok(parameter) => size_from_float(value).is_some_and(|value| self.set_dimension(parameter, value)),
        }
    }

    fn output_fragment_shader(&self) -> String {
        SinglePass::output_fragment_shader(self)
    }

    fn set_gl_state(&mut self, gpu: &mut dyn GpuContext, program: ProgramHandle, prefix: &str, sampler_slot: &mut u32) -> Result<(), GpuError> {
        SinglePass::set_gl_state(self, gpu, program, prefix, sampler_slot)
    }
}
