//! Two-pass separable Lanczos resampler
//!
//! [`Resampler`] is the node users put in a graph. It never draws itself: when
//! the graph is finalized it replaces itself with a horizontal pass followed by
//! a vertical pass, and keeps both passes' dimensions consistent with its own
//! input and output size.

use crate::{
    effect::{Effect, EffectGraph, PassHandle, ResamplerId},
    error::GpuError,
    gpu::{GpuContext, ProgramHandle},
    parameters::{Direction, Extent, ResamplerParameter, size_from_float, size_from_int},
    single_pass::{PassSize, SinglePass},
};

/// Resizes an image with a three-lobed Lanczos kernel in two 1D passes
#[derive(Debug)]
pub struct Resampler {
    id: ResamplerId,
    /// Size of the upstream image, learned from the horizontal pass
    input: Extent,
    /// Requested output size
    output: Extent,
    hpass: SinglePass,
    vpass: SinglePass,
}

impl Resampler {
    /// Creates a resampler with a 1280x720 input and output
    pub fn new() -> Self {
        let mut resampler = Self {
            id: ResamplerId::next(),
            input: Extent::default(),
            output: Extent::default(),
            // The horizontal pass sees the upstream size first and hands it to us
            hpass: SinglePass::forwarding_input_size(Direction::Horizontal),
            vpass: SinglePass::new(Direction::Vertical),
        };
        resampler.update_size();
        resampler
    }

    pub fn id(&self) -> ResamplerId {
        self.id
    }

    pub fn input_size(&self) -> Extent {
        self.input
    }

    pub fn output_size(&self) -> Extent {
        self.output
    }

    /// Sets the output size and updates both passes
    pub fn set_output_size(&mut self, output: Extent) {
        self.output = output;
        self.update_size();
    }

    /// Sets the output width or height and updates both passes
    pub fn set_parameter(&mut self, parameter: ResamplerParameter, value: u32) {
        match parameter {
            ResamplerParameter::Width => self.output.width = value,
            ResamplerParameter::Height => self.output.height = value,
        }
        self.update_size();
    }

    /// String-keyed setter for `width` and `height`
    ///
    /// # Returns
    /// `false` if the key is unknown or the value is not a positive size
    pub fn set_int(&mut self, key: &str, value: i32) -> bool {
        match (key.parse::<ResamplerParameter>(), size_from_int(value)) {
            (Ok(parameter), Some(value)) => {
                self.set_parameter(parameter, value);
                true
            }
            _ => false,
        }
    }

    /// String-keyed setter for `width` and `height`; fractions are truncated
    ///
    /// # Returns
    /// `false` if the key is unknown or the value is not a positive size
    pub fn set_float(&mut self, key: &str, value: f32) -> bool {
        match (key.parse::<ResamplerParameter>(), size_from_float(value)) {
            (Ok(parameter), Some(value)) => {
                self.set_parameter(parameter, value);
                true
            }
            _ => false,
        }
    }

    /// Records the upstream image size and updates both passes
    ///
    /// # Panics
    /// Panics if `input_index` is not 0 or either dimension is zero.
    pub fn inform_input_size(&mut self, input_index: u32, width: u32, height: u32) {
        assert_eq!(input_index, 0, "resampler has a single input");
        assert!(width != 0, "input width must be non-zero");
        assert!(height != 0, "input height must be non-zero");

        self.input = Extent::new(width, height);
        self.update_size();
    }

    /// Replaces `self_node` in `graph` with the chain `horizontal → vertical`
    ///
    /// Edges that ended at `self_node` now end at the horizontal pass, edges
    /// that started there now start at the vertical pass, and `self_node` is
    /// disabled.
    pub fn rewrite_graph<G: EffectGraph>(&self, graph: &mut G, self_node: G::Node) {
        let hpass_node = graph.add_node(self.pass_handle(Direction::Horizontal));
        let vpass_node = graph.add_node(self.pass_handle(Direction::Vertical));
        graph.connect_nodes(hpass_node, vpass_node);
        graph.replace_receiver(self_node, hpass_node);
        graph.replace_sender(self_node, vpass_node);
        graph.set_disabled(self_node, true);

        tracing::trace!(resampler = ?self.id, ?self_node, ?hpass_node, ?vpass_node, "rewrote resampler into two passes");
    }

    /// Handle identifying one of this resampler's passes in a graph
    pub fn pass_handle(&self, direction: Direction) -> PassHandle {
        PassHandle { resampler: self.id, direction }
    }

    pub fn pass(&self, direction: Direction) -> &SinglePass {
        match direction {
            Direction::Horizontal => &self.hpass,
            Direction::Vertical => &self.vpass,
        }
    }

    fn pass_mut(&mut self, direction: Direction) -> &mut SinglePass {
        match direction {
            Direction::Horizontal => &mut self.hpass,
            Direction::Vertical => &mut self.vpass,
        }
    }

    /// The [`Effect`] a graph node created by [`rewrite_graph`](Self::rewrite_graph) runs
    pub fn pass_effect(&mut self, direction: Direction) -> PassEffect<'_> {
        PassEffect { resampler: self, direction }
    }

    /// Releases both passes' weight textures
    pub fn release(&mut self, gpu: &mut dyn GpuContext) {
        self.hpass.release(gpu);
        self.vpass.release(gpu);
    }

    /// Propagates the input and output size to both passes
    fn update_size(&mut self) {
        // The horizontal pass never resizes vertically
        self.hpass.set_size(PassSize::horizontal(self.input, self.output.width));
        self.vpass.set_size(PassSize::vertical(Extent::new(self.output.width, self.input.height), self.output.height));

        tracing::debug!(resampler = ?self.id, input = %self.input, output = %self.output, "updated resampler size");
    }
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new()
    }
}

/// One of a resampler's passes, borrowed as a graph effect
///
/// Input size notifications reaching the horizontal pass are forwarded to the
/// resampler, which then resizes both passes.
#[derive(Debug)]
pub struct PassEffect<'a> {
    resampler: &'a mut Resampler,
    direction: Direction,
}

impl PassEffect<'_> {
    pub fn pass(&self) -> &SinglePass {
        self.resampler.pass(self.direction)
    }
}

impl Effect for PassEffect<'_> {
    fn set_int(&mut self, key: &str, value: i32) -> bool {
        self.resampler.pass_mut(self.direction).set_int(key, value)
    }

    fn set_float(&mut self, key: &str, value: f32) -> bool {
        self.resampler.pass_mut(self.direction).set_float(key, value)
    }

    fn inform_input_size(&mut self, input_index: u32, width: u32, height: u32) {
        if self.pass().forwards_input_size() {
            self.resampler.inform_input_size(input_index, width, height);
        }
    }

    fn output_fragment_shader(&self) -> String {
        self.pass().output_fragment_shader()
    }

    fn set_gl_state(&mut self, gpu: &mut dyn GpuContext, program: ProgramHandle, prefix: &str, sampler_slot: &mut u32) -> Result<(), GpuError> {
        self.resampler.pass_mut(self.direction).set_gl_state(gpu, program, prefix, sampler_slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::RecordingContext;

    /// Checks the size relations between the resampler and its passes
    fn assert_size_invariants(resampler: &Resampler) {
        let input = resampler.input_size();
        let output = resampler.output_size();
        let hpass = resampler.pass(Direction::Horizontal).size();
        let vpass = resampler.pass(Direction::Vertical).size();

        assert_eq!(hpass.input, input);
        assert_eq!(hpass.output, Extent::new(output.width, input.height));
        assert_eq!(vpass.input, Extent::new(output.width, input.height));
        assert_eq!(vpass.output, output);
    }

    #[test]
    fn test_default_sizes() {
        let resampler = Resampler::new();
        assert_eq!(resampler.input_size(), Extent::new(1280, 720));
        assert_eq!(resampler.output_size(), Extent::new(1280, 720));
        assert_size_invariants(&resampler);
        assert_eq!(resampler.pass(Direction::Horizontal).direction(), Direction::Horizontal);
        assert_eq!(resampler.pass(Direction::Vertical).direction(), Direction::Vertical);
    }

    #[test]
    fn test_setters_propagate_sizes() {
        let mut resampler = Resampler::new();
        assert!(resampler.set_float("width", 640.0));
        assert_size_invariants(&resampler);
        assert!(resampler.set_int("height", 360));
        assert_size_invariants(&resampler);

        assert_eq!(resampler.output_size(), Extent::new(640, 360));
        assert_eq!(resampler.pass(Direction::Horizontal).size().output, Extent::new(640, 720));
        assert_eq!(resampler.pass(Direction::Vertical).size().output, Extent::new(640, 360));
    }

    #[test]
    fn test_unknown_keys_and_invalid_values_are_rejected() {
        let mut resampler = Resampler::new();
        assert!(!resampler.set_int("input_width", 100));
        assert!(!resampler.set_float("depth", 3.0));
        assert!(!resampler.set_int("width", 0));
        assert!(!resampler.set_float("height", -1.0));
        assert_eq!(resampler.output_size(), Extent::new(1280, 720));
    }

    #[test]
    fn test_horizontal_pass_keeps_input_height() {
        let mut resampler = Resampler::new();
        resampler.inform_input_size(0, 1920, 1080);
        resampler.set_output_size(Extent::new(960, 200));

        let hpass = resampler.pass(Direction::Horizontal).size();
        assert_eq!(hpass.output.height, 1080);
        assert_eq!(hpass.input.height, hpass.output.height);
    }

    #[test]
    fn test_size_invariants_hold_over_mixed_updates() {
        let mut resampler = Resampler::new();
        let steps: [(&str, u32, u32); 8] = [
            ("input", 1920, 1080),
            ("width", 640, 0),
            ("input", 320, 240),
            ("height", 1000, 0),
            ("width", 1, 0),
            ("input", 7, 3),
            ("height", 1, 0),
            ("input", 4096, 2160),
        ];
        for (step, a, b) in steps {
            match step {
                "input" => resampler.inform_input_size(0, a, b),
                key => assert!(resampler.set_float(key, a as f32)),
            }
            assert_size_invariants(&resampler);
        }
        assert_eq!(resampler.input_size(), Extent::new(4096, 2160));
        assert_eq!(resampler.output_size(), Extent::new(1, 1));
    }

    #[test]
    #[should_panic(expected = "single input")]
    fn test_inform_input_size_rejects_second_input() {
        Resampler::new().inform_input_size(1, 640, 480);
    }

    #[test]
    #[should_panic(expected = "input width must be non-zero")]
    fn test_inform_input_size_rejects_zero_width() {
        Resampler::new().inform_input_size(0, 0, 480);
    }

    #[test]
    #[should_panic(expected = "input height must be non-zero")]
    fn test_inform_input_size_rejects_zero_height() {
        Resampler::new().inform_input_size(0, 640, 0);
    }

    #[test]
    fn test_horizontal_pass_forwards_input_size() {
        let mut resampler = Resampler::new();
        resampler.pass_effect(Direction::Horizontal).inform_input_size(0, 800, 600);
        assert_eq!(resampler.input_size(), Extent::new(800, 600));
        assert_size_invariants(&resampler);

        // The vertical pass learns its size from the resampler only
        resampler.pass_effect(Direction::Vertical).inform_input_size(0, 10, 10);
        assert_eq!(resampler.input_size(), Extent::new(800, 600));
    }

    #[test]
    fn test_pass_effects_draw_and_release() {
        let mut gpu = RecordingContext::new();
        let mut resampler = Resampler::new();
        resampler.inform_input_size(0, 200, 100);
        resampler.set_output_size(Extent::new(100, 400));

        let mut slot = 1;
        for direction in [Direction::Horizontal, Direction::Vertical] {
            let mut effect = resampler.pass_effect(direction);
            effect.set_gl_state(&mut gpu, ProgramHandle(0), "resample", &mut slot).unwrap();
        }
        assert_eq!(slot, 3);
        assert_eq!(gpu.upload_count(), 2);
        assert_eq!(resampler.pass(Direction::Horizontal).src_samples(), Some(13));
        assert_eq!(resampler.pass(Direction::Vertical).src_samples(), Some(7));
        assert_eq!(gpu.live_texture_count(), 2);

        resampler.release(&mut gpu);
        assert_eq!(gpu.live_texture_count(), 0);
    }

    #[test]
    fn test_each_resampler_has_its_own_id() {
        let a = Resampler::new();
        let b = Resampler::new();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.pass_handle(Direction::Vertical).resampler, a.id());
    }
}
