//! Interfaces shared with the host effect graph
//!
//! [`Effect`] is the string-keyed surface the graph drives each node through,
//! and [`EffectGraph`] is the set of graph edits a resampler needs to replace
//! itself with its two passes.

use crate::{
    error::GpuError,
    gpu::{GpuContext, ProgramHandle},
    parameters::Direction,
};
use std::sync::atomic::{AtomicU64, Ordering};

/// A node's behaviour as seen by the host graph
pub trait Effect {
    /// Sets an integer parameter; returns `false` if `key` is not recognised
    /// or the value is out of range
    fn set_int(&mut self, key: &str, value: i32) -> bool;

    /// Sets a float parameter; returns `false` if `key` is not recognised
    /// or the value is out of range
    fn set_float(&mut self, key: &str, value: f32) -> bool;

    /// Called once the size of input `input_index` is known
    fn inform_input_size(&mut self, _input_index: u32, _width: u32, _height: u32) {}

    /// Fragment shader source for this effect
    fn output_fragment_shader(&self) -> String;

    /// Publishes textures and uniforms before this effect is drawn
    ///
    /// # Arguments
    /// * `gpu` - The GPU context to issue calls on
    /// * `program` - The program the uniforms belong to
    /// * `prefix` - Prefix of this effect's uniform names
    /// * `sampler_slot` - Next free texture unit; advanced past the units this effect uses
    fn set_gl_state(&mut self, gpu: &mut dyn GpuContext, program: ProgramHandle, prefix: &str, sampler_slot: &mut u32) -> Result<(), GpuError>;
}

/// Process-unique identity of a [`Resampler`](crate::Resampler)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResamplerId(u64);

impl ResamplerId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Refers to one pass owned by a resampler
///
/// Graph nodes created by [`Resampler::rewrite_graph`](crate::Resampler::rewrite_graph)
/// carry this handle; the host resolves it back to the pass through the owning
/// resampler with [`Resampler::pass_effect`](crate::Resampler::pass_effect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassHandle {
    pub resampler: ResamplerId,
    pub direction: Direction,
}

/// Graph edits consumed by [`Resampler::rewrite_graph`](crate::Resampler::rewrite_graph)
pub trait EffectGraph {
    type Node: Copy + Eq + std::fmt::Debug;

    /// Adds a node that runs the given pass
    fn add_node(&mut self, effect: PassHandle) -> Self::Node;

    /// Adds an edge from `from` to `to`
    fn connect_nodes(&mut self, from: Self::Node, to: Self::Node);

    /// Redirects every edge that targets `old` to target `new`
    fn replace_receiver(&mut self, old: Self::Node, new: Self::Node);

    /// Redirects every edge that originates at `old` to originate at `new`
    fn replace_sender(&mut self, old: Self::Node, new: Self::Node);

    /// Marks `node` as skipped during execution
    fn set_disabled(&mut self, node: Self::Node, disabled: bool);
}
