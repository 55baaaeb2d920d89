//! Minimal host graph for resamplers
//!
//! [`EffectChain`] owns a set of nodes and edges, rewrites every resampler into
//! its two passes, forwards image sizes along the edges in topological order and
//! issues the per-pass GPU state in that same order. It implements
//! [`EffectGraph`], so it is also a reference for hosts that bring their own graph.

use crate::{
    effect::{Effect, EffectGraph, PassHandle, ResamplerId},
    error::ChainError,
    gpu::{GpuContext, ProgramHandle},
    parameters::Extent,
    resampler::Resampler,
};
use std::collections::{HashMap, VecDeque};

/// Index of a node in an [`EffectChain`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node does when the chain runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEffect {
    /// Source image of the given size
    Input(Extent),
    /// A resampler owned by the chain, before it is rewritten
    Resampler(ResamplerId),
    /// One pass of a resampler
    Pass(PassHandle),
    /// Final output; takes the size of its input
    Output,
}

#[derive(Debug)]
struct Node {
    effect: NodeEffect,
    disabled: bool,
    /// Size of the image this node produces, once known
    output_size: Option<Extent>,
}

/// State published for one pass during [`EffectChain::draw`]
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// The pass node that was prepared
    pub node: NodeId,
    /// Program the uniforms were written to
    pub program: ProgramHandle,
    /// Uniform name prefix of the pass
    pub prefix: String,
    /// Fragment shader of the pass
    pub shader: String,
}

/// A directed acyclic graph of image effects
#[derive(Debug, Default)]
pub struct EffectChain {
    nodes: Vec<Node>,
    edges: Vec<(NodeId, NodeId)>,
    resamplers: HashMap<ResamplerId, Resampler>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_node(&mut self, effect: NodeEffect) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            effect,
            disabled: false,
            output_size: None,
        });
        id
    }

    /// Adds a source image of the given size
    pub fn add_input(&mut self, size: Extent) -> NodeId {
        self.push_node(NodeEffect::Input(size))
    }

    /// Adds a sink node
    pub fn add_output(&mut self) -> NodeId {
        self.push_node(NodeEffect::Output)
    }

    /// Adds a resampler; the chain takes ownership of it
    pub fn add_resampler(&mut self, resampler: Resampler) -> NodeId {
        let id = resampler.id();
        self.resamplers.insert(id, resampler);
        self.push_node(NodeEffect::Resampler(id))
    }

    /// # Panics
    /// Panics if `node` was not created by this chain.
    pub fn node_effect(&self, node: NodeId) -> NodeEffect {
        self.node(node).effect
    }

    /// # Panics
    /// Panics if `node` was not created by this chain.
    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.node(node).disabled
    }

    /// Size of the image `node` produces, known after [`finalize`](Self::finalize)
    ///
    /// # Panics
    /// Panics if `node` was not created by this chain.
    pub fn output_size(&self, node: NodeId) -> Option<Extent> {
        self.node(node).output_size
    }

    fn node(&self, node: NodeId) -> &Node {
        self.nodes.get(node.0).unwrap_or_else(|| panic!("node {node:?} does not belong to this chain"))
    }

    /// All edges as `(from, to)` pairs, in insertion order
    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    /// Nodes with an edge into `node`
    pub fn inputs(&self, node: NodeId) -> Vec<NodeId> {
        self.edges.iter().filter(|(_, to)| *to == node).map(|(from, _)| *from).collect()
    }

    /// Nodes with an edge from `node`
    pub fn outputs(&self, node: NodeId) -> Vec<NodeId> {
        self.edges.iter().filter(|(from, _)| *from == node).map(|(_, to)| *to).collect()
    }

    pub fn resampler(&self, id: ResamplerId) -> Option<&Resampler> {
        self.resamplers.get(&id)
    }

    pub fn resampler_mut(&mut self, id: ResamplerId) -> Option<&mut Resampler> {
        self.resamplers.get_mut(&id)
    }

    /// Rewrites every resampler into its passes and propagates image sizes
    ///
    /// May be called again after sizes change; already rewritten resamplers are
    /// disabled and skipped.
    pub fn finalize(&mut self) -> Result<(), ChainError> {
        let pending: Vec<(NodeId, ResamplerId)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !node.disabled)
            .filter_map(|(index, node)| match node.effect {
                NodeEffect::Resampler(id) => Some((NodeId(index), id)),
                _ => None,
            })
            .collect();

        for (node, id) in pending {
            // Take the resampler out while it edits the graph it lives in
            let resampler = self.resamplers.remove(&id).ok_or(ChainError::UnknownResampler(id))?;
            resampler.rewrite_graph(self, node);
            self.resamplers.insert(id, resampler);
        }

        self.propagate_sizes()
    }

    /// Forwards each node's output size to its successors
    fn propagate_sizes(&mut self) -> Result<(), ChainError> {
        for node in self.topological_order()? {
            let input_size = self.inputs(node).first().and_then(|&input| self.nodes[input.0].output_size);

            let output_size = match self.nodes[node.0].effect {
                NodeEffect::Input(size) => size,
                NodeEffect::Output => input_size.ok_or(ChainError::MissingInput(node))?,
                // Replaced by its passes and disabled before sizes are propagated
                NodeEffect::Resampler(_) => continue,
                NodeEffect::Pass(handle) => {
                    let input = input_size.ok_or(ChainError::MissingInput(node))?;
                    let resampler = self.resamplers.get_mut(&handle.resampler).ok_or(ChainError::UnknownResampler(handle.resampler))?;
                    resampler.pass_effect(handle.direction).inform_input_size(0, input.width, input.height);
                    resampler.pass(handle.direction).size().output
                }
            };

            self.nodes[node.0].output_size = Some(output_size);
        }

        Ok(())
    }

    /// Enabled nodes ordered so that every node follows its inputs
    fn topological_order(&self) -> Result<Vec<NodeId>, ChainError> {
        let enabled = |node: NodeId| !self.nodes[node.0].disabled;
        let edges: Vec<(NodeId, NodeId)> = self.edges.iter().copied().filter(|&(from, to)| enabled(from) && enabled(to)).collect();

        let mut in_degree = vec![0usize; self.nodes.len()];
        for &(_, to) in &edges {
            in_degree[to.0] += 1;
        }

        let mut queue: VecDeque<NodeId> = (0..self.nodes.len()).map(NodeId).filter(|&node| enabled(node) && in_degree[node.0] == 0).collect();
        let mut order = Vec::new();

        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &(from, to) in &edges {
                if from == node {
                    in_degree[to.0] -= 1;
                    if in_degree[to.0] == 0 {
                        queue.push_back(to);
                    }
                }
            }
        }

        let enabled_count = (0..self.nodes.len()).filter(|&index| enabled(NodeId(index))).count();
        if order.len() != enabled_count {
            return Err(ChainError::Cycle);
        }
        Ok(order)
    }

    /// Publishes GPU state for every pass, in execution order
    ///
    /// Each pass is its own phase: its program handle is its node index, its
    /// uniform prefix is `eff<node index>`, and its texture units start at 1
    /// because unit 0 holds the input image.
    ///
    /// # Arguments
    /// * `gpu` - The GPU context to issue calls on
    ///
    /// # Returns
    /// One [`DrawCall`] per pass, in the order the passes must be drawn
    pub fn draw(&mut self, gpu: &mut dyn GpuContext) -> Result<Vec<DrawCall>, ChainError> {
        let mut draw_calls = Vec::new();

        for node in self.topological_order()? {
            let NodeEffect::Pass(handle) = self.nodes[node.0].effect else {
                continue;
            };

            let resampler = self.resamplers.get_mut(&handle.resampler).ok_or(ChainError::UnknownResampler(handle.resampler))?;
            let mut effect = resampler.pass_effect(handle.direction);

            let program = ProgramHandle(node.0 as u32);
            let prefix = format!("eff{}", node.0);
            let mut sampler_slot = 1;
            effect.set_gl_state(gpu, program, &prefix, &mut sampler_slot)?;

            draw_calls.push(DrawCall {
                node,
                program,
                prefix,
                shader: effect.output_fragment_shader(),
            });
        }

        Ok(draw_calls)
    }

    /// Releases the GPU resources of every resampler
    pub fn release(&mut self, gpu: &mut dyn GpuContext) {
        for resampler in self.resamplers.values_mut() {
            resampler.release(gpu);
        }
    }
}

impl EffectGraph for EffectChain {
    type Node = NodeId;

    fn add_node(&mut self, effect: PassHandle) -> NodeId {
        self.push_node(NodeEffect::Pass(effect))
    }

    fn connect_nodes(&mut self, from: NodeId, to: NodeId) {
        self.edges.push((from, to));
    }

    fn replace_receiver(&mut self, old: NodeId, new: NodeId) {
        for (_, to) in self.edges.iter_mut().filter(|(_, to)| *to == old) {
            *to = new;
        }
    }

    fn replace_sender(&mut self, old: NodeId, new: NodeId) {
        for (from, _) in self.edges.iter_mut().filter(|(from, _)| *from == old) {
            *from = new;
        }
    }

    /// # Panics
    /// Panics if `node` was not created by this chain.
    fn set_disabled(&mut self, node: NodeId, disabled: bool) {
        let Some(entry) = self.nodes.get_mut(node.0) else {
            panic!("node {node:?} does not belong to this chain");
        };
        entry.disabled = disabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gpu::RecordingContext, parameters::Direction};

    /// Builds `input → resampler → output` and returns the node ids
    fn single_resampler_chain(input: Extent, output: Extent) -> (EffectChain, NodeId, NodeId, NodeId) {
        let mut chain = EffectChain::new();
        let mut resampler = Resampler::new();
        resampler.set_output_size(output);

        let input_node = chain.add_input(input);
        let resampler_node = chain.add_resampler(resampler);
        let output_node = chain.add_output();
        chain.connect_nodes(input_node, resampler_node);
        chain.connect_nodes(resampler_node, output_node);
        (chain, input_node, resampler_node, output_node)
    }

    fn pass_nodes(chain: &EffectChain, id: ResamplerId) -> (NodeId, NodeId) {
        let find = |direction| {
            (0..chain.nodes.len())
                .map(NodeId)
                .find(|&node| chain.node_effect(node) == NodeEffect::Pass(PassHandle { resampler: id, direction }))
                .unwrap()
        };
        (find(Direction::Horizontal), find(Direction::Vertical))
    }

    #[test]
    fn test_rewrite_replaces_resampler_with_two_passes() {
        let (mut chain, input, resampler_node, output) = single_resampler_chain(Extent::new(1920, 1080), Extent::new(960, 540));
        let NodeEffect::Resampler(id) = chain.node_effect(resampler_node) else {
            panic!("expected a resampler node");
        };

        chain.finalize().unwrap();
        let (hpass, vpass) = pass_nodes(&chain, id);

        assert!(chain.is_disabled(resampler_node));
        assert!(chain.inputs(resampler_node).is_empty());
        assert!(chain.outputs(resampler_node).is_empty());
        assert_eq!(chain.inputs(hpass), vec![input]);
        assert_eq!(chain.outputs(hpass), vec![vpass]);
        assert_eq!(chain.outputs(vpass), vec![output]);
        assert_eq!(chain.edges().len(), 3);
    }

    #[test]
    fn test_finalize_propagates_sizes() {
        let (mut chain, _, resampler_node, output) = single_resampler_chain(Extent::new(1920, 1080), Extent::new(960, 540));
        let NodeEffect::Resampler(id) = chain.node_effect(resampler_node) else {
            panic!("expected a resampler node");
        };

        chain.finalize().unwrap();
        let (hpass, _) = pass_nodes(&chain, id);

        let resampler = chain.resampler(id).unwrap();
        assert_eq!(resampler.input_size(), Extent::new(1920, 1080));
        // The rewritten resampler node itself never produces an image
        assert_eq!(chain.output_size(resampler_node), None);
        assert_eq!(chain.output_size(hpass), Some(Extent::new(960, 1080)));
        assert_eq!(chain.output_size(output), Some(Extent::new(960, 540)));
    }

    #[test]
    fn test_draw_runs_horizontal_before_vertical() {
        let (mut chain, _, resampler_node, _) = single_resampler_chain(Extent::new(1920, 1080), Extent::new(960, 540));
        let NodeEffect::Resampler(id) = chain.node_effect(resampler_node) else {
            panic!("expected a resampler node");
        };
        chain.finalize().unwrap();
        let (hpass, vpass) = pass_nodes(&chain, id);

        let mut gpu = RecordingContext::new();
        let draw_calls = chain.draw(&mut gpu).unwrap();
        assert_eq!(draw_calls.iter().map(|call| call.node).collect::<Vec<_>>(), vec![hpass, vpass]);
        assert!(draw_calls[0].shader.starts_with("#define DIRECTION_VERTICAL 0"));
        assert!(draw_calls[1].shader.starts_with("#define DIRECTION_VERTICAL 1"));
        assert_eq!(draw_calls[0].prefix, format!("eff{}", hpass.index()));
        assert_eq!(gpu.upload_count(), 2);

        // Nothing changed, so the second frame reuses both weight textures
        chain.draw(&mut gpu).unwrap();
        assert_eq!(gpu.upload_count(), 2);

        chain.release(&mut gpu);
        assert_eq!(gpu.live_texture_count(), 0);
    }

    #[test]
    fn test_chained_resamplers() {
        let mut chain = EffectChain::new();
        let mut first = Resampler::new();
        first.set_output_size(Extent::new(50, 50));
        let mut second = Resampler::new();
        second.set_output_size(Extent::new(200, 100));
        let second_id = second.id();

        let input = chain.add_input(Extent::new(100, 100));
        let first_node = chain.add_resampler(first);
        let second_node = chain.add_resampler(second);
        let output = chain.add_output();
        chain.connect_nodes(input, first_node);
        chain.connect_nodes(first_node, second_node);
        chain.connect_nodes(second_node, output);

        chain.finalize().unwrap();
        assert_eq!(chain.resampler(second_id).unwrap().input_size(), Extent::new(50, 50));
        assert_eq!(chain.output_size(output), Some(Extent::new(200, 100)));

        let mut gpu = RecordingContext::new();
        assert_eq!(chain.draw(&mut gpu).unwrap().len(), 4);
        chain.release(&mut gpu);
    }

    #[test]
    fn test_input_size_change_triggers_single_rebuild() {
        let (mut chain, input, resampler_node, _) = single_resampler_chain(Extent::new(640, 480), Extent::new(320, 240));
        chain.finalize().unwrap();
        let mut gpu = RecordingContext::new();
        chain.draw(&mut gpu).unwrap();
        assert_eq!(gpu.upload_count(), 2);

        // Only the horizontal pass depends on the input width
        chain.nodes[input.0].effect = NodeEffect::Input(Extent::new(1280, 480));
        chain.finalize().unwrap();
        chain.draw(&mut gpu).unwrap();
        assert_eq!(gpu.upload_count(), 3);
        assert!(chain.is_disabled(resampler_node));

        chain.release(&mut gpu);
    }

    #[test]
    #[should_panic(expected = "does not belong to this chain")]
    fn test_node_from_another_chain_panics() {
        let mut other = EffectChain::new();
        other.add_input(Extent::new(8, 8));
        let foreign = other.add_output();

        let chain = EffectChain::new();
        chain.node_effect(foreign);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut chain = EffectChain::new();
        let a = chain.add_output();
        let b = chain.add_output();
        chain.connect_nodes(a, b);
        chain.connect_nodes(b, a);
        assert!(matches!(chain.finalize(), Err(ChainError::Cycle)));
    }

    #[test]
    fn test_resampler_without_input_is_rejected() {
        let mut chain = EffectChain::new();
        let resampler_node = chain.add_resampler(Resampler::new());
        let output = chain.add_output();
        chain.connect_nodes(resampler_node, output);

        let NodeEffect::Resampler(id) = chain.node_effect(resampler_node) else {
            panic!("expected a resampler node");
        };
        let result = chain.finalize();
        let (hpass, _) = pass_nodes(&chain, id);
        assert!(matches!(result, Err(ChainError::MissingInput(node)) if node == hpass));
    }
}
