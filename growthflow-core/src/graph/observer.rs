//! Flow observers: extension hooks the scheduler calls while it runs.

use super::node::{FlowPassId, NodeId};
use super::store::Graph;

/// Callbacks invoked by [`FlowScheduler`](super::FlowScheduler).
///
/// Every method defaults to doing nothing.
pub trait FlowObserver {
    /// Before the pass is seeded.
    fn on_pass_started(&mut self, _graph: &Graph, _pass: FlowPassId) {}

    /// After a node has been advanced.
    fn on_visit(&mut self, _graph: &Graph, _node: NodeId, _pass: FlowPassId) {}

    /// A visit ended without propagating further.
    fn on_leaf(&mut self, _graph: &Graph, _node: NodeId, _pass: FlowPassId) {}

    /// After the work queue has drained.
    fn on_pass_finished(&mut self, _graph: &Graph, _pass: FlowPassId) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl FlowObserver for NoopObserver {}

/// Counters for a single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    pub pass: FlowPassId,
    pub visits: usize,
    pub leaves: usize,
    /// Nodes in the graph once the pass finished.
    pub nodes_alive: usize,
}

/// Collects [`PassStats`] for every pass.
#[derive(Debug, Clone, Default)]
pub struct FlowStats {
    passes: Vec<PassStats>,
}

impl FlowStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn passes(&self) -> &[PassStats] {
        &self.passes
    }

    pub fn total_visits(&self) -> usize {
        self.passes.iter().map(|p| p.visits).sum()
    }

    pub fn total_leaves(&self) -> usize {
        self.passes.iter().map(|p| p.leaves).sum()
    }

    fn current(&mut self) -> Option<&mut PassStats> {
        self.passes.last_mut()
    }
}

impl FlowObserver for FlowStats {
    fn on_pass_started(&mut self, graph: &Graph, pass: FlowPassId) {
        self.passes.push(PassStats {
            pass,
            visits: 0,
            leaves: 0,
            nodes_alive: graph.node_count(),
        });
    }

    fn on_visit(&mut self, _graph: &Graph, _node: NodeId, _pass: FlowPassId) {
        if let Some(stats) = self.current() {
            stats.visits += 1;
        }
    }

    fn on_leaf(&mut self, _graph: &Graph, _node: NodeId, _pass: FlowPassId) {
        if let Some(stats) = self.current() {
            stats.leaves += 1;
        }
    }

    fn on_pass_finished(&mut self, graph: &Graph, _pass: FlowPassId) {
        if let Some(stats) = self.current() {
            stats.nodes_alive = graph.node_count();
        }
    }
}
