//! Flow Scheduler
//!
//! The scheduler drives repeated propagation passes over the graph until one
//! of the boundary inputs runs dry.
//!
//! # Algorithm
//!
//! Each pass:
//!
//! 1. Re-examine every live node so idle nodes decay and may be pruned
//! 2. Seed a FIFO queue with the boundary node ids
//! 3. Pop an id, resolve it, and advance it with the id of the predecessor
//!    that queued it (`None` for seeded entries)
//! 4. On `Propagate`, queue the successors; otherwise report a leaf
//! 5. Repeat until the queue is empty
//!
//! An id equal to the entry at the back of the queue is not queued again,
//! but the same id may still appear later in the pass. A node reached from
//! two different predecessors is visited once per predecessor, and each
//! visit updates its running mean.
//!
//! Ids whose node was deleted after they were queued are skipped.
//!
//! # Termination
//!
//! [`FlowScheduler::run_flow`] returns once any boundary node has stopped.
//! There is no pass limit: if the inputs never run dry it never returns.
//! Use [`FlowScheduler::run_passes`] for bounded stepping.

use std::collections::VecDeque;

use tracing::{debug, info, trace};

use super::node::{FlowPassId, NodeId, PropagationResult};
use super::observer::{FlowObserver, NoopObserver};
use super::store::Graph;
use crate::events::GraphEventKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    node: NodeId,
    from: Option<NodeId>,
}

/// Runs flow passes over a graph it owns.
#[derive(Debug)]
pub struct FlowScheduler<O = NoopObserver> {
    graph: Graph,
    queue: VecDeque<QueueEntry>,
    current_pass: FlowPassId,
    observer: O,
}

impl FlowScheduler<NoopObserver> {
    /// Create a scheduler starting at pass 0.
    pub fn new(graph: Graph) -> Self {
        Self::with_observer(graph, NoopObserver)
    }
}

impl<O: FlowObserver> FlowScheduler<O> {
    pub fn with_observer(graph: Graph, observer: O) -> Self {
        Self {
            graph,
            queue: VecDeque::new(),
            current_pass: FlowPassId::default(),
            observer,
        }
    }

    /// Run passes until the flow is completed. Returns the number of passes
    /// run by this call.
    pub fn run_flow(&mut self) -> u64 {
        let mut passes = 0;
        while !self.is_flow_completed() {
            self.run_single_pass();
            self.current_pass = self.current_pass.next();
            passes += 1;
        }
        info!(passes, final_pass = %self.current_pass, nodes = self.graph.node_count(), "flow completed");
        passes
    }

    /// Run at most `max_passes` passes. Returns whether the flow completed.
    pub fn run_passes(&mut self, max_passes: u64) -> bool {
        for _ in 0..max_passes {
            if self.is_flow_completed() {
                return true;
            }
            self.run_single_pass();
            self.current_pass = self.current_pass.next();
        }
        self.is_flow_completed()
    }

    /// Whether any boundary node has run out of input.
    pub fn is_flow_completed(&self) -> bool {
        self.graph
            .input_node_ids()
            .iter()
            .any(|&id| self.graph.get_node(id).is_some_and(|node| node.has_stopped()))
    }

    /// Run one pass with the current pass id. Does not advance the counter.
    pub fn run_single_pass(&mut self) {
        let pass = self.current_pass;
        self.graph.set_clock(pass);
        self.graph.emit(GraphEventKind::PassStarted);
        self.observer.on_pass_started(&self.graph, pass);

        self.reexamine_all(pass);
        self.fill_started_nodes();

        let mut visits = 0usize;
        while let Some(entry) = self.queue.pop_front() {
            let Some(result) = self.graph.advance_node(entry.node, pass, entry.from) else {
                trace!(node = %entry.node, "skipping queued id with no live node");
                continue;
            };
            visits += 1;
            self.observer.on_visit(&self.graph, entry.node, pass);

            match result {
                PropagationResult::Propagate(successors) if !successors.is_empty() => {
                    for next in successors {
                        self.enqueue(next, Some(entry.node));
                    }
                }
                _ => self.process_leaf(entry.node, pass),
            }
        }

        debug!(%pass, visits, nodes = self.graph.node_count(), "flow pass finished");
        self.observer.on_pass_finished(&self.graph, pass);
    }

    fn reexamine_all(&mut self, pass: FlowPassId) {
        for id in self.graph.node_ids() {
            if !self.graph.reexamine_node(id, pass) {
                trace!(node = %id, %pass, "node did not survive re-examination");
            }
        }
    }

    fn fill_started_nodes(&mut self) {
        let inputs: Vec<NodeId> = self.graph.input_node_ids().iter().copied().collect();
        for id in inputs {
            self.enqueue(id, None);
        }
    }

    fn enqueue(&mut self, node: NodeId, from: Option<NodeId>) {
        if self.queue.back().map(|entry| entry.node) != Some(node) {
            self.queue.push_back(QueueEntry { node, from });
        }
    }

    fn process_leaf(&mut self, node: NodeId, pass: FlowPassId) {
        self.observer.on_leaf(&self.graph, node, pass);
    }

    /// The pass id the next call to [`FlowScheduler::run_single_pass`] uses.
    pub fn current_pass(&self) -> FlowPassId {
        self.current_pass
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}
