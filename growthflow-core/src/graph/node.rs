//! Graph Nodes
//!
//! This module defines the identifiers used throughout the graph and the
//! capability trait every node kind implements.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::store::Graph;
use crate::lineage::{GroupId, LineageLedger};

/// Unique identifier for a node in the graph.
///
/// Ids are minted by [`Graph`] and never reused, so an id that outlives its
/// node simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one propagation pass. Passes are numbered from zero.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct FlowPassId(u64);

impl FlowPassId {
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// The pass that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<u64> for FlowPassId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for FlowPassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Successor ids handed back to the scheduler.
pub type Successors = SmallVec<[NodeId; 4]>;

/// Outcome of one node visit.
#[derive(Debug, Clone, PartialEq)]
pub enum PropagationResult {
    /// Continue the flow into these successors.
    Propagate(Successors),
    /// Stop the flow at this node for the rest of the visit.
    Suppress,
}

impl PropagationResult {
    pub fn is_suppress(&self) -> bool {
        matches!(self, PropagationResult::Suppress)
    }
}

/// A node that can take part in a flow.
///
/// The graph stores nodes as `Box<dyn FlowNode>`. During [`FlowNode::advance`]
/// the node is detached from its slot, so it may freely read and mutate the
/// rest of the graph, including deleting itself.
pub trait FlowNode: fmt::Debug + 'static {
    /// The id assigned by the graph, or `None` before insertion.
    fn id(&self) -> Option<NodeId>;

    /// Called once by the graph when the node is inserted.
    fn attach(&mut self, id: NodeId, lineages: &mut LineageLedger);

    /// Lineage this node belongs to, for node kinds that grow.
    fn group(&self) -> Option<GroupId> {
        None
    }

    /// Current activation value.
    fn value(&self) -> f64;

    /// Last pass in which this node computed a value.
    fn last_pass(&self) -> FlowPassId;

    /// Whether the current value passes this node's threshold.
    fn is_active(&self) -> bool;

    /// Whether an external input has run dry. Only boundary nodes stop.
    fn has_stopped(&self) -> bool {
        false
    }

    /// Process one visit in `pass`, arriving from `from` (`None` when the
    /// scheduler seeded this node directly).
    fn advance(
        &mut self,
        graph: &mut Graph,
        pass: FlowPassId,
        from: Option<NodeId>,
    ) -> PropagationResult;

    /// Once-per-pass liveness check. Returns `false` if the node removed
    /// itself from the graph.
    fn reexamine(&mut self, _graph: &mut Graph, _pass: FlowPassId) -> bool {
        true
    }

    /// An unattached copy of this node, if the kind supports copying.
    fn copy_boxed(&self) -> Option<Box<dyn FlowNode>> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
