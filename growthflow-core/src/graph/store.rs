//! Graph Store
//!
//! An arena of nodes addressed by stable integer ids. Each slot owns the
//! node together with its ordered input and output adjacency, so edge
//! bookkeeping stays in one place no matter which node kind is stored.
//!
//! Ids come from a monotonically increasing counter and are never reused.
//! A queued id whose node has since been deleted therefore resolves to
//! nothing instead of to some unrelated newer node.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use tracing::warn;

use super::node::{FlowNode, FlowPassId, NodeId, PropagationResult};
use crate::error::FlowError;
use crate::events::{EventSink, GraphEvent, GraphEventKind};
use crate::lineage::LineageLedger;

struct Slot {
    /// `None` while the node is detached for a visit.
    node: Option<Box<dyn FlowNode>>,
    inputs: IndexSet<NodeId>,
    outputs: IndexSet<NodeId>,
}

impl Slot {
    fn new(node: Box<dyn FlowNode>) -> Self {
        Self {
            node: Some(node),
            inputs: IndexSet::new(),
            outputs: IndexSet::new(),
        }
    }
}

/// Mutable store of nodes and directed edges.
pub struct Graph {
    slots: IndexMap<NodeId, Slot>,
    /// Boundary node ids, in registration order.
    input_ids: IndexSet<NodeId>,
    next_id: u64,
    lineages: LineageLedger,
    sink: Option<Box<dyn EventSink>>,
    /// Pass id used to timestamp events.
    clock: FlowPassId,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            slots: IndexMap::new(),
            input_ids: IndexSet::new(),
            next_id: 0,
            lineages: LineageLedger::new(),
            sink: None,
            clock: FlowPassId::default(),
        }
    }

    /// Add a node to the graph and return its freshly minted id.
    pub fn add_node<N: FlowNode>(&mut self, node: N) -> NodeId {
        self.insert_boxed(Box::new(node))
    }

    /// Add a boundary node. Its id becomes part of [`Graph::input_node_ids`].
    pub fn add_boundary_node<N: FlowNode>(&mut self, node: N) -> NodeId {
        let id = self.add_node(node);
        self.input_ids.insert(id);
        id
    }

    /// Add a node and wire it up in one step.
    ///
    /// Edges naming ids that are not in the graph are skipped.
    pub fn add_node_with_edges<N, I, O>(&mut self, node: N, inputs: I, outputs: O) -> NodeId
    where
        N: FlowNode,
        I: IntoIterator<Item = NodeId>,
        O: IntoIterator<Item = NodeId>,
    {
        let id = self.add_node(node);
        self.wire(id, inputs, outputs);
        id
    }

    fn insert_boxed(&mut self, mut node: Box<dyn FlowNode>) -> NodeId {
        let id = NodeId::from(self.next_id);
        self.next_id += 1;

        node.attach(id, &mut self.lineages);
        let group = node.group();
        self.slots.insert(id, Slot::new(node));
        self.emit(GraphEventKind::NodeAdded { node: id, group });
        id
    }

    fn wire<I, O>(&mut self, id: NodeId, inputs: I, outputs: O)
    where
        I: IntoIterator<Item = NodeId>,
        O: IntoIterator<Item = NodeId>,
    {
        for input in inputs {
            if self.contains(input) {
                self.link(input, id);
            } else {
                warn!(node = %id, missing = %input, "skipping input edge to absent node");
            }
        }
        for output in outputs {
            if self.contains(output) {
                self.link(id, output);
            } else {
                warn!(node = %id, missing = %output, "skipping output edge to absent node");
            }
        }
    }

    /// Mark an existing node as a boundary node.
    pub fn mark_input(&mut self, id: NodeId) -> Result<(), FlowError> {
        if !self.contains(id) {
            return Err(FlowError::NodeNotFound { id });
        }
        self.input_ids.insert(id);
        Ok(())
    }

    /// Remove a node and every edge touching it.
    ///
    /// Deleting an absent id is a no-op and returns `false`.
    pub fn delete_node(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.slots.shift_remove(&id) else {
            return false;
        };

        for input in &slot.inputs {
            if let Some(source) = self.slots.get_mut(input) {
                source.outputs.shift_remove(&id);
            }
            self.emit(GraphEventKind::EdgeRemoved { from: *input, to: id });
        }
        for output in &slot.outputs {
            if let Some(target) = self.slots.get_mut(output) {
                target.inputs.shift_remove(&id);
            }
            self.emit(GraphEventKind::EdgeRemoved { from: id, to: *output });
        }

        self.input_ids.shift_remove(&id);
        self.emit(GraphEventKind::NodeRemoved { node: id });
        true
    }

    /// Copy a node, including all of its input and output edges.
    ///
    /// Returns `None` if the node is absent or its kind cannot be copied.
    pub fn copy_node(&mut self, id: NodeId) -> Option<NodeId> {
        let copy = self.get_node(id)?.copy_boxed()?;
        let inputs: Vec<NodeId> = self.inputs_of(id).collect();
        let outputs: Vec<NodeId> = self.outputs_of(id).collect();

        let copy_id = self.insert_boxed(copy);
        self.wire(copy_id, inputs, outputs);
        Some(copy_id)
    }

    /// Get a reference to a node.
    ///
    /// Returns `None` for deleted ids and for a node that is currently
    /// detached because it is being advanced.
    pub fn get_node(&self, id: NodeId) -> Option<&dyn FlowNode> {
        self.slots.get(&id)?.node.as_deref()
    }

    /// Get a mutable reference to a node.
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut (dyn FlowNode + 'static)> {
        self.slots.get_mut(&id)?.node.as_deref_mut()
    }

    /// Get a node as its concrete type.
    pub fn node_as<T: FlowNode>(&self, id: NodeId) -> Option<&T> {
        self.get_node(id)?.as_any().downcast_ref::<T>()
    }

    pub fn node_as_mut<T: FlowNode>(&mut self, id: NodeId) -> Option<&mut T> {
        self.get_node_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Add a directed edge `from -> to`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<(), FlowError> {
        for id in [from, to] {
            if !self.contains(id) {
                return Err(FlowError::NodeNotFound { id });
            }
        }
        self.link(from, to);
        Ok(())
    }

    fn link(&mut self, from: NodeId, to: NodeId) {
        let added = match self.slots.get_mut(&from) {
            Some(source) => source.outputs.insert(to),
            None => return,
        };
        if let Some(target) = self.slots.get_mut(&to) {
            target.inputs.insert(from);
        }
        if added {
            self.emit(GraphEventKind::EdgeAdded { from, to });
        }
    }

    /// Remove a directed edge. Returns whether it existed.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        let removed = self
            .slots
            .get_mut(&from)
            .map(|source| source.outputs.shift_remove(&to))
            .unwrap_or(false);
        if let Some(target) = self.slots.get_mut(&to) {
            target.inputs.shift_remove(&from);
        }
        if removed {
            self.emit(GraphEventKind::EdgeRemoved { from, to });
        }
        removed
    }

    /// Predecessors of a node, in insertion order.
    pub fn inputs_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .get(&id)
            .into_iter()
            .flat_map(|slot| slot.inputs.iter().copied())
    }

    /// Successors of a node, in insertion order.
    pub fn outputs_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .get(&id)
            .into_iter()
            .flat_map(|slot| slot.outputs.iter().copied())
    }

    /// Boundary node ids.
    pub fn input_node_ids(&self) -> &IndexSet<NodeId> {
        &self.input_ids
    }

    pub fn is_input(&self, id: NodeId) -> bool {
        self.input_ids.contains(&id)
    }

    /// Whether the id refers to a live node (detached nodes count).
    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.slots.len()
    }

    /// Ids of all live nodes, in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.slots.keys().copied().collect()
    }

    pub fn lineages(&self) -> &LineageLedger {
        &self.lineages
    }

    pub fn lineages_mut(&mut self) -> &mut LineageLedger {
        &mut self.lineages
    }

    /// Run one visit of node `id`.
    ///
    /// The node is taken out of its slot while it runs and put back
    /// afterwards, unless it deleted itself. Returns `None` if `id` does
    /// not resolve to a node.
    pub fn advance_node(
        &mut self,
        id: NodeId,
        pass: FlowPassId,
        from: Option<NodeId>,
    ) -> Option<PropagationResult> {
        let mut node = self.slots.get_mut(&id)?.node.take()?;
        let result = node.advance(self, pass, from);
        self.reattach(id, node);
        Some(result)
    }

    /// Run the once-per-pass liveness check of node `id`.
    ///
    /// Returns `false` if the node is absent or removed itself.
    pub fn reexamine_node(&mut self, id: NodeId, pass: FlowPassId) -> bool {
        let Some(mut node) = self.slots.get_mut(&id).and_then(|slot| slot.node.take()) else {
            return false;
        };
        let alive = node.reexamine(self, pass);
        let present = self.reattach(id, node);
        alive && present
    }

    fn reattach(&mut self, id: NodeId, node: Box<dyn FlowNode>) -> bool {
        match self.slots.get_mut(&id) {
            Some(slot) => {
                slot.node = Some(node);
                true
            }
            None => false,
        }
    }

    /// Install a receiver for graph events, replacing any previous one.
    pub fn set_event_sink<S: EventSink + 'static>(&mut self, sink: S) {
        self.sink = Some(Box::new(sink));
    }

    pub fn clear_event_sink(&mut self) {
        self.sink = None;
    }

    /// Report a change to the event sink, if one is installed.
    pub fn emit(&mut self, kind: GraphEventKind) {
        if let Some(sink) = self.sink.as_mut() {
            sink.emit(&GraphEvent {
                time: self.clock,
                kind,
            });
        }
    }

    pub fn clock(&self) -> FlowPassId {
        self.clock
    }

    /// Set the pass id used to timestamp subsequent events.
    pub fn set_clock(&mut self, pass: FlowPassId) {
        self.clock = pass;
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.slots.len())
            .field("input_ids", &self.input_ids)
            .field("next_id", &self.next_id)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::graph::node::Successors;
    use std::any::Any;

    /// Minimal node that forwards to all of its outputs.
    #[derive(Debug, Default, Clone)]
    struct Relay {
        id: Option<NodeId>,
        value: f64,
        last_pass: FlowPassId,
    }

    impl FlowNode for Relay {
        fn id(&self) -> Option<NodeId> {
            self.id
        }

        fn attach(&mut self, id: NodeId, _lineages: &mut LineageLedger) {
            self.id = Some(id);
        }

        fn value(&self) -> f64 {
            self.value
        }

        fn last_pass(&self) -> FlowPassId {
            self.last_pass
        }

        fn is_active(&self) -> bool {
            true
        }

        fn advance(
            &mut self,
            graph: &mut Graph,
            pass: FlowPassId,
            _from: Option<NodeId>,
        ) -> PropagationResult {
            self.last_pass = pass;
            let Some(id) = self.id else {
                return PropagationResult::Suppress;
            };
            // The node is detached while it runs.
            assert!(graph.get_node(id).is_none());
            assert!(graph.contains(id));
            PropagationResult::Propagate(graph.outputs_of(id).collect::<Successors>())
        }

        fn copy_boxed(&self) -> Option<Box<dyn FlowNode>> {
            Some(Box::new(Relay {
                id: None,
                ..self.clone()
            }))
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    /// Node that deletes itself on its first visit.
    #[derive(Debug, Default)]
    struct SelfDestruct {
        id: Option<NodeId>,
    }

    impl FlowNode for SelfDestruct {
        fn id(&self) -> Option<NodeId> {
            self.id
        }

        fn attach(&mut self, id: NodeId, _lineages: &mut LineageLedger) {
            self.id = Some(id);
        }

        fn value(&self) -> f64 {
            0.0
        }

        fn last_pass(&self) -> FlowPassId {
            FlowPassId::default()
        }

        fn is_active(&self) -> bool {
            false
        }

        fn advance(
            &mut self,
            graph: &mut Graph,
            _pass: FlowPassId,
            _from: Option<NodeId>,
        ) -> PropagationResult {
            if let Some(id) = self.id {
                graph.delete_node(id);
            }
            PropagationResult::Suppress
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn add_and_delete_nodes() {
        let mut graph = Graph::new();

        let id1 = graph.add_node(Relay::default());
        let id2 = graph.add_node(Relay::default());
        assert_ne!(id1, id2);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.node_as::<Relay>(id1).unwrap().id, Some(id1));

        assert!(graph.delete_node(id1));
        assert!(!graph.delete_node(id1));
        assert_eq!(graph.node_count(), 1);
        assert!(graph.get_node(id1).is_none());
        assert!(graph.get_node(id2).is_some());
    }

    #[test]
    fn ids_are_never_reused() {
        let mut graph = Graph::new();
        let first = graph.add_node(Relay::default());
        graph.delete_node(first);

        let second = graph.add_node(Relay::default());
        assert_ne!(first, second);
        assert!(graph.get_node(first).is_none());
    }

    #[test]
    fn add_and_remove_edges() {
        let mut graph = Graph::new();
        let a = graph.add_node(Relay::default());
        let b = graph.add_node(Relay::default());

        graph.add_edge(a, b).unwrap();
        assert_eq!(graph.outputs_of(a).collect::<Vec<_>>(), vec![b]);
        assert_eq!(graph.inputs_of(b).collect::<Vec<_>>(), vec![a]);

        assert!(graph.remove_edge(a, b));
        assert!(!graph.remove_edge(a, b));
        assert_eq!(graph.outputs_of(a).count(), 0);
        assert_eq!(graph.inputs_of(b).count(), 0);
    }

    #[test]
    fn add_edge_to_missing_node_fails() {
        let mut graph = Graph::new();
        let a = graph.add_node(Relay::default());
        let ghost = NodeId::from(42);

        let err = graph.add_edge(a, ghost).unwrap_err();
        assert!(matches!(err, FlowError::NodeNotFound { id } if id == ghost));
    }

    #[test]
    fn delete_node_unlinks_neighbours() {
        let mut graph = Graph::new();
        let a = graph.add_boundary_node(Relay::default());
        let b = graph.add_node_with_edges(Relay::default(), [a], []);
        let c = graph.add_node_with_edges(Relay::default(), [b], []);

        graph.delete_node(b);
        assert_eq!(graph.outputs_of(a).count(), 0);
        assert_eq!(graph.inputs_of(c).count(), 0);

        graph.delete_node(a);
        assert!(graph.input_node_ids().is_empty());
    }

    #[test]
    fn add_with_edges_skips_missing_ids() {
        let mut graph = Graph::new();
        let a = graph.add_node(Relay::default());
        let b = graph.add_node_with_edges(Relay::default(), [a, NodeId::from(77)], [NodeId::from(78)]);

        assert_eq!(graph.inputs_of(b).collect::<Vec<_>>(), vec![a]);
        assert_eq!(graph.outputs_of(b).count(), 0);
    }

    #[test]
    fn copy_node_copies_edges() {
        let mut graph = Graph::new();
        let a = graph.add_node(Relay::default());
        let b = graph.add_node_with_edges(Relay::default(), [a], []);
        let c = graph.add_node_with_edges(Relay::default(), [b], []);

        let copy = graph.copy_node(b).unwrap();
        assert_ne!(copy, b);
        assert_eq!(graph.inputs_of(copy).collect::<Vec<_>>(), vec![a]);
        assert_eq!(graph.outputs_of(copy).collect::<Vec<_>>(), vec![c]);
        assert_eq!(graph.outputs_of(a).collect::<Vec<_>>(), vec![b, copy]);

        assert!(graph.copy_node(NodeId::from(99)).is_none());
    }

    #[test]
    fn advance_reattaches_node() {
        let mut graph = Graph::new();
        let a = graph.add_node(Relay::default());
        let b = graph.add_node_with_edges(Relay::default(), [a], []);

        let result = graph.advance_node(a, FlowPassId::from(3), None).unwrap();
        assert_eq!(result, PropagationResult::Propagate(Successors::from_slice(&[b])));
        assert_eq!(graph.get_node(a).unwrap().last_pass(), FlowPassId::from(3));
    }

    #[test]
    fn advance_respects_self_deletion() {
        let mut graph = Graph::new();
        let doomed = graph.add_node(SelfDestruct::default());

        let result = graph.advance_node(doomed, FlowPassId::default(), None);
        assert_eq!(result, Some(PropagationResult::Suppress));
        assert!(!graph.contains(doomed));
        assert!(graph.advance_node(doomed, FlowPassId::default(), None).is_none());
        assert!(!graph.reexamine_node(doomed, FlowPassId::default()));
    }

    #[test]
    fn mutations_are_reported_with_clock() {
        let sink = RecordingSink::new();
        let mut graph = Graph::new();
        graph.set_event_sink(sink.clone());
        graph.set_clock(FlowPassId::from(4));

        let a = graph.add_node(Relay::default());
        let b = graph.add_node_with_edges(Relay::default(), [a], []);
        graph.delete_node(a);

        let kinds: Vec<GraphEventKind> = sink.events().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                GraphEventKind::NodeAdded { node: a, group: None },
                GraphEventKind::NodeAdded { node: b, group: None },
                GraphEventKind::EdgeAdded { from: a, to: b },
                GraphEventKind::EdgeRemoved { from: a, to: b },
                GraphEventKind::NodeRemoved { node: a },
            ]
        );
        assert!(sink.events().iter().all(|e| e.time == FlowPassId::from(4)));
    }
}
