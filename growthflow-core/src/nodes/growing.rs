//! Growing Node
//!
//! A node whose value is the mean of its predecessors' latest values within
//! the current pass, and which rewrites the graph around itself:
//!
//! - On every inactive-to-active transition it spends one unit of active
//!   budget. Once that budget is gone the next transition spawns a duplicate
//!   (same lineage, same outputs, inputs restricted to boundary or currently
//!   active predecessors) and refills the budget.
//! - Every pass the scheduler re-examines it. Passes that went by without any
//!   input drain the inactive budget; an empty inactive budget prunes the node.
//! - When the lineage's duplicate quota is used up, the node removes itself
//!   the next time it is visited.
//!
//! The comparison baseline for "did the value change" and "was it active" is
//! the value the node held at the end of its previous computation when that
//! computation happened in the directly preceding pass, so a node that stays
//! active across consecutive passes does not register a new rising edge on
//! each pass. After one or more idle passes the baseline is zero, and a node
//! reached again with an active value counts as becoming active again.

use std::any::Any;

use tracing::{info, trace, warn};

use super::aggregate::{idle_gap, Budget, IncrementalMean};
use crate::config::GrowthConfig;
use crate::error::FlowError;
use crate::events::GraphEventKind;
use crate::graph::{FlowNode, FlowPassId, Graph, NodeId, PropagationResult, Successors};
use crate::lineage::{GroupId, GroupIdAllocator, LineageLedger};

#[derive(Debug, Clone)]
pub struct GrowingNode {
    id: Option<NodeId>,
    group: GroupId,
    value: f64,
    activation_threshold: f64,
    active: Budget,
    inactive: Budget,
    /// Quota registered for the lineage when the first member is attached.
    max_duplicates: u32,
    inputs: IncrementalMean,
    last_pass: FlowPassId,
}

impl GrowingNode {
    /// Create a node in an explicitly chosen lineage.
    ///
    /// The group is not reserved anywhere: a later [`GrowingNode::root`] may
    /// be handed the same id and share its quota. Use
    /// [`GrowingNode::in_lineage`] when roots are also allocated.
    pub fn new(config: &GrowthConfig, group: GroupId) -> Result<Self, FlowError> {
        config.validate()?;
        Ok(Self {
            id: None,
            group,
            value: 0.0,
            activation_threshold: config.activation_threshold,
            active: Budget::new(config.active_budget),
            inactive: Budget::new(config.inactive_budget),
            max_duplicates: config.max_duplicates,
            inputs: IncrementalMean::new(),
            last_pass: FlowPassId::default(),
        })
    }

    /// Create a node in `group` and keep `groups` from handing it out again.
    pub fn in_lineage(
        config: &GrowthConfig,
        group: GroupId,
        groups: &mut GroupIdAllocator,
    ) -> Result<Self, FlowError> {
        let node = Self::new(config, group)?;
        groups.reserve(group);
        Ok(node)
    }

    /// Create the root of a new lineage.
    pub fn root(config: &GrowthConfig, groups: &mut GroupIdAllocator) -> Result<Self, FlowError> {
        Self::new(config, groups.next_id())
    }

    /// Treat the node as last computed in `pass`.
    pub fn starting_at(mut self, pass: FlowPassId) -> Self {
        self.last_pass = pass;
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn group_id(&self) -> GroupId {
        self.group
    }

    pub fn activation_threshold(&self) -> f64 {
        self.activation_threshold
    }

    pub fn active_budget(&self) -> i64 {
        self.active.remaining()
    }

    pub fn default_active_budget(&self) -> i64 {
        self.active.default_value()
    }

    pub fn inactive_budget(&self) -> i64 {
        self.inactive.remaining()
    }

    pub fn default_inactive_budget(&self) -> i64 {
        self.inactive.default_value()
    }

    /// Duplicates the node's lineage may still create.
    pub fn duplicates_remaining(&self, graph: &Graph) -> u32 {
        graph.lineages().remaining(self.group)
    }

    /// Per-pass aggregation state.
    pub fn contributions(&self) -> &IncrementalMean {
        &self.inputs
    }

    pub fn is_active_value(value: f64, activation_threshold: f64) -> bool {
        value >= activation_threshold
    }

    /// Fresh, unattached member of the same lineage carrying this node's value.
    fn offspring(&self) -> Self {
        let mut active = self.active;
        let mut inactive = self.inactive;
        active.reset();
        inactive.reset();
        Self {
            id: None,
            group: self.group,
            value: self.value,
            activation_threshold: self.activation_threshold,
            active,
            inactive,
            max_duplicates: self.max_duplicates,
            inputs: IncrementalMean::new(),
            last_pass: self.last_pass,
        }
    }

    /// Fold the report of `from` into this pass's mean.
    fn absorb(
        &mut self,
        graph: &mut Graph,
        id: NodeId,
        pass: FlowPassId,
        from: Option<NodeId>,
    ) -> PropagationResult {
        let mut prev_value = self.value;
        let mut prev_active = self.is_active();

        if self.last_pass != pass {
            // Only the directly preceding pass carries its value forward.
            if pass != self.last_pass.next() {
                prev_value = 0.0;
                prev_active = Self::is_active_value(0.0, self.activation_threshold);
            }
            self.value = 0.0;
            self.inputs.clear();
            self.last_pass = pass;
        }

        let Some(from) = from else {
            trace!(node = %id, "growing node seeded without predecessor");
            return PropagationResult::Suppress;
        };
        let Some(reported) = graph.get_node(from).map(|node| node.value()) else {
            warn!(node = %id, from = %from, "predecessor vanished before it could be read");
            return PropagationResult::Suppress;
        };

        self.value = self.inputs.record(from, reported);
        if self.value != prev_value {
            graph.emit(GraphEventKind::ValueChanged {
                node: id,
                old: prev_value,
                new: self.value,
            });
        }

        let result = if self.is_active() && self.value != prev_value {
            PropagationResult::Propagate(graph.outputs_of(id).collect::<Successors>())
        } else {
            PropagationResult::Suppress
        };

        if !prev_active && self.is_active() {
            self.on_rising_edge(graph, id);
        }
        result
    }

    fn on_rising_edge(&mut self, graph: &mut Graph, id: NodeId) {
        if self.active.is_exhausted() {
            // Another member already spent the quota; the caller removes us.
            if graph.lineages().is_exhausted(self.group) {
                return;
            }
            let duplicate = self.spawn_duplicate(graph, id);
            self.active.reset();
            let left = graph.lineages_mut().consume(self.group);
            info!(node = %id, %duplicate, group = %self.group, left, "node duplicated");
        } else {
            self.active.consume(1);
        }
        self.inactive.reset();
    }

    fn spawn_duplicate(&self, graph: &mut Graph, id: NodeId) -> NodeId {
        let inputs: Vec<NodeId> = graph
            .inputs_of(id)
            .filter(|&input| {
                graph.is_input(input) || graph.get_node(input).is_some_and(|node| node.is_active())
            })
            .collect();
        let outputs: Vec<NodeId> = graph.outputs_of(id).collect();

        graph.add_node_with_edges(self.offspring(), inputs, outputs)
    }
}

impl FlowNode for GrowingNode {
    fn id(&self) -> Option<NodeId> {
        self.id
    }

    fn attach(&mut self, id: NodeId, lineages: &mut LineageLedger) {
        self.id = Some(id);
        lineages.register(self.group, self.max_duplicates);
    }

    fn group(&self) -> Option<GroupId> {
        Some(self.group)
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn last_pass(&self) -> FlowPassId {
        self.last_pass
    }

    fn is_active(&self) -> bool {
        Self::is_active_value(self.value, self.activation_threshold)
    }

    fn advance(
        &mut self,
        graph: &mut Graph,
        pass: FlowPassId,
        from: Option<NodeId>,
    ) -> PropagationResult {
        let Some(id) = self.id else {
            return PropagationResult::Suppress;
        };

        let result = self.absorb(graph, id, pass, from);

        if graph.lineages().is_exhausted(self.group) {
            info!(node = %id, group = %self.group, "lineage quota exhausted, removing node");
            graph.delete_node(id);
            return PropagationResult::Suppress;
        }
        result
    }

    fn reexamine(&mut self, graph: &mut Graph, pass: FlowPassId) -> bool {
        let Some(id) = self.id else {
            return false;
        };

        let gap = idle_gap(pass, self.last_pass);
        self.inactive.consume(i64::try_from(gap).unwrap_or(i64::MAX));

        if self.inactive.is_exhausted() {
            info!(node = %id, group = %self.group, %pass, "deleting inactive node");
            graph.delete_node(id);
            return false;
        }
        if gap > 0 {
            self.active.reset();
        }
        true
    }

    fn copy_boxed(&self) -> Option<Box<dyn FlowNode>> {
        Some(Box::new(Self {
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
