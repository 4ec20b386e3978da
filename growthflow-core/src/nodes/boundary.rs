//! Boundary Sources
//!
//! Boundary nodes are where every pass begins. Each visit pulls the next
//! external value; when the input runs dry the node flags itself as stopped,
//! which is how a flow learns it is finished.

use std::any::Any;
use std::fmt;

use tracing::{info, trace};

use crate::config::BoundaryConfig;
use crate::error::FlowError;
use crate::events::GraphEventKind;
use crate::graph::{FlowNode, FlowPassId, Graph, NodeId, PropagationResult, Successors};
use crate::lineage::LineageLedger;

/// Result of pulling from an external input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pull {
    Next(f64),
    Exhausted,
}

/// A lazy sequence of input values.
pub trait ValueSource: fmt::Debug + 'static {
    fn pull(&mut self) -> Pull;
}

/// Adapts any `f64` iterator into a [`ValueSource`].
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = f64>,
{
    pub fn new<T>(values: T) -> Self
    where
        T: IntoIterator<IntoIter = I, Item = f64>,
    {
        Self {
            iter: values.into_iter(),
        }
    }
}

impl<I> fmt::Debug for IterSource<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterSource").finish_non_exhaustive()
    }
}

impl<I> ValueSource for IterSource<I>
where
    I: Iterator<Item = f64> + 'static,
{
    fn pull(&mut self) -> Pull {
        match self.iter.next() {
            Some(value) => Pull::Next(value),
            None => Pull::Exhausted,
        }
    }
}

/// Externally fed origin of a flow pass.
#[derive(Debug)]
pub struct BoundarySource<S> {
    id: Option<NodeId>,
    value: f64,
    activation_threshold: f64,
    stopped: bool,
    last_pass: FlowPassId,
    source: S,
}

impl<S: ValueSource> BoundarySource<S> {
    pub fn new(config: &BoundaryConfig, source: S) -> Result<Self, FlowError> {
        config.validate()?;
        Ok(Self {
            id: None,
            value: 0.0,
            activation_threshold: config.activation_threshold,
            stopped: false,
            last_pass: FlowPassId::default(),
            source,
        })
    }

    pub fn activation_threshold(&self) -> f64 {
        self.activation_threshold
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<I> BoundarySource<IterSource<I>>
where
    I: Iterator<Item = f64> + 'static,
{
    /// Boundary node fed from a sequence of values.
    pub fn from_values<T>(config: &BoundaryConfig, values: T) -> Result<Self, FlowError>
    where
        T: IntoIterator<IntoIter = I, Item = f64>,
    {
        Self::new(config, IterSource::new(values))
    }
}

impl<S: ValueSource> FlowNode for BoundarySource<S> {
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

    /// Strictly above the threshold, unlike growing nodes.
    fn is_active(&self) -> bool {
        self.value > self.activation_threshold
    }

    fn has_stopped(&self) -> bool {
        self.stopped
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
        if self.stopped {
            return PropagationResult::Suppress;
        }

        match self.source.pull() {
            Pull::Next(value) => {
                let old = self.value;
                self.value = value;
                if old != value {
                    graph.emit(GraphEventKind::ValueChanged {
                        node: id,
                        old,
                        new: value,
                    });
                }
                trace!(node = %id, value, active = self.is_active(), "boundary pulled value");

                if self.is_active() {
                    PropagationResult::Propagate(graph.outputs_of(id).collect::<Successors>())
                } else {
                    PropagationResult::Suppress
                }
            }
            Pull::Exhausted => {
                info!(node = %id, %pass, "boundary input exhausted");
                self.stopped = true;
                PropagationResult::Suppress
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
