//! Graph Events
//!
//! Side channel that reports every structural change and value change in the
//! graph, stamped with the pass in which it happened. A visualizer bridge can
//! implement [`EventSink`] and serialize the events however its protocol
//! wants; the engine never depends on a sink being present.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::graph::{FlowPassId, NodeId};
use crate::lineage::GroupId;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GraphEventKind {
    NodeAdded { node: NodeId, group: Option<GroupId> },
    NodeRemoved { node: NodeId },
    EdgeAdded { from: NodeId, to: NodeId },
    EdgeRemoved { from: NodeId, to: NodeId },
    ValueChanged { node: NodeId, old: f64, new: f64 },
    PassStarted,
}

/// A change, with the logical time (pass id) it occurred at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEvent {
    pub time: FlowPassId,
    #[serde(flatten)]
    pub kind: GraphEventKind,
}

/// Receiver of graph events.
pub trait EventSink {
    fn emit(&mut self, event: &GraphEvent);
}

/// Keeps every event in memory.
///
/// Clones share the same log, so a harness can hand one clone to the graph
/// and read the events back through another.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<GraphEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far.
    pub fn events(&self) -> Vec<GraphEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &GraphEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Logs every event at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: &GraphEvent) {
        tracing::debug!(time = event.time.raw(), event = ?event.kind, "graph event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_clones_share_log() {
        let sink = RecordingSink::new();
        let mut handle = sink.clone();

        handle.emit(&GraphEvent {
            time: FlowPassId::from(3),
            kind: GraphEventKind::NodeRemoved {
                node: NodeId::from(1),
            },
        });

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0].time, FlowPassId::from(3));

        sink.clear();
        assert!(handle.is_empty());
    }

    #[test]
    fn tracing_sink_drives_a_flow() {
        use crate::config::BoundaryConfig;
        use crate::graph::{FlowScheduler, Graph};
        use crate::nodes::BoundarySource;

        let mut graph = Graph::new();
        graph.set_event_sink(TracingSink);
        let source = BoundarySource::from_values(&BoundaryConfig::default(), vec![0.9]).unwrap();
        let r = graph.add_boundary_node(source);

        let mut scheduler = FlowScheduler::new(graph);
        assert_eq!(scheduler.run_flow(), 2);
        assert_eq!(scheduler.graph().get_node(r).unwrap().value(), 0.9);
    }

    #[test]
    fn events_serialize_flat() {
        let event = GraphEvent {
            time: FlowPassId::from(2),
            kind: GraphEventKind::EdgeAdded {
                from: NodeId::from(1),
                to: NodeId::from(5),
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "edge_added");
        assert_eq!(json["time"], 2);
        assert_eq!(json["from"], 1);
        assert_eq!(json["to"], 5);
    }
}
