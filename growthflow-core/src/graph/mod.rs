//! Activation Graph
//!
//! This module implements the mutable graph the flow runs over and the
//! scheduler that drives passes across it.
//!
//! # Overview
//!
//! The graph is a directed graph, possibly cyclic, where:
//!
//! - Nodes hold a scalar activation value and decide on each visit whether
//!   the flow continues into their successors
//! - Edges carry activation from a predecessor to a successor
//!
//! Nodes rewrite the graph while a pass is running: they add duplicates of
//! themselves and delete themselves. The scheduler never holds references
//! into the graph, only ids, so these edits cannot invalidate anything it
//! has queued.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena keyed by ids that are never reused.
//!
//! 2. Adjacency is stored per slot and kept in insertion order, so traversal
//!    order is deterministic.
//!
//! 3. A node is detached from its slot while it is advanced, which lets it
//!    take `&mut Graph` without aliasing itself.

mod node;
mod observer;
mod scheduler;
mod store;

pub use node::{FlowNode, FlowPassId, NodeId, PropagationResult, Successors};
pub use observer::{FlowObserver, FlowStats, NoopObserver, PassStats};
pub use scheduler::FlowScheduler;
pub use store::Graph;
