//! Growthflow Core
//!
//! This crate simulates a directed activation graph that rewrites itself
//! while values flow through it. It implements:
//!
//! - Discrete propagation passes ("flows") driven from boundary inputs
//! - Growing nodes that average their inputs, duplicate themselves after
//!   repeated activation and are pruned after sustained inactivity
//! - Termination when a boundary input is exhausted
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: the node arena, the node capability trait and the scheduler
//! - `nodes`: growing and boundary node kinds, plus shared aggregation helpers
//! - `lineage`: group ids and the duplicate quota shared by a lineage
//! - `events`: optional notification of every graph change
//! - `config`: serde-backed node parameters
//!
//! # Example
//!
//! ```rust
//! use growthflow_core::config::{BoundaryConfig, GrowthConfig};
//! use growthflow_core::graph::{FlowScheduler, Graph};
//! use growthflow_core::lineage::GroupIdAllocator;
//! use growthflow_core::nodes::{BoundarySource, GrowingNode};
//!
//! let mut groups = GroupIdAllocator::new();
//! let mut graph = Graph::new();
//!
//! let input = BoundarySource::from_values(&BoundaryConfig::default(), vec![0.2, 0.9, 0.9]).unwrap();
//! let input = graph.add_boundary_node(input);
//! let node = GrowingNode::root(&GrowthConfig::default(), &mut groups).unwrap();
//! graph.add_node_with_edges(node, [input], []);
//!
//! let mut scheduler = FlowScheduler::new(graph);
//! let passes = scheduler.run_flow();
//! assert_eq!(passes, 4);
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod lineage;
pub mod nodes;

pub use error::FlowError;
