//! Node Kinds
//!
//! - [`GrowingNode`]: averages its inputs each pass, duplicates itself after
//!   repeated activation and is pruned after sustained inactivity.
//! - [`BoundarySource`]: pulls values from an external input and starts
//!   every pass. Its exhaustion ends the flow.
//!
//! The two kinds compare against their threshold differently: growing nodes
//! are active at `value >= threshold`, boundary nodes only at
//! `value > threshold`.

mod aggregate;
mod boundary;
mod growing;

pub use aggregate::{idle_gap, Budget, IncrementalMean};
pub use boundary::{BoundarySource, IterSource, Pull, ValueSource};
pub use growing::GrowingNode;
