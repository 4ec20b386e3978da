//! Lineages
//!
//! A lineage is a root node together with every duplicate descended from it.
//! All members share one [`GroupId`] and one duplicate quota, kept in the
//! graph's [`LineageLedger`].

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lineage marker shared by a node and all of its duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(u64);

impl GroupId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl From<u64> for GroupId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out fresh group ids, starting at 1.
///
/// Owned by whoever builds the experiment; nodes never allocate on their own.
#[derive(Debug, Default)]
pub struct GroupIdAllocator {
    last: u64,
}

impl GroupIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next group id.
    pub fn next_id(&mut self) -> GroupId {
        self.last += 1;
        GroupId(self.last)
    }

    /// Make sure future ids do not collide with an explicitly chosen one.
    pub fn reserve(&mut self, group: GroupId) {
        self.last = self.last.max(group.0);
    }
}

/// Remaining duplicate quota per lineage.
#[derive(Debug, Default)]
pub struct LineageLedger {
    remaining: HashMap<GroupId, u32>,
}

impl LineageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lineage with its quota. A lineage that is already known
    /// keeps its current count.
    pub fn register(&mut self, group: GroupId, quota: u32) {
        self.remaining.entry(group).or_insert(quota);
    }

    /// Duplicates the lineage may still create. Unknown lineages have none.
    pub fn remaining(&self, group: GroupId) -> u32 {
        self.remaining.get(&group).copied().unwrap_or(0)
    }

    /// Spend one unit of quota and return what is left.
    pub fn consume(&mut self, group: GroupId) -> u32 {
        match self.remaining.get_mut(&group) {
            Some(left) => {
                *left = left.saturating_sub(1);
                *left
            }
            None => 0,
        }
    }

    pub fn is_exhausted(&self, group: GroupId) -> bool {
        self.remaining(group) == 0
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}
