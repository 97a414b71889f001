use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::model::topology::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    node: NodeId,
    cost: u64,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap frontier for Dijkstra relaxation. Entries are never decreased
/// in place; stale duplicates are skipped on pop via the caller's check.
#[derive(Debug, Default, Clone)]
pub struct DistanceFrontier {
    heap: BinaryHeap<QueueEntry>,
}

impl DistanceFrontier {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, node: NodeId, cost: u64) {
        self.heap.push(QueueEntry { node, cost });
    }

    pub fn pop_min<F>(&mut self, mut is_stale: F) -> Option<(NodeId, u64)>
    where
        F: FnMut(NodeId, u64) -> bool,
    {
        while let Some(entry) = self.heap.pop() {
            if is_stale(entry.node, entry.cost) {
                continue;
            }
            return Some((entry.node, entry.cost));
        }
        None
    }
}
