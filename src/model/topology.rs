use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

/// Dense index of a node inside one [`Topology`]. Indices are assigned in
/// node insertion order and are only meaningful together with the topology
/// that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("duplicate node name {0:?}")]
    DuplicateNode(String),
    #[error("link references unknown node {0:?}")]
    UnknownNode(String),
    #[error("self-loop on node {0:?}")]
    SelfLoop(String),
    #[error("parallel link between {0:?} and {1:?}")]
    ParallelLink(String, String),
    #[error("link {0:?}-{1:?} has zero weight, link weights must be positive")]
    ZeroWeight(String, String),
    #[error("link {0:?}-{1:?} weight exceeds {max}", max = Topology::MAX_LINK_WEIGHT)]
    WeightTooLarge(String, String),
    #[error("duplicate node SID {0}")]
    DuplicateNodeSid(u32),
    #[error("duplicate adjacency SID {0}")]
    DuplicateAdjSid(u32),
}

#[derive(Debug, Clone)]
struct NodeRecord {
    name: String,
    label: Option<String>,
    node_sid: Option<u32>,
}

/// Immutable weighted undirected single-area graph. Built once through
/// [`TopologyBuilder`]; every engine computation borrows it read-only.
///
/// Connectivity is not assumed: queries against disconnected pairs yield
/// empty results rather than errors.
#[derive(Debug, Clone)]
pub struct Topology {
    nodes: Vec<NodeRecord>,
    index: BTreeMap<String, NodeId>,
    adjacency: BTreeMap<NodeId, BTreeMap<NodeId, u64>>,
    adj_sids: BTreeMap<(NodeId, NodeId), u32>,
}

impl Topology {
    /// Largest accepted link weight. Node ids are u32, so any simple path
    /// has fewer than 2^32 links; capping each weight at 2^32 - 1 keeps
    /// every path cost below 2^64 and distance sums free of overflow.
    pub const MAX_LINK_WEIGHT: u64 = u32::MAX as u64;

    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.adjacency.values().map(BTreeMap::len).sum::<usize>() / 2
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn node_name(&self, node: NodeId) -> &str {
        &self.nodes[node.index()].name
    }

    pub fn node_label(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.index()].label.as_deref()
    }

    pub fn node_sid(&self, node: NodeId) -> Option<u32> {
        self.nodes[node.index()].node_sid
    }

    /// Adjacency SID for the directed use of an undirected link, if one was
    /// assigned at build time.
    pub fn adj_sid(&self, from: NodeId, to: NodeId) -> Option<u32> {
        self.adj_sids
            .get(&(from, to))
            .or_else(|| self.adj_sids.get(&(to, from)))
            .copied()
    }

    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|links| links.iter().map(|(n, w)| (*n, *w)))
    }

    pub fn degree(&self, node: NodeId) -> usize {
        self.adjacency.get(&node).map_or(0, BTreeMap::len)
    }

    pub fn link_weight(&self, u: NodeId, v: NodeId) -> Option<u64> {
        self.adjacency.get(&u).and_then(|links| links.get(&v)).copied()
    }

    /// Iterate each undirected link once, as (lower id, higher id, weight).
    pub fn links(&self) -> impl Iterator<Item = (NodeId, NodeId, u64)> + '_ {
        self.adjacency.iter().flat_map(|(u, links)| {
            links
                .iter()
                .filter(move |(v, _)| *u < **v)
                .map(move |(v, w)| (*u, *v, *w))
        })
    }
}

#[derive(Debug, Default)]
pub struct TopologyBuilder {
    nodes: Vec<NodeRecord>,
    index: BTreeMap<String, NodeId>,
    links: Vec<(String, String, u64, Option<u32>)>,
}

impl TopologyBuilder {
    pub fn node(mut self, name: impl Into<String>) -> Self {
        self.push_node(name.into(), None, None);
        self
    }

    pub fn node_with(
        mut self,
        name: impl Into<String>,
        label: Option<String>,
        node_sid: Option<u32>,
    ) -> Self {
        self.push_node(name.into(), label, node_sid);
        self
    }

    pub fn link(mut self, u: impl Into<String>, v: impl Into<String>, weight: u64) -> Self {
        self.links.push((u.into(), v.into(), weight, None));
        self
    }

    pub fn link_with_sid(
        mut self,
        u: impl Into<String>,
        v: impl Into<String>,
        weight: u64,
        adj_sid: Option<u32>,
    ) -> Self {
        self.links.push((u.into(), v.into(), weight, adj_sid));
        self
    }

    fn push_node(&mut self, name: String, label: Option<String>, node_sid: Option<u32>) {
        // Duplicates are caught in build(), where an error can be returned.
        self.nodes.push(NodeRecord {
            name,
            label,
            node_sid,
        });
    }

    pub fn build(self) -> Result<Topology, TopologyError> {
        let mut index = self.index;
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut node_sids = BTreeSet::new();

        for record in self.nodes {
            let id = NodeId(nodes.len() as u32);
            if index.insert(record.name.clone(), id).is_some() {
                return Err(TopologyError::DuplicateNode(record.name));
            }
            if let Some(sid) = record.node_sid {
                if !node_sids.insert(sid) {
                    return Err(TopologyError::DuplicateNodeSid(sid));
                }
            }
            nodes.push(record);
        }

        let mut adjacency: BTreeMap<NodeId, BTreeMap<NodeId, u64>> =
            nodes.iter().enumerate().map(|(i, _)| (NodeId(i as u32), BTreeMap::new())).collect();
        let mut adj_sids = BTreeMap::new();
        let mut seen_adj_sids = BTreeSet::new();

        for (u_name, v_name, weight, adj_sid) in self.links {
            let u = *index
                .get(&u_name)
                .ok_or_else(|| TopologyError::UnknownNode(u_name.clone()))?;
            let v = *index
                .get(&v_name)
                .ok_or_else(|| TopologyError::UnknownNode(v_name.clone()))?;

            if u == v {
                return Err(TopologyError::SelfLoop(u_name));
            }
            if weight == 0 {
                return Err(TopologyError::ZeroWeight(u_name, v_name));
            }
            if weight > Topology::MAX_LINK_WEIGHT {
                return Err(TopologyError::WeightTooLarge(u_name, v_name));
            }
            if adjacency[&u].contains_key(&v) {
                return Err(TopologyError::ParallelLink(u_name, v_name));
            }
            if let Some(sid) = adj_sid {
                if !seen_adj_sids.insert(sid) {
                    return Err(TopologyError::DuplicateAdjSid(sid));
                }
                adj_sids.insert((u.min(v), u.max(v)), sid);
            }

            adjacency.entry(u).or_default().insert(v, weight);
            adjacency.entry(v).or_default().insert(u, weight);
        }

        Ok(Topology {
            nodes,
            index,
            adjacency,
            adj_sids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_undirected_links() {
        let topo = Topology::builder()
            .node("R1")
            .node("R2")
            .link("R1", "R2", 10)
            .build()
            .expect("valid topology");

        let r1 = topo.node_id("R1").unwrap();
        let r2 = topo.node_id("R2").unwrap();
        assert_eq!(topo.link_weight(r1, r2), Some(10));
        assert_eq!(topo.link_weight(r2, r1), Some(10));
        assert_eq!(topo.link_count(), 1);
    }

    #[test]
    fn builder_rejects_invalid_input() {
        let self_loop = Topology::builder().node("R1").link("R1", "R1", 1).build();
        assert_eq!(self_loop.unwrap_err(), TopologyError::SelfLoop("R1".into()));

        let zero = Topology::builder()
            .node("R1")
            .node("R2")
            .link("R1", "R2", 0)
            .build();
        assert_eq!(
            zero.unwrap_err(),
            TopologyError::ZeroWeight("R1".into(), "R2".into())
        );

        let parallel = Topology::builder()
            .node("R1")
            .node("R2")
            .link("R1", "R2", 1)
            .link("R2", "R1", 2)
            .build();
        assert_eq!(
            parallel.unwrap_err(),
            TopologyError::ParallelLink("R2".into(), "R1".into())
        );

        let oversized = Topology::builder()
            .node("R1")
            .node("R2")
            .link("R1", "R2", Topology::MAX_LINK_WEIGHT + 1)
            .build();
        assert_eq!(
            oversized.unwrap_err(),
            TopologyError::WeightTooLarge("R1".into(), "R2".into())
        );

        let unknown = Topology::builder().node("R1").link("R1", "R9", 1).build();
        assert_eq!(unknown.unwrap_err(), TopologyError::UnknownNode("R9".into()));

        let dup = Topology::builder().node("R1").node("R1").build();
        assert_eq!(dup.unwrap_err(), TopologyError::DuplicateNode("R1".into()));
    }

    #[test]
    fn builder_rejects_duplicate_sids() {
        let nodes = Topology::builder()
            .node_with("R1", None, Some(100))
            .node_with("R2", None, Some(100))
            .build();
        assert_eq!(nodes.unwrap_err(), TopologyError::DuplicateNodeSid(100));

        let links = Topology::builder()
            .node("R1")
            .node("R2")
            .node("R3")
            .link_with_sid("R1", "R2", 1, Some(24001))
            .link_with_sid("R2", "R3", 1, Some(24001))
            .build();
        assert_eq!(links.unwrap_err(), TopologyError::DuplicateAdjSid(24001));
    }

    #[test]
    fn disconnected_node_is_valid() {
        let topo = Topology::builder()
            .node("R1")
            .node("R2")
            .node("R3")
            .link("R1", "R2", 5)
            .build()
            .expect("valid topology");
        let r3 = topo.node_id("R3").unwrap();
        assert_eq!(topo.degree(r3), 0);
    }
}
