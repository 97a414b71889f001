use serde::Serialize;

use crate::model::topology::{NodeId, Topology};

/// Closed set of path classifications stored per (source, destination) pair.
///
/// `Cost` holds pre-failure shortest paths; the LFA kinds hold plain backup
/// paths; the rLFA and TI-LFA kinds hold repair tunnels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PathKind {
    Cost,
    LfaLink,
    LfaDownstream,
    LfaNode,
    RlfaLink,
    RlfaNode,
    TilfaLink,
    TilfaNode,
}

impl PathKind {
    pub const ALL: [PathKind; 8] = [
        PathKind::Cost,
        PathKind::LfaLink,
        PathKind::LfaDownstream,
        PathKind::LfaNode,
        PathKind::RlfaLink,
        PathKind::RlfaNode,
        PathKind::TilfaLink,
        PathKind::TilfaNode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PathKind::Cost => "cost",
            PathKind::LfaLink => "lfas_link",
            PathKind::LfaDownstream => "lfas_dstream",
            PathKind::LfaNode => "lfas_node",
            PathKind::RlfaLink => "rlfas_link",
            PathKind::RlfaNode => "rlfas_node",
            PathKind::TilfaLink => "tilfa_link",
            PathKind::TilfaNode => "tilfa_node",
        }
    }
}

/// A simple (loop-free) walk through the topology. Cost is the sum of the
/// traversed link weights.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub hops: Vec<NodeId>,
    pub cost: u64,
}

impl Path {
    pub fn source(&self) -> Option<NodeId> {
        self.hops.first().copied()
    }

    pub fn destination(&self) -> Option<NodeId> {
        self.hops.last().copied()
    }

    /// First hop after the source, i.e. the next-hop node.
    pub fn first_hop(&self) -> Option<NodeId> {
        self.hops.get(1).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.hops.contains(&node)
    }

    pub fn links(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.hops.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

/// A repair tunnel: the ECMP path set from the repairing router to the
/// repair-tunnel endpoint, and the ECMP path set from that endpoint to the
/// destination. Either side may hold several tied paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RepairCandidate {
    pub to_repair: Vec<Path>,
    pub from_repair: Vec<Path>,
}

impl RepairCandidate {
    pub fn repair_node(&self) -> Option<NodeId> {
        self.to_repair.first().and_then(Path::destination)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.to_repair.iter().any(|p| p.contains(node))
            || self.from_repair.iter().any(|p| p.contains(node))
    }

    /// Cost of the full repair: one tunnel leg plus one egress leg. All
    /// members of each side are tied, so the first of each is enough.
    pub fn total_cost(&self) -> u64 {
        let to = self.to_repair.first().map_or(0, |p| p.cost);
        let from = self.from_repair.first().map_or(0, |p| p.cost);
        to + from
    }
}

/// One explicit segment in a TI-LFA repair list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Segment {
    /// Node segment: shortest-path forwarding toward the named node.
    Node(NodeId),
    /// Adjacency segment: forced traversal of one specific link.
    Adjacency(NodeId, NodeId),
}

/// A TI-LFA repair: the post-convergence path split at the repair point,
/// plus the segment list required to source-route the packet onto it.
/// An empty segment list means the backup next hop alone is loop-free.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TiLfaRepair {
    pub candidate: RepairCandidate,
    pub segments: Vec<Segment>,
}

impl TiLfaRepair {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn total_cost(&self) -> u64 {
        self.candidate.total_cost()
    }
}

/// Uniform entry type for query results, so each kind's candidate shape
/// stays typed rather than positionally encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathEntry {
    Route(Path),
    Repair(RepairCandidate),
    SegmentRepair(TiLfaRepair),
}

impl PathEntry {
    pub fn contains(&self, node: NodeId) -> bool {
        match self {
            PathEntry::Route(path) => path.contains(node),
            PathEntry::Repair(repair) => repair.contains(node),
            PathEntry::SegmentRepair(repair) => repair.candidate.contains(node),
        }
    }
}

/// Serializable, name-resolved form of a [`PathEntry`] for the export and
/// query surface. Node ids are rendered as their topology names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntryView {
    Route(Vec<String>),
    Repair {
        to_repair: Vec<Vec<String>>,
        from_repair: Vec<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        segments: Option<Vec<String>>,
    },
}

fn render_hops(topo: &Topology, path: &Path) -> Vec<String> {
    path.hops
        .iter()
        .map(|hop| topo.node_name(*hop).to_string())
        .collect()
}

// Configured segment-routing SIDs take precedence over the symbolic form,
// so a SID-annotated topology yields the numeric label stack.
fn render_segment(topo: &Topology, segment: &Segment) -> String {
    match segment {
        Segment::Node(node) => match topo.node_sid(*node) {
            Some(sid) => format!("node-sid({sid})"),
            None => format!("node({})", topo.node_name(*node)),
        },
        Segment::Adjacency(u, v) => match topo.adj_sid(*u, *v) {
            Some(sid) => format!("adj-sid({sid})"),
            None => format!("adj({}-{})", topo.node_name(*u), topo.node_name(*v)),
        },
    }
}

impl EntryView {
    pub fn from_entry(topo: &Topology, entry: &PathEntry) -> Self {
        match entry {
            PathEntry::Route(path) => EntryView::Route(render_hops(topo, path)),
            PathEntry::Repair(repair) => EntryView::Repair {
                to_repair: repair.to_repair.iter().map(|p| render_hops(topo, p)).collect(),
                from_repair: repair
                    .from_repair
                    .iter()
                    .map(|p| render_hops(topo, p))
                    .collect(),
                segments: None,
            },
            PathEntry::SegmentRepair(repair) => EntryView::Repair {
                to_repair: repair
                    .candidate
                    .to_repair
                    .iter()
                    .map(|p| render_hops(topo, p))
                    .collect(),
                from_repair: repair
                    .candidate
                    .from_repair
                    .iter()
                    .map(|p| render_hops(topo, p))
                    .collect(),
                segments: Some(
                    repair
                        .segments
                        .iter()
                        .map(|segment| render_segment(topo, segment))
                        .collect(),
                ),
            },
        }
    }
}
