use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::model::path::{EntryView, Path, PathEntry, PathKind, RepairCandidate, TiLfaRepair};
use crate::model::topology::{NodeId, Topology};

/// The four generation passes, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GenerateKind {
    Spt,
    Lfa,
    Rlfa,
    Tilfa,
}

impl GenerateKind {
    pub fn path_kinds(self) -> &'static [PathKind] {
        match self {
            GenerateKind::Spt => &[PathKind::Cost],
            GenerateKind::Lfa => &[
                PathKind::LfaLink,
                PathKind::LfaDownstream,
                PathKind::LfaNode,
            ],
            GenerateKind::Rlfa => &[PathKind::RlfaLink, PathKind::RlfaNode],
            GenerateKind::Tilfa => &[PathKind::TilfaLink, PathKind::TilfaNode],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GenerateKind::Spt => "spt",
            GenerateKind::Lfa => "lfa",
            GenerateKind::Rlfa => "rlfa",
            GenerateKind::Tilfa => "tilfa",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("node {0:?} is not part of the topology")]
    UnknownNode(String),
}

/// Fixed-shape per-pair record: one list per path kind, all present from
/// construction so queries never need existence checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairRecord {
    pub cost: Vec<Path>,
    pub lfas_link: Vec<Path>,
    pub lfas_dstream: Vec<Path>,
    pub lfas_node: Vec<Path>,
    pub rlfas_link: Vec<RepairCandidate>,
    pub rlfas_node: Vec<RepairCandidate>,
    pub tilfa_link: Vec<TiLfaRepair>,
    pub tilfa_node: Vec<TiLfaRepair>,
}

impl PairRecord {
    pub fn entries(&self, kind: PathKind) -> Vec<PathEntry> {
        match kind {
            PathKind::Cost => self.cost.iter().cloned().map(PathEntry::Route).collect(),
            PathKind::LfaLink => self.lfas_link.iter().cloned().map(PathEntry::Route).collect(),
            PathKind::LfaDownstream => self
                .lfas_dstream
                .iter()
                .cloned()
                .map(PathEntry::Route)
                .collect(),
            PathKind::LfaNode => self.lfas_node.iter().cloned().map(PathEntry::Route).collect(),
            PathKind::RlfaLink => self
                .rlfas_link
                .iter()
                .cloned()
                .map(PathEntry::Repair)
                .collect(),
            PathKind::RlfaNode => self
                .rlfas_node
                .iter()
                .cloned()
                .map(PathEntry::Repair)
                .collect(),
            PathKind::TilfaLink => self
                .tilfa_link
                .iter()
                .cloned()
                .map(PathEntry::SegmentRepair)
                .collect(),
            PathKind::TilfaNode => self
                .tilfa_node
                .iter()
                .cloned()
                .map(PathEntry::SegmentRepair)
                .collect(),
        }
    }

    fn clear_kind(&mut self, kind: PathKind) {
        match kind {
            PathKind::Cost => self.cost.clear(),
            PathKind::LfaLink => self.lfas_link.clear(),
            PathKind::LfaDownstream => self.lfas_dstream.clear(),
            PathKind::LfaNode => self.lfas_node.clear(),
            PathKind::RlfaLink => self.rlfas_link.clear(),
            PathKind::RlfaNode => self.rlfas_node.clear(),
            PathKind::TilfaLink => self.tilfa_link.clear(),
            PathKind::TilfaNode => self.tilfa_node.clear(),
        }
    }
}

/// Nested query result: source name -> destination name -> kind -> entries.
pub type PathsView = BTreeMap<String, BTreeMap<String, BTreeMap<&'static str, Vec<EntryView>>>>;

/// Result store for all computed paths, pre-populated with an empty record
/// for every ordered (source, destination) pair of the topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRepository {
    pairs: BTreeMap<(NodeId, NodeId), PairRecord>,
    generated: BTreeSet<GenerateKind>,
}

impl PathRepository {
    pub fn new(topo: &Topology) -> Self {
        let mut pairs = BTreeMap::new();
        for src in topo.nodes() {
            for dst in topo.nodes() {
                if src != dst {
                    pairs.insert((src, dst), PairRecord::default());
                }
            }
        }
        Self {
            pairs,
            generated: BTreeSet::new(),
        }
    }

    pub fn record(&self, src: NodeId, dst: NodeId) -> Option<&PairRecord> {
        self.pairs.get(&(src, dst))
    }

    pub fn record_mut(&mut self, src: NodeId, dst: NodeId) -> Option<&mut PairRecord> {
        self.pairs.get_mut(&(src, dst))
    }

    pub fn is_generated(&self, kind: GenerateKind) -> bool {
        self.generated.contains(&kind)
    }

    /// Wipe every list belonging to `kind` ahead of a regeneration, so a
    /// rerun always overwrites rather than appends.
    pub fn clear_generation(&mut self, kind: GenerateKind) {
        for record in self.pairs.values_mut() {
            for path_kind in kind.path_kinds() {
                record.clear_kind(*path_kind);
            }
        }
        self.generated.remove(&kind);
    }

    pub fn mark_generated(&mut self, kind: GenerateKind) {
        self.generated.insert(kind);
    }

    fn pair_view(&self, topo: &Topology, src: NodeId, dst: NodeId) -> BTreeMap<&'static str, Vec<EntryView>> {
        let mut kinds = BTreeMap::new();
        if let Some(record) = self.record(src, dst) {
            for kind in PathKind::ALL {
                let entries = record
                    .entries(kind)
                    .iter()
                    .map(|entry| EntryView::from_entry(topo, entry))
                    .collect();
                kinds.insert(kind.as_str(), entries);
            }
        }
        kinds
    }

    /// Filtered nested view. `None` selects all sources and/or destinations.
    /// Kinds never generated come back as the pre-populated empty lists.
    pub fn get_paths(
        &self,
        topo: &Topology,
        src: Option<NodeId>,
        dst: Option<NodeId>,
    ) -> PathsView {
        let sources: Vec<NodeId> = match src {
            Some(node) => vec![node],
            None => topo.nodes().collect(),
        };

        let mut view = PathsView::new();
        for s in sources {
            let destinations: Vec<NodeId> = match dst {
                Some(node) => vec![node],
                None => topo.nodes().filter(|d| *d != s).collect(),
            };
            for d in destinations {
                if s == d {
                    continue;
                }
                view.entry(topo.node_name(s).to_string())
                    .or_default()
                    .insert(topo.node_name(d).to_string(), self.pair_view(topo, s, d));
            }
        }
        view
    }

    /// Full scan across every pair and kind, keeping only entries whose node
    /// sequence contains `via`. Sub-maps are created only where something
    /// matched, so the caller can tell "no path through via" apart from the
    /// pre-populated empty shape of [`get_paths`].
    pub fn get_paths_via(&self, topo: &Topology, via: NodeId) -> PathsView {
        let mut view = PathsView::new();
        for ((src, dst), record) in &self.pairs {
            let mut kinds: BTreeMap<&'static str, Vec<EntryView>> = BTreeMap::new();
            for kind in PathKind::ALL {
                let matching: Vec<EntryView> = record
                    .entries(kind)
                    .iter()
                    .filter(|entry| entry.contains(via))
                    .map(|entry| EntryView::from_entry(topo, entry))
                    .collect();
                if !matching.is_empty() {
                    kinds.insert(kind.as_str(), matching);
                }
            }
            if !kinds.is_empty() {
                view.entry(topo.node_name(*src).to_string())
                    .or_default()
                    .insert(topo.node_name(*dst).to_string(), kinds);
            }
        }
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topo() -> Topology {
        Topology::builder()
            .node("R1")
            .node("R2")
            .node("R3")
            .link("R1", "R2", 10)
            .link("R2", "R3", 10)
            .link("R3", "R1", 10)
            .build()
            .expect("valid topology")
    }

    #[test]
    fn repository_prepopulates_every_ordered_pair() {
        let topo = topo();
        let repo = PathRepository::new(&topo);
        let r1 = topo.node_id("R1").unwrap();
        let r2 = topo.node_id("R2").unwrap();
        assert!(repo.record(r1, r2).is_some());
        assert!(repo.record(r2, r1).is_some());
        assert!(repo.record(r1, r1).is_none());

        let view = repo.get_paths(&topo, None, None);
        assert_eq!(view.len(), 3);
        assert!(view["R1"]["R2"]["cost"].is_empty());
        assert!(view["R1"]["R2"]["rlfas_link"].is_empty());
    }

    #[test]
    fn clear_generation_wipes_only_the_requested_kinds() {
        let topo = topo();
        let mut repo = PathRepository::new(&topo);
        let r1 = topo.node_id("R1").unwrap();
        let r2 = topo.node_id("R2").unwrap();
        let record = repo.record_mut(r1, r2).unwrap();
        record.cost.push(Path {
            hops: vec![r1, r2],
            cost: 10,
        });
        record.lfas_link.push(Path {
            hops: vec![r1, topo.node_id("R3").unwrap(), r2],
            cost: 20,
        });
        repo.mark_generated(GenerateKind::Spt);
        repo.mark_generated(GenerateKind::Lfa);

        repo.clear_generation(GenerateKind::Lfa);
        let record = repo.record(r1, r2).unwrap();
        assert_eq!(record.cost.len(), 1);
        assert!(record.lfas_link.is_empty());
        assert!(repo.is_generated(GenerateKind::Spt));
        assert!(!repo.is_generated(GenerateKind::Lfa));
    }

    #[test]
    fn get_paths_via_matches_any_hop_membership() {
        let topo = topo();
        let mut repo = PathRepository::new(&topo);
        let r1 = topo.node_id("R1").unwrap();
        let r2 = topo.node_id("R2").unwrap();
        let r3 = topo.node_id("R3").unwrap();
        repo.record_mut(r1, r2).unwrap().cost.push(Path {
            hops: vec![r1, r2],
            cost: 10,
        });
        repo.record_mut(r1, r3).unwrap().cost.push(Path {
            hops: vec![r1, r2, r3],
            cost: 20,
        });

        let via_r2 = repo.get_paths_via(&topo, r2);
        assert!(via_r2["R1"].contains_key("R2"));
        assert!(via_r2["R1"].contains_key("R3"));

        let via_r3 = repo.get_paths_via(&topo, r3);
        assert_eq!(via_r3.len(), 1);
        assert!(via_r3["R1"].contains_key("R3"));
        assert!(!via_r3["R1"].contains_key("R2"));
    }
}
