pub mod path;
pub mod repository;
pub mod topology;

pub use path::{EntryView, Path, PathEntry, PathKind, RepairCandidate, Segment, TiLfaRepair};
pub use repository::{GenerateKind, PairRecord, PathRepository, PathsView, QueryError};
pub use topology::{NodeId, Topology, TopologyBuilder, TopologyError};
