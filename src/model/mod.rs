//! Language-independent code model: node kinds, edge kinds and the graph boundary

mod edges;
mod graph;
mod kinds;
mod memory;

pub use edges::{Direction, EdgeKind};
pub use graph::{CodeGraph, Position};
pub use kinds::NodeKind;
pub use memory::{
    AttributeValue, EdgeRecord, GraphError, GraphFile, MemoryGraph, NodeBuilder, NodeRecord,
};

/// Identifier of a node in the code graph
pub type NodeId = u32;
