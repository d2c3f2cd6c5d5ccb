pub mod tree;

// Re-export main types
pub use tree::{NodeId, SyntaxTree, TreeBuilder};
