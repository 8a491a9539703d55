//! Expression trees: operator table, node type and the Pratt builder.

mod builder;
mod node;
mod ops;

pub use builder::{ExprBuilder, build_tree};
pub use node::{ExprNode, LeafKind, NodeFlags};
pub use ops::{CastType, ExprOp};
