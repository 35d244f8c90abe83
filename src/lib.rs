//! A red-black tree ordered set packed into a contiguous byte array.
//!
//! Nodes live in a fixed-capacity index-based arena ([`arena::NodeArena`])
//! rather than behind owned pointers; child and parent links are u32 slot
//! indices, and the whole tree is `Pod`, so it can be overlaid on a
//! caller-provided buffer with [`FromSlice::new_from_slice`]. The structure
//! is single-threaded; wrap it in a lock for shared mutation.

pub mod arena;
pub mod red_black_tree;

pub use arena::FromSlice;
pub use arena::NodeArena;
pub use arena::ZeroCopy;
pub use arena::SENTINEL;

pub use red_black_tree::{Color, EmptyTreeError, RedBlackTree};
