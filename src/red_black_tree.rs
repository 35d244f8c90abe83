use bytemuck::{Pod, Zeroable};
use colored::Colorize;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fmt::Debug;
use thiserror::Error;

use crate::arena::{Field, FromSlice, NodeArena, ZeroCopy, SENTINEL};

// Register alias
pub const COLOR: u32 = Field::Color as u32;

/// Node color. `Black` must stay the zeroed variant: the SENTINEL's registers
/// are all zero, so an absent child reads as Black without special casing.
#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive)]
pub enum Color {
    Black = 0,
    Red = 1,
}

/// Returned by `find_min` / `find_max` on a tree with no nodes. The only
/// error in the crate; duplicate inserts and absent-value removes are no-ops.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("red-black tree is empty")]
pub struct EmptyTreeError;

/// Exploits the fact that LEFT and RIGHT are set to 0 and 1 respectively
#[inline(always)]
fn opposite(dir: u32) -> u32 {
    1 - dir
}

#[repr(C)]
#[derive(Default, Copy, Clone)]
pub struct RBNode<V: PartialOrd + Copy + Clone + Default + Pod + Zeroable> {
    pub value: V,
}

unsafe impl<V: PartialOrd + Copy + Clone + Default + Pod + Zeroable> Zeroable for RBNode<V> {}
unsafe impl<V: PartialOrd + Copy + Clone + Default + Pod + Zeroable> Pod for RBNode<V> {}

impl<V: PartialOrd + Copy + Clone + Default + Pod + Zeroable> RBNode<V> {
    pub fn new(value: V) -> Self {
        Self { value }
    }
}

/// An ordered set of `V` kept as a red-black tree over an index-based node
/// arena. Child links are arena indices owned by the tree; parent links are
/// plain back-references kept in lock-step with every rotation, never an
/// ownership edge. Capacity is `MAX_SIZE - 1` values (slot 0 is the SENTINEL).
#[repr(C)]
#[derive(Copy, Clone)]
pub struct RedBlackTree<
    V: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    const MAX_SIZE: usize,
> {
    pub root: u64,
    _padding: u64,
    arena: NodeArena<RBNode<V>, MAX_SIZE, 4>,
}

unsafe impl<V: PartialOrd + Copy + Clone + Default + Pod + Zeroable, const MAX_SIZE: usize> Zeroable
    for RedBlackTree<V, MAX_SIZE>
{
}
unsafe impl<V: PartialOrd + Copy + Clone + Default + Pod + Zeroable, const MAX_SIZE: usize> Pod
    for RedBlackTree<V, MAX_SIZE>
{
}

impl<V: PartialOrd + Copy + Clone + Default + Pod + Zeroable, const MAX_SIZE: usize> ZeroCopy
    for RedBlackTree<V, MAX_SIZE>
{
}

impl<V: PartialOrd + Copy + Clone + Default + Pod + Zeroable, const MAX_SIZE: usize> Default
    for RedBlackTree<V, MAX_SIZE>
{
    fn default() -> Self {
        Self::assert_proper_alignment();
        RedBlackTree {
            root: SENTINEL as u64,
            _padding: 0,
            arena: NodeArena::<RBNode<V>, MAX_SIZE, 4>::default(),
        }
    }
}

impl<V: PartialOrd + Copy + Clone + Default + Pod + Zeroable, const MAX_SIZE: usize> FromSlice
    for RedBlackTree<V, MAX_SIZE>
{
    fn new_from_slice(slice: &mut [u8]) -> &mut Self {
        Self::assert_proper_alignment();
        let tree = Self::load_mut_bytes(slice).unwrap();
        tree.arena.initialize();
        tree
    }
}

impl<V: PartialOrd + Copy + Clone + Default + Pod + Zeroable, const MAX_SIZE: usize>
    RedBlackTree<V, MAX_SIZE>
{
    fn assert_proper_alignment() {
        assert!(std::mem::size_of::<RBNode<V>>() % std::mem::align_of::<RBNode<V>>() == 0);
        assert!(std::mem::size_of::<RBNode<V>>() % 8 == 0);
    }

    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.arena.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.root as u32 == SENTINEL
    }

    pub fn capacity(&self) -> usize {
        MAX_SIZE - 1
    }

    pub fn get_node(&self, node: u32) -> &RBNode<V> {
        self.arena.get(node).get_value()
    }

    fn get_node_mut(&mut self, node: u32) -> &mut RBNode<V> {
        self.arena.get_mut(node).get_value_mut()
    }

    #[inline(always)]
    fn color_red(&mut self, node: u32) {
        if node != SENTINEL {
            self.arena.set_register(node, Color::Red as u32, COLOR);
        }
    }

    #[inline(always)]
    fn color_black(&mut self, node: u32) {
        self.arena.set_register(node, Color::Black as u32, COLOR);
    }

    #[inline(always)]
    fn is_red(&self, node: u32) -> bool {
        self.arena.get_register(node, COLOR) == Color::Red as u32
    }

    #[inline(always)]
    fn is_black(&self, node: u32) -> bool {
        self.arena.get_register(node, COLOR) == Color::Black as u32
    }

    #[inline(always)]
    pub fn get_color(&self, node: u32) -> u32 {
        self.arena.get_register(node, COLOR)
    }

    #[inline(always)]
    fn get_child(&self, node: u32, dir: u32) -> u32 {
        self.arena.get_register(node, dir)
    }

    #[inline(always)]
    pub fn get_left(&self, node: u32) -> u32 {
        self.arena.get_register(node, Field::Left as u32)
    }

    #[inline(always)]
    pub fn get_right(&self, node: u32) -> u32 {
        self.arena.get_register(node, Field::Right as u32)
    }

    #[inline(always)]
    pub fn get_parent(&self, node: u32) -> u32 {
        self.arena.get_register(node, Field::Parent as u32)
    }

    #[inline(always)]
    pub fn is_leaf(&self, node: u32) -> bool {
        self.get_left(node) == SENTINEL && self.get_right(node) == SENTINEL
    }

    #[inline(always)]
    fn connect(&mut self, parent: u32, child: u32, dir: u32) {
        self.arena.connect(parent, child, dir, Field::Parent as u32);
    }

    #[inline(always)]
    fn child_dir(&self, parent: u32, child: u32) -> u32 {
        let left = self.get_left(parent);
        let right = self.get_right(parent);
        if child == left {
            assert!(self.get_parent(child) == parent);
            Field::Left as u32
        } else if child == right {
            assert!(self.get_parent(child) == parent);
            Field::Right as u32
        } else {
            panic!("Nodes are not connected");
        }
    }

    /// Rotates `parent_index` down in direction `dir`, promoting its
    /// `opposite(dir)` child. All four affected links (grandparent child
    /// slot, both rotated child slots, and the parent back-references) are
    /// updated as one step. Returns the promoted index, or None if there is
    /// no child to promote.
    fn rotate_dir(&mut self, parent_index: u32, dir: u32) -> Option<u32> {
        let grandparent_index = self.get_parent(parent_index);
        match FromPrimitive::from_u32(dir) {
            Some(Field::Left) | Some(Field::Right) => {}
            _ => return None,
        }
        let promoted_index = self.get_child(parent_index, opposite(dir));
        if promoted_index == SENTINEL {
            return None;
        }
        let child_index = self.get_child(promoted_index, dir);
        self.connect(promoted_index, parent_index, dir);
        self.connect(parent_index, child_index, opposite(dir));
        if grandparent_index != SENTINEL {
            if self.get_left(grandparent_index) == parent_index {
                self.connect(grandparent_index, promoted_index, Field::Left as u32);
            } else if self.get_right(grandparent_index) == parent_index {
                self.connect(grandparent_index, promoted_index, Field::Right as u32);
            } else {
                panic!("Nodes are not connected");
            }
        } else {
            self.arena
                .clear_register(promoted_index, Field::Parent as u32);
            self.root = promoted_index as u64;
        }
        Some(promoted_index)
    }

    /// Inserts `value`, returning the index of its node. Inserting a value
    /// already in the set is a structural no-op that returns the existing
    /// index. Returns None only when the arena is at capacity.
    pub fn insert(&mut self, value: V) -> Option<u32> {
        let mut reference_node = self.root as u32;
        if reference_node == SENTINEL {
            let node_index = self.arena.add_node(RBNode::new(value));
            self.color_black(node_index);
            self.root = node_index as u64;
            return Some(node_index);
        }
        loop {
            let ref_value = self.get_node(reference_node).value;
            let (target, dir) = if value < ref_value {
                (self.get_left(reference_node), Field::Left as u32)
            } else if value > ref_value {
                (self.get_right(reference_node), Field::Right as u32)
            } else {
                return Some(reference_node);
            };
            if target == SENTINEL {
                if self.len() >= self.capacity() {
                    return None;
                }
                let node_index = self.arena.add_node(RBNode::new(value));
                self.color_red(node_index);
                self.connect(reference_node, node_index, dir);
                self.fix_insert(node_index);
                return Some(node_index);
            }
            reference_node = target;
        }
    }

    /// Walks from a freshly attached red node toward the root, clearing any
    /// red-red violation. A red uncle recolors and ascends; a black (or
    /// absent) uncle is resolved with one or two rotations and the walk
    /// stops.
    fn fix_insert(&mut self, mut node: u32) {
        while self.is_red(self.get_parent(node)) {
            let mut parent = self.get_parent(node);
            let grandparent = self.get_parent(parent);
            if grandparent == SENTINEL {
                // red root, recolored on exit
                break;
            }
            let dir = self.child_dir(grandparent, parent);
            let uncle = self.get_child(grandparent, opposite(dir));
            if self.is_red(uncle) {
                self.color_black(uncle);
                self.color_black(parent);
                self.color_red(grandparent);
                node = grandparent;
            } else {
                if self.child_dir(parent, node) == opposite(dir) {
                    // zig-zag: straighten into a line before rotating the
                    // grandparent
                    self.rotate_dir(parent, dir);
                    node = parent;
                    parent = self.get_parent(node);
                }
                self.color_black(parent);
                self.color_red(grandparent);
                self.rotate_dir(grandparent, opposite(dir));
            }
        }
        self.color_black(self.root as u32);
    }

    /// Removes `value` and returns it, or None if it was not present.
    pub fn remove(&mut self, value: &V) -> Option<V> {
        let mut reference_node = self.root as u32;
        while reference_node != SENTINEL {
            let ref_value = self.get_node(reference_node).value;
            reference_node = if *value < ref_value {
                self.get_left(reference_node)
            } else if *value > ref_value {
                self.get_right(reference_node)
            } else {
                self.remove_index(reference_node);
                return Some(ref_value);
            };
        }
        None
    }

    fn remove_index(&mut self, node_index: u32) {
        let mut target = node_index;
        if self.get_left(target) != SENTINEL && self.get_right(target) != SENTINEL {
            // Two children: copy the in-order successor's value into place
            // and delete the successor instead, which has at most one child.
            // The found node's position and links are untouched.
            let successor = self.min_index(self.get_right(target));
            self.get_node_mut(target).value = self.get_node(successor).value;
            target = successor;
        }
        let child = if self.get_left(target) != SENTINEL {
            self.get_left(target)
        } else {
            self.get_right(target)
        };
        let parent = self.get_parent(target);
        let dir = if parent == SENTINEL {
            Field::Left as u32
        } else {
            self.child_dir(parent, target)
        };
        let deficient = self.is_black(target);
        self.transplant(target, child);
        self.arena.clear_register(target, Field::Left as u32);
        self.arena.clear_register(target, Field::Right as u32);
        self.arena.clear_register(target, Field::Parent as u32);
        self.arena.clear_register(target, COLOR);
        self.arena.remove_node(target);
        if deficient && self.root as u32 != SENTINEL {
            self.fix_remove(child, parent, dir);
        }
        self.color_black(self.root as u32);
    }

    /// Splices `source` (possibly SENTINEL) into `target`'s slot under
    /// `target`'s parent.
    #[inline(always)]
    fn transplant(&mut self, target: u32, source: u32) {
        let parent = self.get_parent(target);
        if parent == SENTINEL {
            self.root = source as u64;
            self.arena
                .set_register(source, SENTINEL, Field::Parent as u32);
            return;
        }
        let dir = self.child_dir(parent, target);
        self.connect(parent, source, dir);
    }

    /// Restores black-height after a black node was detached. `node` is the
    /// spliced-in child carrying the deficit and may be SENTINEL, which is
    /// why `parent` and the child slot `dir` ride along; `dir` is recomputed
    /// once the walk ascends to real nodes. Cases, keyed on the sibling's
    /// configuration: a red sibling is rotated down to expose a black one; a
    /// black sibling with black nephews recolors and propagates the deficit
    /// upward; a red close nephew is rotated up to expose a red distant
    /// nephew; a red distant nephew resolves the deficit with one rotation
    /// and the walk stops.
    fn fix_remove(&mut self, mut node: u32, mut parent: u32, mut dir: u32) {
        while parent != SENTINEL && self.is_black(node) {
            if node != SENTINEL {
                dir = self.child_dir(parent, node);
            }
            let mut sibling = self.get_child(parent, opposite(dir));
            if self.is_red(sibling) {
                self.color_black(sibling);
                self.color_red(parent);
                self.rotate_dir(parent, dir);
                sibling = self.get_child(parent, opposite(dir));
            }
            if self.is_black(self.get_left(sibling)) && self.is_black(self.get_right(sibling)) {
                self.color_red(sibling);
                node = parent;
                parent = self.get_parent(node);
            } else {
                if self.is_black(self.get_child(sibling, opposite(dir))) {
                    // red close nephew: rotate it up so the distant nephew
                    // becomes red
                    self.color_black(self.get_child(sibling, dir));
                    self.color_red(sibling);
                    self.rotate_dir(sibling, opposite(dir));
                    sibling = self.get_child(parent, opposite(dir));
                }
                if self.is_red(parent) {
                    self.color_red(sibling);
                } else {
                    self.color_black(sibling);
                }
                self.color_black(parent);
                self.color_black(self.get_child(sibling, opposite(dir)));
                self.rotate_dir(parent, dir);
                return;
            }
        }
        // a red carrier (or the root) absorbs the deficit
        self.color_black(node);
    }

    pub fn contains(&self, value: &V) -> bool {
        let mut reference_node = self.root as u32;
        while reference_node != SENTINEL {
            let ref_value = self.get_node(reference_node).value;
            reference_node = if *value < ref_value {
                self.get_left(reference_node)
            } else if *value > ref_value {
                self.get_right(reference_node)
            } else {
                return true;
            };
        }
        false
    }

    fn min_index(&self, index: u32) -> u32 {
        let mut node = index;
        while self.get_left(node) != SENTINEL {
            node = self.get_left(node);
        }
        node
    }

    fn max_index(&self, index: u32) -> u32 {
        let mut node = index;
        while self.get_right(node) != SENTINEL {
            node = self.get_right(node);
        }
        node
    }

    pub fn find_min(&self) -> Result<V, EmptyTreeError> {
        let root = self.root as u32;
        if root == SENTINEL {
            return Err(EmptyTreeError);
        }
        Ok(self.get_node(self.min_index(root)).value)
    }

    pub fn find_max(&self) -> Result<V, EmptyTreeError> {
        let root = self.root as u32;
        if root == SENTINEL {
            return Err(EmptyTreeError);
        }
        Ok(self.get_node(self.max_index(root)).value)
    }

    /// Longest root-to-leaf path, counted in nodes. Diagnostic; the
    /// red-black invariants bound it by `2 * log2(len + 1)`.
    pub fn height(&self) -> usize {
        self.subtree_height(self.root as u32)
    }

    fn subtree_height(&self, node: u32) -> usize {
        if node == SENTINEL {
            return 0;
        }
        1 + self
            .subtree_height(self.get_left(node))
            .max(self.subtree_height(self.get_right(node)))
    }

    /// Verification oracle for tests: recomputes black-height over every
    /// path, scans for red-red edges, and checks the black root, BST
    /// ordering, parent back-links, and that `len()` matches the reachable
    /// node count. Never called by the operational paths.
    pub fn follows_rules(&self) -> bool {
        let root = self.root as u32;
        if root == SENTINEL {
            return self.len() == 0;
        }
        if self.is_red(root) || self.get_parent(root) != SENTINEL {
            return false;
        }
        let node_count = match self.audit_subtree(root) {
            Some((_black_height, count)) => count,
            None => return false,
        };
        if node_count != self.len() {
            return false;
        }
        let mut previous: Option<V> = None;
        for value in self.iter() {
            if let Some(prev) = previous {
                if !(prev < *value) {
                    return false;
                }
            }
            previous = Some(*value);
        }
        true
    }

    /// Returns (black-height, node count) of the subtree, or None on any
    /// violation. Absent children count as one black node.
    fn audit_subtree(&self, node: u32) -> Option<(usize, usize)> {
        if node == SENTINEL {
            return Some((1, 0));
        }
        let left = self.get_left(node);
        let right = self.get_right(node);
        if left != SENTINEL && self.get_parent(left) != node {
            return None;
        }
        if right != SENTINEL && self.get_parent(right) != node {
            return None;
        }
        if self.is_red(node) && (self.is_red(left) || self.is_red(right)) {
            return None;
        }
        let (left_height, left_count) = self.audit_subtree(left)?;
        let (right_height, right_count) = self.audit_subtree(right)?;
        if left_height != right_height {
            return None;
        }
        let own_black = if self.is_black(node) { 1 } else { 0 };
        Some((left_height + own_black, left_count + right_count + 1))
    }

    pub fn iter(&self) -> RedBlackTreeIterator<'_, V, MAX_SIZE> {
        RedBlackTreeIterator::<V, MAX_SIZE> {
            tree: self,
            stack: vec![],
            node: self.root as u32,
        }
    }
}

impl<V: PartialOrd + Copy + Clone + Default + Pod + Zeroable + Debug, const MAX_SIZE: usize>
    RedBlackTree<V, MAX_SIZE>
{
    /// Renders the tree for debugging: right subtree above, left below, two
    /// spaces of indent per level, one value per line, red nodes in red,
    /// `"<empty>"` for an empty tree. Not a stable format.
    pub fn pretty_string(&self) -> String {
        let root = self.root as u32;
        if root == SENTINEL {
            return "<empty>".to_string();
        }
        let mut out = String::new();
        self.write_subtree(root, 0, &mut out);
        out
    }

    fn write_subtree(&self, node: u32, depth: usize, out: &mut String) {
        let right = self.get_right(node);
        if right != SENTINEL {
            self.write_subtree(right, depth + 1, out);
        }
        let label = format!("{:?}", self.get_node(node).value);
        let label = if self.is_red(node) {
            label.red().to_string()
        } else {
            label
        };
        out.push_str(&"  ".repeat(depth));
        out.push_str(&label);
        out.push('\n');
        let left = self.get_left(node);
        if left != SENTINEL {
            self.write_subtree(left, depth + 1, out);
        }
    }
}

/// In-order traversal with an explicit stack bounded by the tree height.
pub struct RedBlackTreeIterator<
    'a,
    V: PartialOrd + Copy + Clone + Default + Pod + Zeroable,
    const MAX_SIZE: usize,
> {
    tree: &'a RedBlackTree<V, MAX_SIZE>,
    stack: Vec<u32>,
    node: u32,
}

impl<'a, V: PartialOrd + Copy + Clone + Default + Pod + Zeroable, const MAX_SIZE: usize> Iterator
    for RedBlackTreeIterator<'a, V, MAX_SIZE>
{
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.stack.is_empty() || self.node != SENTINEL {
            if self.node != SENTINEL {
                self.stack.push(self.node);
                self.node = self.tree.get_left(self.node);
            } else {
                self.node = self.stack.pop().unwrap();
                let node = self.tree.get_node(self.node);
                self.node = self.tree.get_right(self.node);
                return Some(&node.value);
            }
        }
        None
    }
}
