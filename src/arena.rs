use bytemuck::{Pod, Zeroable};
use num_derive::FromPrimitive;
use std::mem::{align_of, size_of};

/// Register layout of a tree node:
/// 0 - left child index
/// 1 - right child index
/// 2 - parent index
/// 3 - node color
#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive)]
pub enum Field {
    Left = 0,
    Right = 1,
    Parent = 2,
    Color = 3,
}

/// Index 0 never holds a live node; it stands in for the absence of a node.
/// Its registers stay zeroed, so reads through it return SENTINEL (and color
/// Black) without special casing.
pub const SENTINEL: u32 = 0;

pub trait FromSlice {
    fn new_from_slice(data: &mut [u8]) -> &mut Self;
}

pub trait ZeroCopy: Pod {
    fn load_mut_bytes(data: &mut [u8]) -> Option<&mut Self> {
        let size = size_of::<Self>();
        bytemuck::try_from_bytes_mut(&mut data[..size]).ok()
    }

    fn load_bytes(data: &[u8]) -> Option<&Self> {
        let size = size_of::<Self>();
        bytemuck::try_from_bytes(&data[..size]).ok()
    }
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ArenaNode<T: Copy + Clone + Pod + Zeroable + Default, const NUM_REGISTERS: usize> {
    /// Link registers. Register 0 is reused as the free-list link while the
    /// slot is unallocated, so NUM_REGISTERS must be at least 1.
    registers: [u32; NUM_REGISTERS],
    value: T,
}

impl<T: Copy + Clone + Pod + Zeroable + Default, const NUM_REGISTERS: usize> Default
    for ArenaNode<T, NUM_REGISTERS>
{
    fn default() -> Self {
        assert!(NUM_REGISTERS >= 1);
        Self {
            registers: [SENTINEL; NUM_REGISTERS],
            value: T::default(),
        }
    }
}

impl<T: Copy + Clone + Pod + Zeroable + Default, const NUM_REGISTERS: usize>
    ArenaNode<T, NUM_REGISTERS>
{
    #[inline(always)]
    pub(crate) fn get_free_list_register(&self) -> u32 {
        self.registers[0]
    }

    #[inline(always)]
    pub(crate) fn set_free_list_register(&mut self, v: u32) {
        self.registers[0] = v;
    }

    #[inline(always)]
    pub fn get_register(&self, r: usize) -> u32 {
        self.registers[r]
    }

    #[inline(always)]
    pub fn set_register(&mut self, r: usize, v: u32) {
        self.registers[r] = v;
    }

    #[inline(always)]
    pub fn set_value(&mut self, v: T) {
        self.value = v;
    }

    #[inline(always)]
    pub fn get_value(&self) -> &T {
        &self.value
    }

    #[inline(always)]
    pub fn get_value_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// Fixed-capacity slab of nodes addressed by u32 index. Slot 0 is the
/// SENTINEL, so at most `MAX_SIZE - 1` nodes are live at once.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct NodeArena<
    T: Default + Copy + Clone + Pod + Zeroable,
    const MAX_SIZE: usize,
    const NUM_REGISTERS: usize,
> {
    /// Number of live nodes.
    pub size: u64,
    /// Highest slot ever handed out. Until this reaches `MAX_SIZE`,
    /// allocation bumps; afterwards every allocation comes off the free list.
    bump_index: u32,
    /// Head of the free list, a stack of recycled slot indices threaded
    /// through register 0 of each unallocated node.
    free_list_head: u32,
    pub nodes: [ArenaNode<T, NUM_REGISTERS>; MAX_SIZE],
}

unsafe impl<
        T: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
        const NUM_REGISTERS: usize,
    > Zeroable for NodeArena<T, MAX_SIZE, NUM_REGISTERS>
{
}
unsafe impl<
        T: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
        const NUM_REGISTERS: usize,
    > Pod for NodeArena<T, MAX_SIZE, NUM_REGISTERS>
{
}

impl<
        T: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
        const NUM_REGISTERS: usize,
    > ZeroCopy for NodeArena<T, MAX_SIZE, NUM_REGISTERS>
{
}

impl<
        T: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
        const NUM_REGISTERS: usize,
    > Default for NodeArena<T, MAX_SIZE, NUM_REGISTERS>
{
    fn default() -> Self {
        assert!(NUM_REGISTERS >= 1);
        let arena = NodeArena {
            size: 0,
            bump_index: 1,
            free_list_head: 1,
            nodes: [ArenaNode::<T, NUM_REGISTERS>::default(); MAX_SIZE],
        };
        arena.assert_proper_alignment();
        arena
    }
}

impl<
        T: Default + Copy + Clone + Pod + Zeroable,
        const MAX_SIZE: usize,
        const NUM_REGISTERS: usize,
    > NodeArena<T, MAX_SIZE, NUM_REGISTERS>
{
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    fn assert_proper_alignment(&self) {
        let reg_size = size_of::<u32>() * NUM_REGISTERS;
        let self_ptr = std::slice::from_ref(self).as_ptr() as usize;
        let node_ptr = std::slice::from_ref(&self.nodes).as_ptr() as usize;
        let self_align = align_of::<Self>();
        let t_index = node_ptr + reg_size;
        let t_align = align_of::<T>();
        let t_size = size_of::<T>();
        assert!(
            self_ptr % self_align == 0,
            "NodeArena address {} is not a multiple of the struct alignment ({})",
            self_ptr,
            self_align,
        );
        assert!(
            t_size % t_align == 0,
            "Size of T ({}) is not a multiple of the alignment of T ({})",
            t_size,
            t_align,
        );
        assert!(
            t_size == 0 || t_size >= self_align,
            "Size of T ({}) must be >= the alignment of NodeArena ({})",
            t_size,
            self_align,
        );
        assert!(node_ptr == self_ptr + 16, "Nodes are misaligned");
        assert!(t_index % t_align == 0, "First index of T is misaligned");
        assert!(
            (t_index + t_size + reg_size) % t_align == 0,
            "Subsequent indices of T are misaligned"
        );
    }

    /// Used when overlaying a zeroed byte buffer; an owned arena is set up by
    /// `Default` instead.
    pub fn initialize(&mut self) {
        assert!(NUM_REGISTERS >= 1);
        self.assert_proper_alignment();
        if self.size == 0 && self.bump_index == 0 && self.free_list_head == 0 {
            self.bump_index = 1;
            self.free_list_head = 1;
        } else {
            panic!("Cannot reinitialize NodeArena");
        }
    }

    #[inline(always)]
    pub fn get(&self, i: u32) -> &ArenaNode<T, NUM_REGISTERS> {
        &self.nodes[i as usize]
    }

    #[inline(always)]
    pub fn get_mut(&mut self, i: u32) -> &mut ArenaNode<T, NUM_REGISTERS> {
        &mut self.nodes[i as usize]
    }

    /// Allocates a slot for `node` and returns its index. Panics when the
    /// arena is full; callers are expected to check capacity first.
    pub fn add_node(&mut self, node: T) -> u32 {
        let i = self.free_list_head;
        if self.free_list_head == self.bump_index {
            if self.bump_index == MAX_SIZE as u32 {
                panic!("Arena is full, size {}", self.size);
            }
            self.bump_index += 1;
            self.free_list_head = self.bump_index;
        } else {
            self.free_list_head = self.get(i).get_free_list_register();
            self.get_mut(i).set_free_list_register(SENTINEL);
        }
        self.get_mut(i).set_value(node);
        self.size += 1;
        i
    }

    /// Returns slot `i` to the free list. All registers of the node MUST be
    /// cleared before calling this, since register 0 becomes the free-list
    /// link and recycled slots must read as fully disconnected.
    pub fn remove_node(&mut self, i: u32) -> Option<&T> {
        if i == SENTINEL {
            return None;
        }
        let free_list_head = self.free_list_head;
        self.get_mut(i).set_free_list_register(free_list_head);
        self.free_list_head = i;
        self.size -= 1;
        Some(self.get(i).get_value())
    }

    /// Writes the edge `i -(r_i)-> j` and the back edge `j -(r_j)-> i`,
    /// skipping whichever endpoint is the SENTINEL.
    #[inline(always)]
    pub fn connect(&mut self, i: u32, j: u32, r_i: u32, r_j: u32) {
        if i != SENTINEL {
            self.get_mut(i).set_register(r_i as usize, j);
        }
        if j != SENTINEL {
            self.get_mut(j).set_register(r_j as usize, i);
        }
    }

    #[inline(always)]
    pub fn clear_register(&mut self, i: u32, r_i: u32) {
        self.get_mut(i).set_register(r_i as usize, SENTINEL);
    }

    #[inline(always)]
    pub fn set_register(&mut self, i: u32, value: u32, r_i: u32) {
        if i != SENTINEL {
            self.get_mut(i).set_register(r_i as usize, value);
        }
    }

    #[inline(always)]
    pub fn get_register(&self, i: u32, r_i: u32) -> u32 {
        self.get(i).get_register(r_i as usize)
    }
}
