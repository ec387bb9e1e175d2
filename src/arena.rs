//! Block-based arena handing out typed ids instead of references.
//!
//! Storage grows one fixed-capacity block at a time and is never freed per item. `reset` empties
//! every block but keeps its allocation, so the next round of `alloc` calls reuses the same memory.
//! Every reset bumps a generation counter carried by each [`Id`], and looking up an id from an
//! older generation panics.

use std::marker::PhantomData;
use std::hash::{Hash, Hasher};
use std::ops::Index;
use std::fmt::{self, Debug, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    InvalidArgument { block_capacity: usize },
}

impl Display for ArenaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ArenaError::InvalidArgument { block_capacity } => {
                write!(f, "arena block capacity must be > 0, got {}", block_capacity)
            }
        }
    }
}

impl std::error::Error for ArenaError {}

pub struct Id<T> {
    block: u32,
    slot: u32,
    generation: u32,
    _ty: PhantomData<T>
}

// #[derive] bug means we have to impl these manually because of PhantomData
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.block == other.block && self.slot == other.slot && self.generation == other.generation
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.block.hash(state);
        self.slot.hash(state);
        self.generation.hash(state);
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({}:{}@{})", self.block, self.slot, self.generation)
    }
}

impl<T> Id<T> {
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

pub struct Arena<T> {
    blocks: Vec<Vec<T>>,
    block_capacity: usize,
    current: Option<usize>,
    generation: u32,
}

impl<T> Arena<T> {
    /// Doesn't allocate; the first block is created by the first `alloc`.
    pub fn new(block_capacity: usize) -> Result<Self, ArenaError> {
        if block_capacity == 0 {
            return Err(ArenaError::InvalidArgument { block_capacity });
        }
        Ok(Self {
            blocks: Vec::new(),
            block_capacity,
            current: None,
            generation: 0,
        })
    }

    pub fn alloc(&mut self, item: T) -> Id<T> {
        let block_idx = match self.current {
            Some(idx) if self.blocks[idx].len() < self.block_capacity => idx,
            Some(idx) => idx + 1,
            None => 0,
        };

        // blocks left over from before a reset are reused before allocating a fresh one
        if block_idx == self.blocks.len() {
            self.blocks.push(Vec::with_capacity(self.block_capacity));
        }
        self.current = Some(block_idx);

        let block = &mut self.blocks[block_idx];
        let slot = block.len();
        block.push(item);

        Id {
            block: block_idx as u32,
            slot: slot as u32,
            generation: self.generation,
            _ty: PhantomData
        }
    }

    /// Drops every item and invalidates all outstanding ids. Block memory is kept for reuse.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.clear();
        }
        self.current = if self.blocks.is_empty() { None } else { Some(0) };
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn get(&self, id: Id<T>) -> &T {
        assert_eq!(
            id.generation, self.generation,
            "stale arena id {:?}, arena is at generation {}", id, self.generation
        );
        &self.blocks[id.block as usize][id.slot as usize]
    }

    pub fn len(&self) -> usize {
        self.blocks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(Vec::is_empty)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_capacity(&self) -> usize {
        self.block_capacity
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Index<Id<T>> for Arena<T> {
    type Output = T;

    fn index(&self, index: Id<T>) -> &Self::Output {
        self.get(index)
    }
}
