use std::fmt::{self, Display, Formatter};

/// Index into a [Slab], tagged with the generation of the slot it was issued for.
///
/// Once the item is removed, the slot can be reused, but old indexes stay dead because
/// the generation no longer matches. This is what lets stale events and handles be detected
/// after structural edits.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SlabIndex {
    slot: u32,
    generation: u32,
}
impl SlabIndex {
    /// Returns the slot of the index, slots are dense and can be used to index side tables.
    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}
impl Display for SlabIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot, self.generation)
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    generation: u32,
    item: Option<T>,
}

/// Generational slab allocator. Stores items of the same type and reuses removed slots.
///
/// # Example
///
/// ```
/// # use logicprop::data_structures::Slab;
/// let mut s = Slab::new();
///
/// let index = s.insert(5);
/// assert_eq!(s.get(index), Some(&5));
///
/// assert_eq!(s.remove(index), Some(5));
/// assert_eq!(s.get(index), None);
///
/// // The slot is reused but the old index stays dead.
/// let new_index = s.insert(6);
/// assert_eq!(new_index.slot(), index.slot());
/// assert_eq!(s.get(index), None);
/// ```
#[derive(Debug, Clone)]
pub struct Slab<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
}
impl<T> Slab<T> {
    /// Returns an empty [Slab].
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Inserts an item into the slab and returns its index.
    ///
    /// Will reuse an empty slot if one is available.
    pub fn insert(&mut self, item: T) -> SlabIndex {
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.entries[slot as usize];
            entry.generation = entry.generation.wrapping_add(1);
            entry.item = Some(item);
            SlabIndex {
                slot,
                generation: entry.generation,
            }
        } else {
            let slot = self.entries.len() as u32;
            self.entries.push(Entry {
                generation: 0,
                item: Some(item),
            });
            SlabIndex {
                slot,
                generation: 0,
            }
        }
    }

    fn entry(&self, index: SlabIndex) -> Option<&Entry<T>> {
        self.entries
            .get(index.slot())
            .filter(|e| e.generation == index.generation)
    }

    /// Return a reference to the item at `index`.
    ///
    /// Returns [None] if `index` has been removed.
    pub fn get(&self, index: SlabIndex) -> Option<&T> {
        self.entry(index)?.item.as_ref()
    }

    /// Returns a mutable reference to the item at `index`.
    ///
    /// Returns [None] if `index` has been removed.
    pub fn get_mut(&mut self, index: SlabIndex) -> Option<&mut T> {
        self.entries
            .get_mut(index.slot())
            .filter(|e| e.generation == index.generation)?
            .item
            .as_mut()
    }

    /// Returns true if `index` points to a live item.
    pub fn contains(&self, index: SlabIndex) -> bool {
        self.get(index).is_some()
    }

    /// Removes an item from the Slab and returns it.
    ///
    /// Returns [None] if `index` has already been removed.
    pub fn remove(&mut self, index: SlabIndex) -> Option<T> {
        let entry = self
            .entries
            .get_mut(index.slot())
            .filter(|e| e.generation == index.generation)?;
        let item = entry.item.take()?;
        self.free.push(index.slot);
        Some(item)
    }

    /// Returns the number of items in the slab.
    ///
    /// This is different from the number of allocated slots in the slab, see [Slab::total_len]
    pub fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    /// Returns true if the number of items in the slab is 0.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of allocated slots in the slab, some of them could be empty.
    pub fn total_len(&self) -> usize {
        self.entries.len()
    }

    /// Returns an iterator over pairs of ```(SlabIndex, [&T])``` in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlabIndex, &T)> {
        self.entries.iter().enumerate().filter_map(|(slot, e)| {
            let index = SlabIndex {
                slot: slot as u32,
                generation: e.generation,
            };
            e.item.as_ref().map(|item| (index, item))
        })
    }

    /// Returns an iterator over the live indexes in slot order.
    pub fn indexes(&self) -> impl Iterator<Item = SlabIndex> + '_ {
        self.iter().map(|(index, _)| index)
    }
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self::new()
    }
}
