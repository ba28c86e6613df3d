use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::ops::Index;
use core::ops::IndexMut;

use crate::error::InitError;

/// A stable handle to one slot of an [`ItemPool`].
///
/// Handles are plain slot indices, so they stay valid for as long as the slot
/// is checked out, no matter which structure currently links it. A handle is
/// only meaningful for the pool (or table) that issued it, and every handle is
/// invalidated by [`ItemPool::reset`] and
/// [`HashTable::clear`](crate::HashTable::clear).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemRef(u32);

impl ItemRef {
    /// Returns the slot index this handle refers to.
    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The role a slot currently plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// On the free list, available to [`ItemPool::acquire`].
    Free,
    /// Checked out to the caller and linked into nothing.
    Detached,
    /// Linked into a bucket chain of a [`HashTable`](crate::HashTable).
    Chained,
}

/// Intrusive header of a slot.
///
/// The free list and the bucket chains share this header, so a slot can only
/// ever be a member of one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    Free {
        next: Option<ItemRef>,
    },
    Detached,
    Chained {
        prev: Option<ItemRef>,
        next: Option<ItemRef>,
    },
}

pub(crate) struct Slot<T> {
    link: Link,
    payload: T,
}

/// A fixed-capacity pool of item slots distributed through a free list.
///
/// All slots are allocated up front by [`ItemPool::new`]; [`acquire`] and
/// [`release`] only move slots on and off the free list and never touch the
/// allocator. The free list is a LIFO stack, so the most recently released
/// slot is the next one handed out.
///
/// Payloads are initialized to `T::default()` once at construction and again
/// on [`reset`]. Acquiring a slot does *not* reset its payload: whatever the
/// previous holder left behind is still there until overwritten.
///
/// [`acquire`]: ItemPool::acquire
/// [`release`]: ItemPool::release
/// [`reset`]: ItemPool::reset
///
/// ## Example
///
/// ```rust
/// use slot_hash::ItemPool;
///
/// let mut pool: ItemPool<u32> = ItemPool::new(2).unwrap();
/// let a = pool.acquire().unwrap();
/// let b = pool.acquire().unwrap();
/// assert!(pool.acquire().is_none());
///
/// pool[a] = 7;
/// pool.release(a);
/// let c = pool.acquire().unwrap();
/// assert_eq!(c, a);
/// assert_eq!(pool[c], 7);
/// # let _ = b;
/// ```
pub struct ItemPool<T> {
    slots: Box<[Slot<T>]>,
    free_head: Option<ItemRef>,
    free: usize,
}

impl<T> Debug for ItemPool<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ItemPool")
            .field("capacity", &self.capacity())
            .field("free", &self.free)
            .field("free_head", &self.free_head)
            .field("item_size", &self.item_size())
            .finish()
    }
}

impl<T: Default> ItemPool<T> {
    /// Allocates a pool of `capacity` slots and threads them onto the free
    /// list in slot order.
    ///
    /// Returns [`InitError::AllocationFailure`] if the slot block cannot be
    /// allocated.
    pub fn new(capacity: u32) -> Result<Self, InitError> {
        let capacity = capacity as usize;
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| InitError::AllocationFailure)?;
        slots.extend((0..capacity).map(|_| Slot {
            link: Link::Detached,
            payload: T::default(),
        }));

        let mut pool = Self {
            slots: slots.into_boxed_slice(),
            free_head: None,
            free: 0,
        };
        pool.thread_free_list();
        Ok(pool)
    }

    /// Returns every slot to the free list and resets every payload to
    /// `T::default()`, without reallocating.
    ///
    /// Every [`ItemRef`] issued before the reset is invalidated.
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.payload = T::default();
        }
        self.thread_free_list();
    }
}

impl<T> ItemPool<T> {
    fn thread_free_list(&mut self) {
        let len = self.slots.len();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let next = index + 1;
            slot.link = Link::Free {
                next: (next < len).then(|| ItemRef(next as u32)),
            };
        }

        self.free_head = (len > 0).then_some(ItemRef(0));
        self.free = len;
    }

    /// Takes a slot off the free list.
    ///
    /// Returns `None` when every slot is checked out or linked into a table.
    /// The payload is left as the previous holder wrote it.
    #[inline]
    pub fn acquire(&mut self) -> Option<ItemRef> {
        let item = self.free_head?;
        let slot = &mut self.slots[item.index()];
        debug_assert!(
            matches!(slot.link, Link::Free { .. }),
            "free list head {item:?} is {:?}",
            slot.link
        );

        self.free_head = match slot.link {
            Link::Free { next } => next,
            _ => None,
        };
        slot.link = Link::Detached;
        self.free -= 1;

        Some(item)
    }

    /// Pushes a slot back onto the free list.
    ///
    /// The slot must be checked out: acquired from this pool and not linked
    /// into a chain. Releasing a slot twice, or releasing one that is still
    /// chained, trips a debug assertion; in release builds it leaves the pool
    /// and any table over it in an unspecified (but memory-safe) state.
    ///
    /// # Panics
    ///
    /// Panics if `item` is out of range for this pool.
    #[inline]
    pub fn release(&mut self, item: ItemRef) {
        let slot = &mut self.slots[item.index()];
        debug_assert!(
            slot.link == Link::Detached,
            "released {item:?} while {:?}",
            slot.link
        );

        slot.link = Link::Free {
            next: self.free_head,
        };
        self.free_head = Some(item);
        self.free += 1;
    }

    /// Returns a reference to the payload of `item`.
    ///
    /// # Panics
    ///
    /// Panics if `item` is out of range for this pool.
    #[inline]
    pub fn get(&self, item: ItemRef) -> &T {
        &self.slots[item.index()].payload
    }

    /// Returns a mutable reference to the payload of `item`.
    ///
    /// # Panics
    ///
    /// Panics if `item` is out of range for this pool.
    #[inline]
    pub fn get_mut(&mut self, item: ItemRef) -> &mut T {
        &mut self.slots[item.index()].payload
    }

    /// Returns the role `item` currently plays.
    ///
    /// # Panics
    ///
    /// Panics if `item` is out of range for this pool.
    pub fn state(&self, item: ItemRef) -> SlotState {
        match self.slots[item.index()].link {
            Link::Free { .. } => SlotState::Free,
            Link::Detached => SlotState::Detached,
            Link::Chained { .. } => SlotState::Chained,
        }
    }

    /// Returns the total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of slots currently on the free list.
    pub fn free_count(&self) -> usize {
        self.free
    }

    /// Returns the size in bytes of one slot, header included.
    pub fn item_size(&self) -> usize {
        core::mem::size_of::<Slot<T>>()
    }

    #[inline(always)]
    pub(crate) fn link(&self, item: ItemRef) -> Link {
        self.slots[item.index()].link
    }

    #[inline(always)]
    pub(crate) fn set_link(&mut self, item: ItemRef, link: Link) {
        self.slots[item.index()].link = link;
    }

    #[inline(always)]
    pub(crate) fn set_chain_prev(&mut self, item: ItemRef, new_prev: Option<ItemRef>) {
        let link = &mut self.slots[item.index()].link;
        debug_assert!(matches!(link, Link::Chained { .. }), "{item:?} is {link:?}");
        if let Link::Chained { prev, .. } = link {
            *prev = new_prev;
        }
    }

    #[inline(always)]
    pub(crate) fn set_chain_next(&mut self, item: ItemRef, new_next: Option<ItemRef>) {
        let link = &mut self.slots[item.index()].link;
        debug_assert!(matches!(link, Link::Chained { .. }), "{item:?} is {link:?}");
        if let Link::Chained { next, .. } = link {
            *next = new_next;
        }
    }
}

impl<T> Index<ItemRef> for ItemPool<T> {
    type Output = T;

    fn index(&self, item: ItemRef) -> &T {
        self.get(item)
    }
}

impl<T> IndexMut<ItemRef> for ItemPool<T> {
    fn index_mut(&mut self, item: ItemRef) -> &mut T {
        self.get_mut(item)
    }
}
