//! A fixed-capacity, intrusive chained hash table.
//!
//! The table never computes hashes and never allocates after construction.
//! Callers take a slot from the table's pool with [`HashTable::acquire`],
//! fill in its payload, and link it into a bucket chain with
//! [`HashTable::insert`] under a hash code they computed themselves.
//! [`HashTable::delete`] unlinks an item but hands the slot back to the
//! caller instead of the pool, so an item can be moved to another chain
//! without a round trip through the free list.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::ops::Index;
use core::ops::IndexMut;

use crate::error::InitError;
use crate::pool::ItemPool;
use crate::pool::ItemRef;
use crate::pool::Link;
use crate::pool::SlotState;

/// Compares a stored payload against a lookup key.
///
/// The table owns one value implementing this trait and consults it for every
/// chain member it visits during [`HashTable::find`] and
/// [`HashTable::delete`]. Closures of the form `Fn(&T, &K) -> bool` implement
/// it automatically.
///
/// # Examples
///
/// ```rust
/// use slot_hash::KeyEq;
///
/// #[derive(Default)]
/// struct Conn {
///     port: u16,
/// }
///
/// struct ByPort;
///
/// impl KeyEq<Conn, u16> for ByPort {
///     fn key_eq(&self, item: &Conn, key: &u16) -> bool {
///         item.port == *key
///     }
/// }
///
/// assert!(ByPort.key_eq(&Conn { port: 80 }, &80));
/// ```
pub trait KeyEq<T, K: ?Sized> {
    /// Returns `true` if `item` is stored under `key`.
    fn key_eq(&self, item: &T, key: &K) -> bool;
}

impl<T, K, F> KeyEq<T, K> for F
where
    K: ?Sized,
    F: Fn(&T, &K) -> bool,
{
    #[inline(always)]
    fn key_eq(&self, item: &T, key: &K) -> bool {
        self(item, key)
    }
}

/// Number of chain heads for `capacity` items at `load_factor`.
///
/// `floor(capacity / load_factor)`, computed in `f64`. Never zero, so bucket
/// selection by modulo is always defined.
fn bucket_count_for(capacity: u32, load_factor: f32) -> Result<usize, InitError> {
    if !(load_factor > 0.0 && load_factor <= 1.0) {
        return Err(InitError::InvalidLoadFactor);
    }

    // Float to int casts saturate, so an absurd ratio fails at allocation.
    let count = (f64::from(capacity) / f64::from(load_factor)) as usize;
    Ok(count.max(1))
}

fn alloc_buckets(count: usize) -> Result<Box<[Option<ItemRef>]>, InitError> {
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(count)
        .map_err(|_| InitError::AllocationFailure)?;
    buckets.resize(count, None);
    Ok(buckets.into_boxed_slice())
}

/// Chain-length statistics for tuning the load factor.
///
/// Requires the `stats` feature.
#[cfg(feature = "stats")]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of items currently linked into chains
    pub populated: usize,
    /// Total number of item slots
    pub capacity: usize,
    /// Number of chain heads
    pub bucket_count: usize,
    /// Number of buckets with a non-empty chain
    pub used_buckets: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// Number of slots on the free list
    pub free_slots: usize,
    /// Average chain length over all buckets (populated / bucket_count)
    pub load: f64,
    /// Fraction of buckets with a non-empty chain
    pub bucket_utilization: f64,
    /// Bytes held by the bucket array and the item block
    pub total_bytes: usize,
}

#[cfg(feature = "stats")]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% of slots linked)",
            self.populated,
            self.capacity,
            if self.capacity == 0 {
                0.0
            } else {
                self.populated as f64 / self.capacity as f64 * 100.0
            }
        );
        println!(
            "Buckets: {}/{} used ({:.2}% utilization)",
            self.used_buckets,
            self.bucket_count,
            self.bucket_utilization * 100.0
        );
        println!(
            "Chains: {:.3} average, {} longest",
            self.load, self.longest_chain
        );
        println!("Free slots: {}", self.free_slots);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// A fixed-capacity hash table chaining pooled items into buckets.
///
/// `HashTable<T, E>` owns a pool of `capacity` slots holding payloads of type
/// `T`, an array of `floor(capacity / load_factor)` bucket chains, and an
/// equality capability `E` used to match stored payloads against lookup keys.
///
/// ## Performance Characteristics
///
/// - **Lookup**: O(length of the chain for the hash code).
/// - **Insert**: O(1), always at the head of the chain.
/// - **Delete**: O(chain length) for the lookup, O(1) for the unlink.
/// - **Memory**: fixed at construction; one `Option<ItemRef>` per bucket and
///   one link header per slot.
///
/// Bucket selection is `hash_code % bucket_count` with no further mixing, so
/// chain lengths are only as good as the caller's hash function.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hasher;
/// #
/// # use slot_hash::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     hasher.write_u64(id);
/// #     hasher.finish()
/// # }
/// #
/// #[derive(Default)]
/// struct Session {
///     id: u64,
///     user: String,
/// }
///
/// let mut table =
///     HashTable::<Session, _>::new(128, 0.75, |s: &Session, id: &u64| s.id == *id).unwrap();
///
/// let item = table.acquire().expect("pool exhausted");
/// table[item] = Session {
///     id: 7,
///     user: "alice".to_string(),
/// };
/// table.insert(hash_id(7), item);
///
/// let found = table.find(hash_id(7), &7).unwrap();
/// assert_eq!(table[found].user, "alice");
///
/// let removed = table.delete(hash_id(7), &7).unwrap();
/// table.release(removed);
/// assert!(table.find(hash_id(7), &7).is_none());
/// ```
pub struct HashTable<T, E> {
    pool: ItemPool<T>,
    buckets: Box<[Option<ItemRef>]>,
    populated: usize,
    load_factor: f32,
    equal: E,
}

impl<T, E> Debug for HashTable<T, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("populated", &self.populated)
            .field("capacity", &self.capacity())
            .field("bucket_count", &self.buckets.len())
            .field("free", &self.pool.free_count())
            .field("item_size", &self.item_size())
            .finish()
    }
}

impl<T: Default, E> HashTable<T, E> {
    /// Creates a table with `capacity` item slots and
    /// `floor(capacity / load_factor)` buckets.
    ///
    /// Every payload starts out as `T::default()`.
    ///
    /// # Errors
    ///
    /// - [`InitError::InvalidLoadFactor`] if `load_factor` is not in `(0, 1]`.
    /// - [`InitError::AllocationFailure`] if the bucket array or the item block
    ///   cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use slot_hash::HashTable;
    ///
    /// let table = HashTable::<u64, _>::new(4, 0.5, |a: &u64, b: &u64| a == b).unwrap();
    /// assert_eq!(table.capacity(), 4);
    /// assert_eq!(table.bucket_count(), 8);
    /// ```
    pub fn new(capacity: u32, load_factor: f32, equal: E) -> Result<Self, InitError> {
        let bucket_count = bucket_count_for(capacity, load_factor).inspect_err(|_| {
            debug_event!("rejected load factor {load_factor} for capacity {capacity}");
        })?;

        let buckets = alloc_buckets(bucket_count).inspect_err(|_| {
            debug_event!("failed to allocate {bucket_count} buckets");
        })?;
        let pool = ItemPool::new(capacity).inspect_err(|_| {
            debug_event!("failed to allocate {capacity} item slots");
        })?;

        debug_event!(
            "created table: capacity={} buckets={} item_size={}",
            capacity,
            bucket_count,
            pool.item_size()
        );

        Ok(Self {
            pool,
            buckets,
            populated: 0,
            load_factor,
            equal,
        })
    }

    /// Empties every chain and returns every slot to the pool.
    ///
    /// Payloads are reset to `T::default()` and the free list is rebuilt over
    /// the whole block; nothing is reallocated. Every [`ItemRef`] issued
    /// before the call is invalidated, including ones the caller had checked
    /// out but not inserted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use slot_hash::HashTable;
    ///
    /// let mut table = HashTable::<u64, _>::new(2, 1.0, |a: &u64, b: &u64| a == b).unwrap();
    /// let item = table.acquire().unwrap();
    /// table[item] = 5;
    /// table.insert(5, item);
    /// let _checked_out = table.acquire().unwrap();
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.free_count(), 2);
    /// assert!(table.find(5, &5).is_none());
    /// ```
    pub fn clear(&mut self) {
        self.pool.reset();
        self.buckets.fill(None);
        self.populated = 0;

        debug_event!("cleared table: capacity={}", self.pool.capacity());
    }
}

impl<T, E> HashTable<T, E> {
    /// Takes a free slot from the pool.
    ///
    /// Returns `None` when the pool is exhausted. The slot's payload is
    /// whatever its previous holder left in it; overwrite it before inserting.
    #[inline]
    pub fn acquire(&mut self) -> Option<ItemRef> {
        let item = self.pool.acquire();
        if item.is_none() {
            trace_event!("pool exhausted: capacity={}", self.pool.capacity());
        }
        item
    }

    /// Returns a checked-out slot to the pool.
    ///
    /// `item` must not be linked into a chain: [`delete`] or [`detach`] it
    /// first. See [`ItemPool::release`] for what happens otherwise.
    ///
    /// [`delete`]: HashTable::delete
    /// [`detach`]: HashTable::detach
    #[inline]
    pub fn release(&mut self, item: ItemRef) {
        self.pool.release(item);
    }

    /// Finds the most recently inserted item that matches `key` in the chain
    /// for `hash_code`.
    ///
    /// Returns `None` if no chain member matches.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use slot_hash::HashTable;
    ///
    /// let mut table = HashTable::<u64, _>::new(8, 1.0, |a: &u64, b: &u64| a == b).unwrap();
    /// let item = table.acquire().unwrap();
    /// table[item] = 42;
    /// table.insert(42, item);
    ///
    /// assert_eq!(table.find(42, &42), Some(item));
    /// assert_eq!(table.find(42, &99), None);
    /// ```
    #[inline]
    pub fn find<K>(&self, hash_code: u64, key: &K) -> Option<ItemRef>
    where
        K: ?Sized,
        E: KeyEq<T, K>,
    {
        let mut cursor = self.buckets[self.bucket_of(hash_code)];
        while let Some(item) = cursor {
            if self.equal.key_eq(self.pool.get(item), key) {
                return Some(item);
            }
            cursor = self.chain_next(item);
        }

        None
    }

    /// Links `item` at the head of the chain for `hash_code`.
    ///
    /// There is no duplicate check: callers that need unique keys must
    /// [`find`] first. `item` must be checked out (acquired, or removed from a
    /// chain) and not already linked.
    ///
    /// [`find`]: HashTable::find
    #[inline]
    pub fn insert(&mut self, hash_code: u64, item: ItemRef) {
        debug_assert_eq!(
            self.pool.state(item),
            SlotState::Detached,
            "inserting {item:?} which is not checked out"
        );

        let bucket = self.bucket_of(hash_code);
        let head = self.buckets[bucket];
        self.pool.set_link(
            item,
            Link::Chained {
                prev: None,
                next: head,
            },
        );
        if let Some(head) = head {
            self.pool.set_chain_prev(head, Some(item));
        }
        self.buckets[bucket] = Some(item);
        self.populated += 1;
    }

    /// Unlinks the item matching `key` from the chain for `hash_code` and
    /// returns it.
    ///
    /// The slot is *not* returned to the pool. The caller decides whether to
    /// [`release`] it, reuse it, or [`insert`] it elsewhere. Returns `None` if
    /// no chain member matches.
    ///
    /// [`release`]: HashTable::release
    /// [`insert`]: HashTable::insert
    ///
    /// # Examples
    ///
    /// ```rust
    /// use slot_hash::HashTable;
    ///
    /// let mut table = HashTable::<u64, _>::new(8, 1.0, |a: &u64, b: &u64| a == b).unwrap();
    /// let item = table.acquire().unwrap();
    /// table[item] = 3;
    /// table.insert(3, item);
    ///
    /// // Move the item under a new hash code without touching the pool.
    /// let moved = table.delete(3, &3).unwrap();
    /// table.insert(11, moved);
    /// assert_eq!(table.find(11, &3), Some(item));
    /// assert_eq!(table.delete(3, &4), None);
    /// ```
    pub fn delete<K>(&mut self, hash_code: u64, key: &K) -> Option<ItemRef>
    where
        K: ?Sized,
        E: KeyEq<T, K>,
    {
        let item = self.find(hash_code, key)?;
        self.unlink(self.bucket_of(hash_code), item);
        Some(item)
    }

    /// Unlinks a known chained item in O(1), without comparing keys.
    ///
    /// `hash_code` must be the one `item` was inserted under. Like
    /// [`delete`](HashTable::delete), the slot stays checked out.
    ///
    /// Returns `false` and leaves the table untouched if `item` is not
    /// chained, or if it heads a chain other than the one `hash_code`
    /// selects.
    pub fn detach(&mut self, hash_code: u64, item: ItemRef) -> bool {
        let bucket = self.bucket_of(hash_code);
        match self.pool.link(item) {
            Link::Chained { prev: None, .. } if self.buckets[bucket] != Some(item) => {
                trace_event!("{item:?} does not head the chain for hash code {hash_code:#x}");
                false
            }
            Link::Chained { .. } => {
                self.unlink(bucket, item);
                true
            }
            _ => false,
        }
    }

    fn unlink(&mut self, bucket: usize, item: ItemRef) {
        let Link::Chained { prev, next } = self.pool.link(item) else {
            debug_assert!(false, "unlinking {item:?} which is not chained");
            return;
        };

        match prev {
            Some(prev) => self.pool.set_chain_next(prev, next),
            None => {
                // A chain head must be the one this bucket points at.
                if self.buckets[bucket] != Some(item) {
                    debug_assert!(false, "{item:?} does not head bucket {bucket}");
                    return;
                }
                self.buckets[bucket] = next;
            }
        }
        if let Some(next) = next {
            self.pool.set_chain_prev(next, prev);
        }

        self.pool.set_link(item, Link::Detached);
        self.populated -= 1;
    }

    #[inline(always)]
    fn chain_next(&self, item: ItemRef) -> Option<ItemRef> {
        match self.pool.link(item) {
            Link::Chained { next, .. } => next,
            link => {
                debug_assert!(false, "chain member {item:?} is {link:?}");
                None
            }
        }
    }

    /// Consumes the table, releasing the bucket array and the item block.
    ///
    /// Equivalent to dropping the table. Payloads are dropped like any other
    /// owned value; there is no additional per-item hook.
    pub fn teardown(self) {
        debug_event!(
            "tearing down table: capacity={} populated={}",
            self.pool.capacity(),
            self.populated
        );
    }

    /// Returns the bucket index `hash_code` selects.
    #[inline(always)]
    pub fn bucket_of(&self, hash_code: u64) -> usize {
        (hash_code % self.buckets.len() as u64) as usize
    }

    /// Returns an iterator over the chain `hash_code` selects, head first.
    ///
    /// Chains are ordered most recently inserted first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use slot_hash::HashTable;
    ///
    /// let mut table = HashTable::<u64, _>::new(4, 0.5, |a: &u64, b: &u64| a == b).unwrap();
    /// let first = table.acquire().unwrap();
    /// let second = table.acquire().unwrap();
    /// table.insert(1, first);
    /// table.insert(9, second); // 9 % 8 == 1
    ///
    /// let chain: Vec<_> = table.chain(1).collect();
    /// assert_eq!(chain, vec![second, first]);
    /// ```
    pub fn chain(&self, hash_code: u64) -> Chain<'_, T, E> {
        self.chain_from(self.buckets[self.bucket_of(hash_code)])
    }

    fn chain_from(&self, head: Option<ItemRef>) -> Chain<'_, T, E> {
        Chain {
            table: self,
            cursor: head,
        }
    }

    /// Returns an iterator over every linked item and its payload.
    ///
    /// Items are visited bucket by bucket, each chain head first. Checked-out
    /// and free slots are not visited.
    pub fn iter(&self) -> Iter<'_, T, E> {
        Iter {
            table: self,
            bucket_index: 0,
            cursor: None,
        }
    }

    /// Returns a reference to the payload of `item`.
    ///
    /// # Panics
    ///
    /// Panics if `item` is out of range for this table.
    #[inline]
    pub fn get(&self, item: ItemRef) -> &T {
        self.pool.get(item)
    }

    /// Returns a mutable reference to the payload of `item`.
    ///
    /// Mutating the part of the payload the equality capability inspects
    /// while the item is linked makes it unreachable under its old key.
    ///
    /// # Panics
    ///
    /// Panics if `item` is out of range for this table.
    #[inline]
    pub fn get_mut(&mut self, item: ItemRef) -> &mut T {
        self.pool.get_mut(item)
    }

    /// Returns the role `item` currently plays.
    pub fn state(&self, item: ItemRef) -> SlotState {
        self.pool.state(item)
    }

    /// Returns the number of items currently linked into chains.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if no item is linked into a chain.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the total number of item slots.
    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Returns the number of chain heads.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the number of slots on the free list.
    pub fn free_count(&self) -> usize {
        self.pool.free_count()
    }

    /// Returns the size in bytes of one slot, link header included.
    pub fn item_size(&self) -> usize {
        self.pool.item_size()
    }

    /// Returns the load factor the table was built with.
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Computes a histogram of chain lengths.
    ///
    /// Index `n` of the result counts the buckets whose chain holds exactly
    /// `n` items. Requires the `stats` feature.
    #[cfg(feature = "stats")]
    pub fn chain_histogram(&self) -> Vec<usize> {
        let mut hist = alloc::vec![0usize; 1];
        for head in self.buckets.iter() {
            let length = self.chain_from(*head).count();
            if length >= hist.len() {
                hist.resize(length + 1, 0);
            }
            hist[length] += 1;
        }
        hist
    }

    /// Returns chain-length and utilization statistics.
    ///
    /// Requires the `stats` feature.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> DebugStats {
        let hist = self.chain_histogram();
        let bucket_count = self.buckets.len();
        let used_buckets = bucket_count - hist[0];

        DebugStats {
            populated: self.populated,
            capacity: self.capacity(),
            bucket_count,
            used_buckets,
            longest_chain: hist.len() - 1,
            free_slots: self.pool.free_count(),
            load: self.populated as f64 / bucket_count as f64,
            bucket_utilization: used_buckets as f64 / bucket_count as f64,
            total_bytes: bucket_count * core::mem::size_of::<Option<ItemRef>>()
                + self.capacity() * self.item_size(),
        }
    }
}

impl<T, E> Index<ItemRef> for HashTable<T, E> {
    type Output = T;

    fn index(&self, item: ItemRef) -> &T {
        self.pool.get(item)
    }
}

impl<T, E> IndexMut<ItemRef> for HashTable<T, E> {
    fn index_mut(&mut self, item: ItemRef) -> &mut T {
        self.pool.get_mut(item)
    }
}

/// An iterator over one bucket chain of a [`HashTable`].
///
/// This struct is created by [`HashTable::chain`].
pub struct Chain<'a, T, E> {
    table: &'a HashTable<T, E>,
    cursor: Option<ItemRef>,
}

impl<T, E> Iterator for Chain<'_, T, E> {
    type Item = ItemRef;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.cursor?;
        self.cursor = self.table.chain_next(item);
        Some(item)
    }
}

/// An iterator over the linked items of a [`HashTable`].
///
/// This struct is created by [`HashTable::iter`].
pub struct Iter<'a, T, E> {
    table: &'a HashTable<T, E>,
    bucket_index: usize,
    cursor: Option<ItemRef>,
}

impl<'a, T, E> Iterator for Iter<'a, T, E> {
    type Item = (ItemRef, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.cursor {
                self.cursor = self.table.chain_next(item);
                return Some((item, self.table.pool.get(item)));
            }

            if self.bucket_index >= self.table.buckets.len() {
                return None;
            }
            self.cursor = self.table.buckets[self.bucket_index];
            self.bucket_index += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.table.populated))
    }
}
