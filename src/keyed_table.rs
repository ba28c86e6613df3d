use core::borrow::Borrow;
use core::fmt;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::error::InitError;
use crate::hash_table::HashTable;
use crate::hash_table::KeyEq;
use crate::pool::ItemRef;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else {
        /// Placeholder default hasher builder when the `foldhash` feature is
        /// disabled. It cannot be constructed; pass a builder explicitly.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}
    }
}

/// Matches a `(key, value)` payload against a borrowed form of its key.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyMatch;

impl<K, V, Q> KeyEq<(K, V), Q> for KeyMatch
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
{
    #[inline(always)]
    fn key_eq(&self, item: &(K, V), key: &Q) -> bool {
        item.0.borrow() == key
    }
}

/// Why [`KeyedTable::insert`] rejected a pair.
///
/// The rejected key and value are handed back either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertError<K, V> {
    /// The key is already present.
    Occupied {
        /// The rejected key.
        key: K,
        /// The rejected value.
        value: V,
    },
    /// Every slot of the pool is in use.
    Exhausted {
        /// The rejected key.
        key: K,
        /// The rejected value.
        value: V,
    },
}

impl<K, V> InsertError<K, V> {
    /// Returns the rejected key and value.
    pub fn into_inner(self) -> (K, V) {
        match self {
            InsertError::Occupied { key, value } | InsertError::Exhausted { key, value } => {
                (key, value)
            }
        }
    }
}

impl<K, V> fmt::Display for InsertError<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::Occupied { .. } => f.write_str("key already present"),
            InsertError::Exhausted { .. } => f.write_str("item pool exhausted"),
        }
    }
}

impl<K: Debug, V: Debug> core::error::Error for InsertError<K, V> {}

/// A fixed-capacity map over a [`HashTable`] that hashes keys itself.
///
/// `KeyedTable<K, V, S>` stores `(K, V)` pairs in the table's pool, computes
/// hash codes with the hasher builder `S`, and rejects duplicate keys on
/// insert. Removing a key returns its slot to the pool.
///
/// Keys and values must implement `Default` because every slot is
/// initialized up front.
///
/// # Examples
///
/// ```rust
/// # use core::hash::BuildHasher;
/// # use siphasher::sip::SipHasher;
/// #
/// # use slot_hash::KeyedTable;
/// #
/// # struct SimpleHasher;
/// # impl BuildHasher for SimpleHasher {
/// #     type Hasher = SipHasher;
/// #
/// #     fn build_hasher(&self) -> Self::Hasher {
/// #         SipHasher::new()
/// #     }
/// # }
/// #
/// let mut conns = KeyedTable::with_hasher(2, 0.5, SimpleHasher).unwrap();
/// conns.insert(8080u16, "proxy".to_string()).unwrap();
/// conns.insert(443, "tls".to_string()).unwrap();
///
/// // Full: the pair comes back in the error.
/// let err = conns.insert(22, "ssh".to_string()).unwrap_err();
/// assert_eq!(err.into_inner(), (22, "ssh".to_string()));
///
/// assert_eq!(conns.remove(&8080), Some((8080, "proxy".to_string())));
/// assert!(conns.insert(22, "ssh".to_string()).is_ok());
/// ```
pub struct KeyedTable<K, V, S = DefaultHashBuilder> {
    table: HashTable<(K, V), KeyMatch>,
    hash_builder: S,
}

impl<K, V, S> Debug for KeyedTable<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S> KeyedTable<K, V, S>
where
    K: Hash + Eq + Default,
    V: Default,
    S: BuildHasher,
{
    /// Creates a table with `capacity` slots, `floor(capacity / load_factor)`
    /// buckets, and the given hasher builder.
    ///
    /// # Errors
    ///
    /// Fails like [`HashTable::new`].
    pub fn with_hasher(
        capacity: u32,
        load_factor: f32,
        hash_builder: S,
    ) -> Result<Self, InitError> {
        Ok(Self {
            table: HashTable::new(capacity, load_factor, KeyMatch)?,
            hash_builder,
        })
    }

    /// Inserts a pair whose key is not yet present.
    ///
    /// Returns the slot now holding the pair, or hands the pair back if the
    /// key is already present or the pool is exhausted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use slot_hash::KeyedTable;
    /// # use slot_hash::keyed_table::InsertError;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut table = KeyedTable::with_hasher(8, 1.0, SimpleHasher).unwrap();
    /// assert!(table.insert(37, "a").is_ok());
    /// assert_eq!(
    ///     table.insert(37, "b"),
    ///     Err(InsertError::Occupied { key: 37, value: "b" })
    /// );
    /// assert_eq!(table.get(&37), Some(&"a"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<ItemRef, InsertError<K, V>> {
        let hash = self.hash_builder.hash_one(&key);
        if self.table.find(hash, &key).is_some() {
            return Err(InsertError::Occupied { key, value });
        }

        let Some(item) = self.table.acquire() else {
            return Err(InsertError::Exhausted { key, value });
        };
        self.table[item] = (key, value);
        self.table.insert(hash, item);
        Ok(item)
    }

    /// Removes a key and returns its pair, releasing the slot to the pool.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        let item = self.table.delete(hash, key)?;
        let pair = core::mem::take(&mut self.table[item]);
        self.table.release(item);
        Some(pair)
    }

    /// Removes every pair and returns every slot to the pool.
    pub fn clear(&mut self) {
        self.table.clear();
    }
}

impl<K, V, S> KeyedTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Returns the slot holding `key`, if present.
    pub fn find<Q>(&self, key: &Q) -> Option<ItemRef>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table.find(hash, key)
    }

    /// Returns a reference to the value stored under `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use slot_hash::KeyedTable;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let mut table = KeyedTable::with_hasher(8, 1.0, SimpleHasher).unwrap();
    /// table.insert("one".to_string(), 1).unwrap();
    /// assert_eq!(table.get("one"), Some(&1));
    /// assert_eq!(table.get("two"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).map(|item| &self.table[item].1)
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let item = self.find(key)?;
        Some(&mut self.table[item].1)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.find(key).is_some()
    }
}

impl<K, V, S> KeyedTable<K, V, S> {
    /// Returns an iterator over the stored pairs in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.table.iter().map(|(_, (k, v))| (k, v))
    }

    /// Returns the number of stored pairs.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no pairs are stored.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the maximum number of pairs the table can hold.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the underlying hash table.
    pub fn table(&self) -> &HashTable<(K, V), KeyMatch> {
        &self.table
    }

    /// Returns a reference to the table's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }
}

impl<K, V, S> KeyedTable<K, V, S>
where
    K: Hash + Eq + Default,
    V: Default,
    S: BuildHasher + Default,
{
    /// Creates a table using the default hasher builder.
    ///
    /// # Errors
    ///
    /// Fails like [`HashTable::new`].
    pub fn new(capacity: u32, load_factor: f32) -> Result<Self, InitError> {
        Self::with_hasher(capacity, load_factor, S::default())
    }
}
