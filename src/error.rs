use core::fmt;

/// The reasons a table or pool can fail to initialize.
///
/// Construction is the only fallible step. Everything afterwards reports
/// absence through `Option` instead: a missing key or an exhausted pool is an
/// expected outcome, not an error.
///
/// # Examples
///
/// ```rust
/// use slot_hash::HashTable;
/// use slot_hash::InitError;
///
/// let result = HashTable::<u64, _>::new(16, 1.5, |item: &u64, key: &u64| item == key);
/// let err = result.unwrap_err();
/// assert_eq!(err, InitError::InvalidLoadFactor);
/// assert_eq!(err.to_string(), err.message());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitError {
    /// The load factor was not in `(0, 1]`.
    InvalidLoadFactor,
    /// The bucket array or the item block could not be allocated, or its size
    /// does not fit in the address space.
    AllocationFailure,
}

impl InitError {
    /// Returns the human-readable message for this failure kind.
    pub const fn message(self) -> &'static str {
        match self {
            InitError::InvalidLoadFactor => "load factor must satisfy 0 < x <= 1",
            InitError::AllocationFailure => "unable to allocate table memory",
        }
    }
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl core::error::Error for InitError {}
