#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

cfg_if::cfg_if! {
    if #[cfg(feature = "log")] {
        macro_rules! debug_event {
            ($($arg:tt)+) => { ::log::debug!(target: "slot_hash", $($arg)+) };
        }

        macro_rules! trace_event {
            ($($arg:tt)+) => { ::log::trace!(target: "slot_hash", $($arg)+) };
        }
    } else {
        // Keep the arguments type-checked so both builds see the same uses.
        macro_rules! debug_event {
            ($($arg:tt)+) => {
                if false {
                    let _ = ::core::format_args!($($arg)+);
                }
            };
        }

        macro_rules! trace_event {
            ($($arg:tt)+) => {
                if false {
                    let _ = ::core::format_args!($($arg)+);
                }
            };
        }
    }
}

/// Initialization failures and their messages.
pub mod error;

/// The fixed-capacity item pool and its free list.
///
/// The pool carves a single allocation into identically sized slots and hands
/// them out through a singly linked free list threaded through the slots
/// themselves.
pub mod pool;

pub mod hash_table;

/// A map-style table that hashes keys itself and enforces key uniqueness.
///
/// This module provides a `KeyedTable` that wraps the `HashTable` with a
/// configurable hasher builder.
pub mod keyed_table;

pub use error::InitError;
pub use hash_table::HashTable;
pub use hash_table::KeyEq;
pub use keyed_table::KeyedTable;
pub use pool::ItemPool;
pub use pool::ItemRef;
pub use pool::SlotState;
