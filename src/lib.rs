// syncstack/src/lib.rs

//! A LIFO stack for many producer and consumer threads.
//!
//! Elements are wrapped in a reference-counted `Slot` when pushed, and pops
//! hand the slot back, so removing an element never has to copy it. A single
//! mutex guards the storage and a condition variable lets consumers sleep
//! until something is pushed.
//!
//! The container the slots live in is a type parameter (see `Storage`);
//! `Vec` is the default.

#[macro_use]
extern crate log;

pub mod error;
pub mod stack;
pub mod storage;


pub use crate::error::{AllocError, StackError};
pub use crate::stack::{swap, ConcurrentStack, Slot};
pub use crate::storage::Storage;
