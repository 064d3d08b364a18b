// syncstack/src/error.rs

//! Errors raised by stack operations.

use std::collections::TryReserveError;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StackError {
    /// `pop` or `pop_into` found nothing to remove. Callers that expect
    /// absence should use `try_pop` instead.
    #[error("the stack is empty")]
    EmptyContainer,
    /// `pop_unique_into` found the top slot still held elsewhere.
    #[error("the top slot is shared with another holder")]
    SharedSlot,
    #[error("stack storage could not grow")]
    AllocationFailure(#[from] AllocError),
}

/// Why the backing storage refused to make room for more slots.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error(transparent)]
    Reserve(#[from] TryReserveError),
    #[error("fixed storage is full ({capacity} slots)")]
    Exhausted { capacity: usize },
}
