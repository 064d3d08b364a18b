// syncstack/src/stack.rs

//! A concurrent blocking stack implemented with a mutex lock.

use crate::error::StackError;
use crate::storage::Storage;

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt::{self, Debug, Formatter};
use std::iter::FromIterator;
use std::marker::PhantomData;
use std::mem;
use std::ptr;
use std::sync::Arc;

/// The shared handle one element travels in. Pops hand back the handle, so
/// removing an element never has to copy or move the element itself.
pub type Slot<T> = Arc<T>;

/// A LIFO stack that any number of threads may push onto and pop from.
///
/// Every access to the storage happens under one lock. Consumers may block
/// until an element shows up (`wait_and_pop`), poll (`try_pop`), or treat an
/// empty stack as a bug (`pop`).
///
/// The `*_into` pops write the element itself rather than its slot. Copies
/// of a stack share slots, so those need `T: Clone` to copy an element
/// another stack still holds. For element types that cannot be cloned,
/// `pop_unique_into` moves the element out and refuses shared slots.
pub struct ConcurrentStack<T, S = Vec<Slot<T>>> where S: Storage<Slot<T>> {
    storage: Mutex<S>,
    cond: Condvar,
    phantom: PhantomData<fn() -> T>,
}

impl<T, S> ConcurrentStack<T, S> where S: Storage<Slot<T>> {
    #[inline]
    pub fn new() -> ConcurrentStack<T, S> {
        ConcurrentStack::with_storage(S::default())
    }

    /// Wraps an existing container. Its back element becomes the top.
    #[inline]
    pub fn with_storage(storage: S) -> ConcurrentStack<T, S> {
        ConcurrentStack { storage: Mutex::new(storage), cond: Condvar::new(), phantom: PhantomData }
    }

    /// Builds a stack by pushing each item in turn, so the last item ends up
    /// on top. Fails if the storage runs out of room.
    pub fn try_from_iter<I>(iter: I) -> Result<ConcurrentStack<T, S>, StackError>
                            where I: IntoIterator<Item = T> {
        let mut storage = S::default();
        for object in iter {
            storage.try_reserve(1)?;
            storage.push_back(Arc::new(object));
        }
        Ok(ConcurrentStack::with_storage(storage))
    }

    /// Pushes `object` and wakes one blocked consumer, if there is one.
    ///
    /// The element is wrapped in its slot before the lock is taken. If the
    /// storage cannot make room the stack is left as it was.
    pub fn push(&self, object: T) -> Result<(), StackError> {
        self.push_slot(Arc::new(object))
    }

    /// Pushes an already wrapped element, e.g. one handed out by an earlier
    /// pop.
    pub fn push_slot(&self, slot: Slot<T>) -> Result<(), StackError> {
        {
            let mut guard = self.storage.lock();
            guard.try_reserve(1)?;
            guard.push_back(slot);
        }
        self.cond.notify_one();
        Ok(())
    }

    /// Pushes every item in order, waking one consumer per item. Either all
    /// of them go in, or, if the storage cannot make room, none do.
    pub fn push_all<I>(&self, iter: I) -> Result<(), StackError> where I: IntoIterator<Item = T> {
        let slots: Vec<Slot<T>> = iter.into_iter().map(Arc::new).collect();
        let count = slots.len();
        {
            let mut guard = self.storage.lock();
            guard.try_reserve(count)?;
            for slot in slots {
                guard.push_back(slot);
            }
        }
        for _ in 0..count {
            self.cond.notify_one();
        }
        Ok(())
    }

    /// Makes room for `additional` more elements up front.
    pub fn reserve(&self, additional: usize) -> Result<(), StackError> {
        self.storage.lock().try_reserve(additional)?;
        Ok(())
    }

    /// Blocks until the stack is non-empty, then removes the top element.
    ///
    /// There is no timeout: if nothing is ever pushed this never returns.
    pub fn wait_and_pop(&self) -> Slot<T> {
        let mut guard = self.wait_non_empty();
        match guard.pop_back() {
            Some(slot) => slot,
            None => unreachable!(),
        }
    }

    /// Like `wait_and_pop`, but stores the element in `object`.
    pub fn wait_and_pop_into(&self, object: &mut T) where T: Clone {
        let mut guard = self.wait_non_empty();
        if let Some(top) = take_top(&mut *guard) {
            *object = top;
        }
    }

    /// Removes the top element, or returns `None` right away if the stack is
    /// empty.
    pub fn try_pop(&self) -> Option<Slot<T>> {
        self.storage.lock().pop_back()
    }

    /// Like `try_pop`, but stores the element in `object`. Returns false and
    /// leaves `object` alone if the stack is empty.
    pub fn try_pop_into(&self, object: &mut T) -> bool where T: Clone {
        match take_top(&mut *self.storage.lock()) {
            None => false,
            Some(top) => {
                *object = top;
                true
            }
        }
    }

    /// Removes the top element. For callers that already know the stack is
    /// non-empty: finding it empty is reported as `StackError::EmptyContainer`.
    pub fn pop(&self) -> Result<Slot<T>, StackError> {
        self.try_pop().ok_or(StackError::EmptyContainer)
    }

    /// Like `pop`, but stores the element in `object`.
    pub fn pop_into(&self, object: &mut T) -> Result<(), StackError> where T: Clone {
        *object = take_top(&mut *self.storage.lock()).ok_or(StackError::EmptyContainer)?;
        Ok(())
    }

    /// Moves the top element into `object` without cloning it. If another
    /// stack or caller still holds the top slot, nothing is removed and
    /// `StackError::SharedSlot` is returned.
    pub fn pop_unique_into(&self, object: &mut T) -> Result<(), StackError> {
        let mut guard = self.storage.lock();
        match guard.back() {
            None => return Err(StackError::EmptyContainer),
            Some(slot) if !is_unique(slot) => return Err(StackError::SharedSlot),
            Some(_) => {}
        }
        let slot = guard.pop_back().ok_or(StackError::EmptyContainer)?;
        match Arc::try_unwrap(slot) {
            Ok(top) => {
                *object = top;
                Ok(())
            }
            Err(slot) => {
                guard.push_back(slot);
                Err(StackError::SharedSlot)
            }
        }
    }

    // Sleeps until there is something to pop. Spurious wakeups go back to
    // sleep.
    fn wait_non_empty(&self) -> MutexGuard<S> {
        let mut guard = self.storage.lock();
        while guard.is_empty() {
            trace!("wait_and_pop: stack empty, sleeping");
            self.cond.wait(&mut guard);
            trace!("wait_and_pop: woke with {} slots", guard.len());
        }
        guard
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.storage.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.lock().is_empty()
    }

    /// The current contents, top first, as seen during a single hold of the
    /// lock.
    pub fn snapshot(&self) -> Vec<Slot<T>> {
        self.storage.lock().top_down().cloned().collect()
    }

    /// Moves the contents into a new stack, leaving this one empty.
    pub fn take(&self) -> ConcurrentStack<T, S> {
        let storage = mem::take(&mut *self.storage.lock());
        ConcurrentStack::with_storage(storage)
    }

    #[inline]
    pub fn into_storage(self) -> S {
        self.storage.into_inner()
    }

    /// Replaces the contents with a copy of `source`'s. The copied stack
    /// shares slots with `source`.
    ///
    /// The copy is built in full before anything is replaced, so if copying
    /// panics this stack keeps its old contents.
    pub fn assign(&self, source: &ConcurrentStack<T, S>) where S: Clone {
        if ptr::eq(self, source) {
            return;
        }
        let refilled = {
            let (mut ours, theirs) = self.lock_pair(source);
            let copy = theirs.clone();
            *ours = copy;
            debug!("assign: copied {} slots", ours.len());
            !ours.is_empty()
        };
        if refilled {
            self.cond.notify_all();
        }
    }

    /// Replaces the contents with `source`'s, leaving `source` empty.
    pub fn assign_take(&self, source: &ConcurrentStack<T, S>) {
        if ptr::eq(self, source) {
            return;
        }
        let refilled = {
            let (mut ours, mut theirs) = self.lock_pair(source);
            *ours = mem::take(&mut *theirs);
            debug!("assign_take: moved {} slots", ours.len());
            !ours.is_empty()
        };
        if refilled {
            self.cond.notify_all();
        }
    }

    /// Exchanges the contents of two stacks.
    pub fn swap(&self, other: &ConcurrentStack<T, S>) {
        if ptr::eq(self, other) {
            return;
        }
        let (ours_refilled, theirs_refilled) = {
            let (mut ours, mut theirs) = self.lock_pair(other);
            mem::swap(&mut *ours, &mut *theirs);
            debug!("swap: exchanged {} and {} slots", ours.len(), theirs.len());
            (!ours.is_empty(), !theirs.is_empty())
        };
        if ours_refilled {
            self.cond.notify_all();
        }
        if theirs_refilled {
            other.cond.notify_all();
        }
    }

    // Locks both stacks, always in ascending address order, so that two
    // threads working on the same pair from opposite ends cannot deadlock.
    // Guards come back as (self, other).
    fn lock_pair<'a>(&'a self, other: &'a ConcurrentStack<T, S>)
                     -> (MutexGuard<'a, S>, MutexGuard<'a, S>) {
        debug_assert!(!ptr::eq(self, other));
        if (self as *const Self) < (other as *const Self) {
            let ours = self.storage.lock();
            let theirs = other.storage.lock();
            (ours, theirs)
        } else {
            let theirs = other.storage.lock();
            let ours = self.storage.lock();
            (ours, theirs)
        }
    }
}

/// Exchanges the contents of two stacks. Same as `a.swap(b)`.
#[inline]
pub fn swap<T, S>(a: &ConcurrentStack<T, S>, b: &ConcurrentStack<T, S>)
                  where S: Storage<Slot<T>> {
    a.swap(b)
}

// Nobody outside the storage holds the slot, and nobody can get at it
// without the lock we hold.
#[inline]
fn is_unique<T>(slot: &Slot<T>) -> bool {
    Arc::strong_count(slot) == 1 && Arc::weak_count(slot) == 0
}

// Removes the top element and returns it by value. A shared slot is cloned
// while it is still in the storage, so a panicking `clone` leaves the stack
// as it was.
fn take_top<T, S>(storage: &mut S) -> Option<T> where T: Clone, S: Storage<Slot<T>> {
    let copy = match storage.back() {
        None => return None,
        Some(slot) if is_unique(slot) => None,
        Some(slot) => Some((**slot).clone()),
    };
    let slot = storage.pop_back()?;
    match copy {
        Some(copy) => Some(copy),
        None => Some(Arc::try_unwrap(slot).unwrap_or_else(|shared| (*shared).clone())),
    }
}

impl<T, S> Clone for ConcurrentStack<T, S> where S: Storage<Slot<T>> + Clone {
    fn clone(&self) -> ConcurrentStack<T, S> {
        let storage = self.storage.lock().clone();
        ConcurrentStack::with_storage(storage)
    }

    // `&mut self` means no other thread can see this stack, so only the
    // source needs locking.
    fn clone_from(&mut self, source: &ConcurrentStack<T, S>) {
        let copy = source.storage.lock().clone();
        *self.storage.get_mut() = copy;
    }
}

impl<T, S> Default for ConcurrentStack<T, S> where S: Storage<Slot<T>> {
    #[inline]
    fn default() -> ConcurrentStack<T, S> {
        ConcurrentStack::new()
    }
}

impl<T, S> FromIterator<T> for ConcurrentStack<T, S> where S: Storage<Slot<T>> {
    /// Builds a stack by pushing each item in turn, so the last item ends up
    /// on top.
    ///
    /// Panics if the storage runs out of room; `try_from_iter` reports that
    /// instead.
    fn from_iter<I>(iter: I) -> ConcurrentStack<T, S> where I: IntoIterator<Item = T> {
        match ConcurrentStack::try_from_iter(iter) {
            Ok(stack) => stack,
            Err(err) => panic!("ConcurrentStack::from_iter: {}", err),
        }
    }
}

impl<T, S> Debug for ConcurrentStack<T, S> where T: Debug, S: Storage<Slot<T>> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let guard = self.storage.lock();
        f.debug_list().entries(guard.top_down().map(|slot| &**slot)).finish()
    }
}
