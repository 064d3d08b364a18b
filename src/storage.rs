// syncstack/src/storage.rs

//! Sequential containers a `ConcurrentStack` can keep its slots in.
//!
//! The back of the container is the top of the stack. Where the memory
//! comes from is picked by the container type: `Vec` and `VecDeque` grow a
//! heap buffer, `LinkedList` allocates per node, and `ArrayVec` is a fixed
//! inline arena that reports exhaustion instead of growing.

use crate::error::AllocError;

use arrayvec::{Array, ArrayVec};
use std::collections::{LinkedList, VecDeque};

pub trait Storage<E>: Default {
    /// Makes room for `additional` more elements. On failure the contents
    /// are untouched.
    fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError>;

    /// Appends `value` at the back. Only called after a successful
    /// `try_reserve`.
    fn push_back(&mut self, value: E);

    fn pop_back(&mut self) -> Option<E>;

    fn back(&self) -> Option<&E>;

    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates from the most recently pushed element down.
    fn top_down<'a>(&'a self) -> Box<dyn Iterator<Item = &'a E> + 'a>;
}

impl<E> Storage<E> for Vec<E> {
    #[inline]
    fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        Vec::try_reserve(self, additional).map_err(AllocError::from)
    }

    #[inline]
    fn push_back(&mut self, value: E) {
        self.push(value)
    }

    #[inline]
    fn pop_back(&mut self) -> Option<E> {
        self.pop()
    }

    #[inline]
    fn back(&self) -> Option<&E> {
        self.last()
    }

    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn top_down<'a>(&'a self) -> Box<dyn Iterator<Item = &'a E> + 'a> {
        Box::new(self.iter().rev())
    }
}

impl<E> Storage<E> for VecDeque<E> {
    #[inline]
    fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        VecDeque::try_reserve(self, additional).map_err(AllocError::from)
    }

    #[inline]
    fn push_back(&mut self, value: E) {
        VecDeque::push_back(self, value)
    }

    #[inline]
    fn pop_back(&mut self) -> Option<E> {
        VecDeque::pop_back(self)
    }

    #[inline]
    fn back(&self) -> Option<&E> {
        VecDeque::back(self)
    }

    #[inline]
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn top_down<'a>(&'a self) -> Box<dyn Iterator<Item = &'a E> + 'a> {
        Box::new(self.iter().rev())
    }
}

// Nodes are allocated one at a time on push, so there is nothing to reserve.
impl<E> Storage<E> for LinkedList<E> {
    #[inline]
    fn try_reserve(&mut self, _: usize) -> Result<(), AllocError> {
        Ok(())
    }

    #[inline]
    fn push_back(&mut self, value: E) {
        LinkedList::push_back(self, value)
    }

    #[inline]
    fn pop_back(&mut self) -> Option<E> {
        LinkedList::pop_back(self)
    }

    #[inline]
    fn back(&self) -> Option<&E> {
        LinkedList::back(self)
    }

    #[inline]
    fn len(&self) -> usize {
        LinkedList::len(self)
    }

    fn top_down<'a>(&'a self) -> Box<dyn Iterator<Item = &'a E> + 'a> {
        Box::new(self.iter().rev())
    }
}

impl<A> Storage<A::Item> for ArrayVec<A> where A: Array {
    fn try_reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        if self.remaining_capacity() < additional {
            return Err(AllocError::Exhausted { capacity: self.capacity() });
        }
        Ok(())
    }

    #[inline]
    fn push_back(&mut self, value: A::Item) {
        self.push(value)
    }

    #[inline]
    fn pop_back(&mut self) -> Option<A::Item> {
        self.pop()
    }

    #[inline]
    fn back(&self) -> Option<&A::Item> {
        self.last()
    }

    #[inline]
    fn len(&self) -> usize {
        ArrayVec::len(self)
    }

    fn top_down<'a>(&'a self) -> Box<dyn Iterator<Item = &'a A::Item> + 'a> {
        Box::new(self.iter().rev())
    }
}

#[cfg(test)]
fn check_back_is_top<S>() where S: Storage<u32> {
    let mut storage = S::default();
    assert!(storage.is_empty());
    for value in 1..=3 {
        storage.try_reserve(1).unwrap();
        storage.push_back(value);
    }
    assert_eq!(storage.back(), Some(&3));
    assert_eq!(storage.top_down().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
    assert_eq!(storage.pop_back(), Some(3));
    assert_eq!(storage.len(), 2);
}

#[test]
fn test_back_is_top() {
    check_back_is_top::<Vec<u32>>();
    check_back_is_top::<VecDeque<u32>>();
    check_back_is_top::<LinkedList<u32>>();
    check_back_is_top::<ArrayVec<[u32; 4]>>();
}

#[test]
fn test_heap_reserve_overflow() {
    let mut storage: Vec<u32> = vec![7];
    match Storage::try_reserve(&mut storage, usize::MAX) {
        Err(AllocError::Reserve(_)) => {}
        other => panic!("expected a reserve failure, got {:?}", other),
    }
    assert_eq!(storage, vec![7]);
}

#[test]
fn test_arena_exhausted() {
    let mut storage: ArrayVec<[u32; 2]> = ArrayVec::new();
    storage.try_reserve(2).unwrap();
    storage.push_back(1);
    storage.push_back(2);
    assert_eq!(storage.try_reserve(1), Err(AllocError::Exhausted { capacity: 2 }));
    assert_eq!(&storage[..], &[1, 2]);
}
