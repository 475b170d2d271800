//! Shared backing buffer for arrays and their views.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{ArrayError, Result};

/// Reference-counted, interior-mutable element buffer.
///
/// Cloning a `Storage` clones the handle, not the elements: every view of an
/// array holds a handle to the same buffer, and a write through any of them
/// is visible through all. Each access takes the lock for that access only,
/// so aliasing views can be used freely from one thread.
pub struct Storage<T> {
    inner: Arc<RwLock<Vec<T>>>,
}

impl<T> Clone for Storage<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("len", &self.len())
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}

impl<T> Storage<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
        }
    }

    // Poisoned locks are recovered.
    fn read_guard(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of elements in the buffer.
    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when both handles refer to the same buffer.
    pub fn ptr_eq(&self, other: &Storage<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `f` with shared access to the whole buffer.
    pub fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.read_guard())
    }

    /// Run `f` with exclusive access to the whole buffer.
    pub fn write<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> R {
        f(&mut self.write_guard())
    }

    /// Overwrite the element at `pos`.
    pub fn set(&self, pos: usize, value: T) -> Result<()> {
        let mut data = self.write_guard();
        let slot = data.get_mut(pos).ok_or(ArrayError::OffsetOverflow)?;
        *slot = value;
        Ok(())
    }
}

impl<T: Clone> Storage<T> {
    /// The element at `pos`.
    pub fn get(&self, pos: usize) -> Result<T> {
        self.read_guard()
            .get(pos)
            .cloned()
            .ok_or(ArrayError::OffsetOverflow)
    }

    /// Copy of the whole buffer.
    pub fn to_vec(&self) -> Vec<T> {
        self.read_guard().clone()
    }
}
