/*! Paged, index-stable resource pools.
 *
 * Elements live in fixed-size boxed pages, so a slot's address never changes
 * for the lifetime of the pool. Freed slots are recycled through a free list.
 * Mutation is serialized behind one mutex; reads that go through a
 * [`crate::handle::Handle`] are lock-free because a live handle keeps its
 * slot occupied.
 */

use std::{cell::UnsafeCell, ptr::NonNull};

use parking_lot::Mutex;

pub(crate) const PAGE_SIZE: usize = 16;

/// `{ page: u16, offset: u16 }` packed into a `u32`, widened to `u64` when it
/// crosses the handle boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct PoolIndex(u32);

impl PoolIndex {
    pub(crate) const INVALID: Self = Self(u32::MAX);

    pub(crate) fn new(page: u16, offset: u16) -> Self {
        Self(((page as u32) << 16) | offset as u32)
    }

    pub(crate) fn page(self) -> usize {
        (self.0 >> 16) as usize
    }

    pub(crate) fn offset(self) -> usize {
        (self.0 & 0xffff) as usize
    }

    pub(crate) fn to_u64(self) -> u64 {
        self.0 as u64
    }

    pub(crate) fn from_u64(id: u64) -> Self {
        if id > u32::MAX as u64 {
            Self::INVALID
        } else {
            Self(id as u32)
        }
    }
}

struct Page<T> {
    slots: [UnsafeCell<Option<T>>; PAGE_SIZE],
}

impl<T> Page<T> {
    fn new() -> Box<Self> {
        Box::new(Self {
            slots: std::array::from_fn(|_| UnsafeCell::new(None)),
        })
    }
}

struct PoolInner<T> {
    pages: Vec<Box<Page<T>>>,
    free: Vec<PoolIndex>,
    // Number of slots handed out from the last page.
    tail: usize,
}

pub(crate) struct Pool<T> {
    inner: Mutex<PoolInner<T>>,
}

// Slots are reached through raw pointers held by handles; the pool itself
// only requires the usual bounds on the element type.
unsafe impl<T: Send> Send for Pool<T> {}
unsafe impl<T: Send + Sync> Sync for Pool<T> {}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                pages: Vec::new(),
                free: Vec::new(),
                tail: PAGE_SIZE,
            }),
        }
    }
}

impl<T> Pool<T> {
    /// Inserts `value` and returns its index together with a pointer to the
    /// slot. The pointer stays valid until [`Pool::remove`] frees the slot.
    pub(crate) fn insert(&self, value: T) -> (PoolIndex, NonNull<T>) {
        let mut inner = self.inner.lock();

        let index = match inner.free.pop() {
            Some(index) => index,
            None => {
                if inner.tail == PAGE_SIZE {
                    inner.pages.push(Page::new());
                    inner.tail = 0;
                }
                let index = PoolIndex::new((inner.pages.len() - 1) as u16, inner.tail as u16);
                inner.tail += 1;
                index
            }
        };

        let cell = &inner.pages[index.page()].slots[index.offset()];
        unsafe {
            *cell.get() = Some(value);
            let ptr = (*cell.get()).as_mut().unwrap() as *mut T;
            (index, NonNull::new_unchecked(ptr))
        }
    }

    /// Frees the slot at `index`, returning the element it held. The caller
    /// must guarantee no live pointer into the slot remains.
    pub(crate) fn remove(&self, index: PoolIndex) -> Option<T> {
        let mut inner = self.inner.lock();

        let page = index.page();
        let offset = index.offset();
        if page >= inner.pages.len() || offset >= PAGE_SIZE {
            return None;
        }

        let value = unsafe { (*inner.pages[page].slots[offset].get()).take() };
        if value.is_some() {
            inner.free.push(index);
        }
        value
    }

    pub(crate) fn get(&self, index: PoolIndex) -> Option<NonNull<T>> {
        let inner = self.inner.lock();

        let page = index.page();
        let offset = index.offset();
        if page >= inner.pages.len() || offset >= PAGE_SIZE {
            return None;
        }

        unsafe { (*inner.pages[page].slots[offset].get()).as_mut().map(NonNull::from) }
    }

    /// Drains every live element. Used during device teardown.
    pub(crate) fn drain(&self) -> Vec<T> {
        let mut inner = self.inner.lock();

        let mut drained = Vec::new();
        for page in &inner.pages {
            for cell in &page.slots {
                if let Some(value) = unsafe { (*cell.get()).take() } {
                    drained.push(value);
                }
            }
        }
        inner.pages.clear();
        inner.free.clear();
        inner.tail = PAGE_SIZE;
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_packing() {
        let index = PoolIndex::new(3, 7);
        assert_eq!(index.page(), 3);
        assert_eq!(index.offset(), 7);
        assert_eq!(PoolIndex::from_u64(index.to_u64()), index);
        assert_eq!(PoolIndex::from_u64(u64::MAX), PoolIndex::INVALID);
    }

    #[test]
    fn slots_are_address_stable_across_growth() {
        let pool: Pool<u64> = Pool::default();
        let (first_index, first_ptr) = pool.insert(1);

        // Force several page allocations.
        for value in 2..100u64 {
            pool.insert(value);
        }

        let current = pool.get(first_index).unwrap();
        assert_eq!(current.as_ptr(), first_ptr.as_ptr());
        assert_eq!(unsafe { *current.as_ref() }, 1);
    }

    #[test]
    fn removed_slots_are_reused() {
        let pool: Pool<String> = Pool::default();
        let (a, _) = pool.insert("a".into());
        let (b, _) = pool.insert("b".into());

        assert_eq!(pool.remove(a), Some("a".into()));
        let (c, _) = pool.insert("c".into());
        assert_eq!(c, a);

        assert_eq!(pool.remove(b), Some("b".into()));
        assert_eq!(pool.remove(b), None);
        assert!(pool.get(b).is_none());
        assert!(pool.get(c).is_some());
    }

    #[test]
    fn drain_empties_the_pool() {
        let pool: Pool<u32> = Pool::default();
        for value in 0..40 {
            pool.insert(value);
        }
        let mut drained = pool.drain();
        drained.sort_unstable();
        assert_eq!(drained.len(), 40);
        assert_eq!(drained[0], 0);
        assert_eq!(drained[39], 39);
    }
}
