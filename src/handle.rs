/*! Typed, reference-counted resource handles.
 *
 * A [`Handle`] is an `(id, pointer)` pair into one of the device's resource
 * pools. Cloning shares ownership; dropping the last handle invokes the
 * resource's destroy hook, which schedules the underlying Vulkan object on
 * the device's zombie queue rather than destroying it inline.
 */

use std::{
    ptr::NonNull,
    sync::atomic::{AtomicU64, Ordering},
};

/// Sentinel id carried by [`Handle::null`].
pub const NULL_RESOURCE_ID: u64 = u64::MAX;

/// Intrusive reference count embedded in every pooled resource.
#[derive(Default)]
pub struct RefCount(AtomicU64);

impl RefCount {
    pub(crate) fn reference(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the count after the decrement.
    pub(crate) fn dereference(&self) -> u64 {
        self.0.fetch_sub(1, Ordering::AcqRel) - 1
    }

    pub(crate) fn count(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

/// Implemented by every resource that lives in a device pool.
pub trait DeviceResource {
    /// Live device and live API object.
    fn valid(&self) -> bool;

    #[doc(hidden)]
    fn refs(&self) -> &RefCount;

    /// Invoked when the last handle drops. Schedules deferred destruction;
    /// never destroys the API object inline.
    #[doc(hidden)]
    fn destroy(&self, id: u64);
}

pub struct Handle<T: DeviceResource> {
    id: u64,
    ptr: Option<NonNull<T>>,
}

// A handle only hands out `&T`; resources are internally synchronized.
unsafe impl<T: DeviceResource + Sync> Send for Handle<T> {}
unsafe impl<T: DeviceResource + Sync> Sync for Handle<T> {}

impl<T: DeviceResource> Handle<T> {
    /// Wraps a freshly pooled resource. Takes the first reference.
    pub(crate) fn from_raw(id: u64, ptr: NonNull<T>) -> Self {
        unsafe { ptr.as_ref() }.refs().reference();
        Self { id, ptr: Some(ptr) }
    }

    pub fn null() -> Self {
        Self {
            id: NULL_RESOURCE_ID,
            ptr: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    pub fn valid(&self) -> bool {
        self.get().map_or(false, T::valid)
    }

    /// Current shared-ownership count; zero for the null handle.
    pub fn ref_count(&self) -> u64 {
        self.get().map_or(0, |resource| resource.refs().count())
    }

    // The slot stays alive for as long as this handle holds a reference, and
    // pool pages never move.
    pub(crate) fn get(&self) -> Option<&T> {
        self.ptr.map(|ptr| unsafe { ptr.as_ref() })
    }
}

impl<T: DeviceResource> Clone for Handle<T> {
    fn clone(&self) -> Self {
        if let Some(resource) = self.get() {
            resource.refs().reference();
        }
        Self {
            id: self.id,
            ptr: self.ptr,
        }
    }
}

impl<T: DeviceResource> Drop for Handle<T> {
    fn drop(&mut self) {
        if let Some(resource) = self.get() {
            if resource.refs().dereference() == 0 {
                resource.destroy(self.id);
            }
        }
        self.ptr = None;
        self.id = NULL_RESOURCE_ID;
    }
}

impl<T: DeviceResource> Default for Handle<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: DeviceResource> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("null", &self.is_null())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        refs: RefCount,
        destroyed: AtomicUsize,
        alive: bool,
    }

    impl DeviceResource for Probe {
        fn valid(&self) -> bool {
            self.alive
        }

        fn refs(&self) -> &RefCount {
            &self.refs
        }

        fn destroy(&self, _id: u64) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn probe(alive: bool) -> NonNull<Probe> {
        NonNull::from(Box::leak(Box::new(Probe {
            refs: RefCount::default(),
            destroyed: AtomicUsize::new(0),
            alive,
        })))
    }

    #[test]
    fn clone_shares_ownership_and_last_drop_destroys_once() {
        let resource = probe(true);
        let first = Handle::from_raw(7, resource);
        let second = first.clone();
        let third = second.clone();
        assert_eq!(first.ref_count(), 3);

        drop(second);
        drop(first);
        assert_eq!(third.ref_count(), 1);
        assert_eq!(unsafe { resource.as_ref() }.destroyed.load(Ordering::SeqCst), 0);

        drop(third);
        assert_eq!(unsafe { resource.as_ref() }.destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn null_handle_is_inert() {
        let handle: Handle<Probe> = Handle::null();
        assert!(handle.is_null());
        assert!(!handle.valid());
        assert_eq!(handle.id(), NULL_RESOURCE_ID);
        assert_eq!(handle.ref_count(), 0);
        drop(handle.clone());
    }

    #[test]
    fn validity_requires_a_live_api_object() {
        let resource = probe(false);
        let handle = Handle::from_raw(1, resource);
        assert!(!handle.valid());
        assert_eq!(handle.ref_count(), 1);
    }
}
