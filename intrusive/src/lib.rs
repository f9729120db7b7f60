//! Strong/weak shared ownership for heap objects that need a teardown hook.
//!
//! An [`Intrusive<T>`] is a strong (owning) handle and a [`WeakIntrusive<T>`] an observing one.
//! Both counters live in the same heap block as the value, and the usual scheme applies:
//!
//! - `strong` is the number of live [`Intrusive`] handles.
//! - `weak` is the number of live [`WeakIntrusive`] handles, plus one while `strong > 0`.
//!   Hence `strong > 0 => weak > 0`.
//! - Once `strong` reaches zero it never rises again; [`WeakIntrusive::lock`] fails from then on.
//!
//! When the last strong handle goes away, [`IntrusiveTarget::release_resources`] runs exactly
//! once, then the value is dropped. The heap block itself is reclaimed when the last weak handle
//! goes away.
//!
//! The counting is delegated to [`Arc`]/[`Weak`], which implement exactly this scheme with
//! acquire-release strong transitions and a compare-and-swap upgrade.
//!
//! # Example
//!
//! ```
//! use tessera_intrusive::{Intrusive, IntrusiveTarget};
//!
//! struct Block(Vec<u8>);
//!
//! impl IntrusiveTarget for Block {
//!     fn release_resources(&mut self) {
//!         self.0 = Vec::new();
//!     }
//! }
//!
//! let strong = Intrusive::new(Block(vec![0; 16]));
//! let weak = strong.downgrade();
//! assert_eq!(strong.use_count(), 1);
//! assert_eq!(strong.weak_use_count(), 2);
//!
//! drop(strong);
//! assert!(weak.lock().is_none());
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

/// Implemented by values shared through [`Intrusive`].
pub trait IntrusiveTarget {
    /// Called once when the last strong handle is dropped, before the value's destructor.
    ///
    /// Weak handles may still exist at this point but can no longer reach the value.
    fn release_resources(&mut self) {}
}

/// Heap slot holding the shared value. Transparent so raw pointers to the slot and to the value
/// are interchangeable.
#[repr(transparent)]
struct Slot<T: IntrusiveTarget> {
    value: T,
}

impl<T: IntrusiveTarget> Drop for Slot<T> {
    fn drop(&mut self) {
        tracing::trace!(target_type = std::any::type_name::<T>(), "releasing intrusive target");
        self.value.release_resources();
    }
}

/// Strong, owning handle.
pub struct Intrusive<T: IntrusiveTarget> {
    inner: Arc<Slot<T>>,
}

impl<T: IntrusiveTarget> Intrusive<T> {
    /// Move `value` to the heap with `strong = 1, weak = 1`.
    pub fn new(value: T) -> Self {
        let inner = Arc::new(Slot { value });
        debug_assert!(Arc::strong_count(&inner) == 1 && Arc::weak_count(&inner) == 0);
        Self { inner }
    }

    /// Number of strong handles.
    pub fn use_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Number of weak handles plus the implicit one held by the strong handles.
    pub fn weak_use_count(&self) -> usize {
        Arc::weak_count(&self.inner) + 1
    }

    /// True if this is the only strong handle.
    pub fn is_unique(&self) -> bool {
        self.use_count() == 1
    }

    /// Mutable access when no other strong or weak handle exists.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        Arc::get_mut(&mut self.inner).map(|slot| &mut slot.value)
    }

    pub fn downgrade(&self) -> WeakIntrusive<T> {
        WeakIntrusive { inner: Arc::downgrade(&self.inner) }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn as_ptr(&self) -> *const T {
        Arc::as_ptr(&self.inner).cast::<T>()
    }

    /// Give up the handle without touching the counts. The strong reference now travels with the
    /// returned pointer and must come back through [`Intrusive::reclaim`].
    pub fn into_raw(self) -> *const T {
        Arc::into_raw(self.inner).cast::<T>()
    }

    /// Take ownership back from a pointer produced by [`Intrusive::into_raw`]. Counts are not
    /// incremented.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Intrusive::into_raw`] for the same `T`, and each such pointer may be
    /// reclaimed only once.
    pub unsafe fn reclaim(ptr: *const T) -> Self {
        // SAFETY: `Slot<T>` is transparent over `T` and the caller hands back the reference
        // released by `into_raw`.
        let inner = unsafe { Arc::from_raw(ptr.cast::<Slot<T>>()) };
        Self { inner }
    }

    /// Create an additional strong handle from a pointer whose object is still owned elsewhere.
    /// The strong count is incremented.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Intrusive::into_raw`] or [`Intrusive::as_ptr`] for the same `T`,
    /// and at least one strong handle must be alive for the whole call.
    pub unsafe fn reclaim_copy(ptr: *const T) -> Self {
        let slot = ptr.cast::<Slot<T>>();
        // SAFETY: the object is kept alive by another strong handle, so incrementing and then
        // adopting the new reference is sound.
        unsafe {
            Arc::increment_strong_count(slot);
            Self { inner: Arc::from_raw(slot) }
        }
    }
}

impl<T: IntrusiveTarget> Clone for Intrusive<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: IntrusiveTarget> Deref for Intrusive<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<T: IntrusiveTarget> From<T> for Intrusive<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: IntrusiveTarget + fmt::Debug> fmt::Debug for Intrusive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intrusive").field("use_count", &self.use_count()).field("value", &**self).finish()
    }
}

/// Weak, observing handle. Keeps the heap block but not the value alive.
pub struct WeakIntrusive<T: IntrusiveTarget> {
    inner: Weak<Slot<T>>,
}

impl<T: IntrusiveTarget> WeakIntrusive<T> {
    /// Upgrade to a strong handle. Fails once the strong count has reached zero.
    pub fn lock(&self) -> Option<Intrusive<T>> {
        self.inner.upgrade().map(|inner| Intrusive { inner })
    }

    /// Number of strong handles still alive.
    pub fn use_count(&self) -> usize {
        self.inner.strong_count()
    }

    /// Weak handles plus the implicit strong one. Informational only: it reads zero once the
    /// value is gone.
    pub fn weak_use_count(&self) -> usize {
        match self.inner.strong_count() {
            0 => 0,
            _ => self.inner.weak_count() + 1,
        }
    }

    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: IntrusiveTarget> Clone for WeakIntrusive<T> {
    fn clone(&self) -> Self {
        Self { inner: Weak::clone(&self.inner) }
    }
}

impl<T: IntrusiveTarget> fmt::Debug for WeakIntrusive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakIntrusive").field("use_count", &self.use_count()).finish()
    }
}
