use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a live GPU object.
///
/// Ids are process-unique and never reused. `ResourceId::NULL` (zero) marks an
/// empty handle: default-constructed, moved-out, or released.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceId(u64);

impl ResourceId {
    pub const NULL: ResourceId = ResourceId(0);

    /// Allocates a fresh non-zero id.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Common contract of every exclusively owned GPU object wrapper.
///
/// Handles are move-only. Taking a handle out of a slot goes through
/// `std::mem::take`, which leaves a null (unusable) handle behind. Assigning
/// over a live handle drops, and therefore releases, the previous object.
pub trait GpuHandle {
    fn id(&self) -> ResourceId;

    /// True iff the handle currently owns a GPU object.
    fn is_usable(&self) -> bool {
        !self.id().is_null()
    }

    /// Frees the GPU object and resets the id to null. Idempotent.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_non_null() {
        let a = ResourceId::next();
        let b = ResourceId::next();
        assert!(!a.is_null());
        assert!(!b.is_null());
        assert_ne!(a, b);
    }

    #[test]
    fn default_id_is_null() {
        assert!(ResourceId::default().is_null());
        assert_eq!(ResourceId::default(), ResourceId::NULL);
    }
}
