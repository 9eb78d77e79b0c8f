//! Store keys and namespace masks

use std::fmt;
use std::hash::Hash;

use crate::identity::{Identity, ZoneId};

/// Integer key into the store.
///
/// Keys are derived from human-readable names with a version-stable hash, so
/// the same name yields the same key in every process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey(pub u64);

impl StoreKey {
    /// Derives a key from a name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self(fxhash::hash64(name.as_bytes()))
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Anything that can scope a store view.
///
/// The mask is XOR-ed into every key, so nesting two scopes equals one scope
/// with both masks applied, in either order.
pub trait Namespace {
    /// Returns the mask for this scope.
    fn namespace_mask(&self) -> u64;
}

fn tagged<T: Hash>(tag: &str, value: T) -> u64 {
    fxhash::hash64(&(tag, value))
}

impl Namespace for Identity {
    fn namespace_mask(&self) -> u64 {
        tagged("identity", self.pack())
    }
}

impl Namespace for ZoneId {
    fn namespace_mask(&self) -> u64 {
        tagged("zone", self.0)
    }
}

impl Namespace for StoreKey {
    fn namespace_mask(&self) -> u64 {
        self.0
    }
}

impl Namespace for str {
    fn namespace_mask(&self) -> u64 {
        tagged("scope", self)
    }
}

impl Namespace for u64 {
    fn namespace_mask(&self) -> u64 {
        *self
    }
}

impl<T: Namespace + ?Sized> Namespace for &T {
    fn namespace_mask(&self) -> u64 {
        (**self).namespace_mask()
    }
}
