//! Namespaced keyed state store
//!
//! A schemaless map from integer keys to [`Value`]s shared by every component
//! of the referee. Callers agree on key constants by name ([`StoreKey::named`])
//! and scope them with [`Store::with_namespace`].
//!
//! Reading a key that was never written (or has expired, or holds a value of
//! another type) yields the type's default. Use [`Store::exists`] or
//! [`Store::try_load`] to tell "absent" from "zero".
//!
//! The backing map is a `DashMap`, so presentation and telemetry readers can
//! read concurrently. Writes are serialized by the referee's tick.

pub mod key;
pub mod value;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use crate::scheduler::MatchClock;

pub use key::{Namespace, StoreKey};
pub use value::{StoreValue, Value};

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    /// Match time after which the entry is gone
    expires_at: Option<f64>,
}

impl Entry {
    fn is_expired(&self, now: f64) -> bool {
        self.expires_at.is_some_and(|t| t < now)
    }
}

/// View over the shared store.
///
/// Cloning is cheap and yields a view over the same backing map.
#[derive(Clone)]
pub struct Store {
    entries: Arc<DashMap<u64, Entry>>,
    clock: MatchClock,
    mask: u64,
}

impl Store {
    /// Creates an empty store whose TTLs are measured on `clock`.
    #[must_use]
    pub fn new(clock: MatchClock) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            clock,
            mask: 0,
        }
    }

    /// Returns a view whose keys are additionally scoped by `source`.
    ///
    /// `store.with_namespace(a).with_namespace(b)` addresses the same slots
    /// as `store.with_namespace(b).with_namespace(a)`.
    #[must_use]
    pub fn with_namespace(&self, source: impl Namespace) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            clock: self.clock.clone(),
            mask: self.mask ^ source.namespace_mask(),
        }
    }

    /// Combined mask of this view.
    #[must_use]
    pub const fn mask(&self) -> u64 {
        self.mask
    }

    /// The clock TTLs are measured on.
    #[must_use]
    pub const fn clock(&self) -> &MatchClock {
        &self.clock
    }

    const fn slot(&self, key: StoreKey) -> u64 {
        key.0 ^ self.mask
    }

    /// Reads a live entry, deleting it if it has expired.
    fn read<R>(&self, key: StoreKey, f: impl FnOnce(&Value) -> R) -> Option<R> {
        let slot = self.slot(key);
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(&slot) {
            if !entry.is_expired(now) {
                return Some(f(&entry.value));
            }
        } else {
            return None;
        }
        self.entries.remove_if(&slot, |_, e| e.is_expired(now));
        debug!(key = %key, "expired entry removed on read");
        None
    }

    /// Loads `key`, or `T::default()` when absent.
    #[must_use]
    pub fn load<T: StoreValue>(&self, key: StoreKey) -> T {
        self.try_load(key).unwrap_or_default()
    }

    /// Loads `key`, or `None` when absent, expired, or of another type.
    #[must_use]
    pub fn try_load<T: StoreValue>(&self, key: StoreKey) -> Option<T> {
        self.read(key, |value| {
            let typed = T::from_value(value);
            if typed.is_none() {
                debug!(key = %key, ?value, "stored value has a different type");
            }
            typed
        })
        .flatten()
    }

    /// Whether `key` holds a live value.
    #[must_use]
    pub fn exists(&self, key: StoreKey) -> bool {
        self.read(key, |_| ()).is_some()
    }

    /// Stores `value` under `key` with no expiry.
    pub fn save<T: StoreValue>(&self, key: StoreKey, value: T) {
        self.entries.insert(
            self.slot(key),
            Entry {
                value: value.into_value(),
                expires_at: None,
            },
        );
    }

    /// Stores `value` under `key` until `ttl` of match time has passed.
    pub fn save_with_timeout<T: StoreValue>(&self, key: StoreKey, value: T, ttl: Duration) {
        self.entries.insert(
            self.slot(key),
            Entry {
                value: value.into_value(),
                expires_at: Some(self.clock.now() + ttl.as_secs_f64()),
            },
        );
    }

    /// Applies `f` to the current value (default if absent) and stores the result.
    ///
    /// Returns the stored value.
    pub fn update<T: StoreValue + Clone>(&self, key: StoreKey, f: impl FnOnce(T) -> T) -> T {
        let next = f(self.load(key));
        self.save(key, next.clone());
        next
    }

    /// Removes `key`.
    pub fn delete(&self, key: StoreKey) {
        self.entries.remove(&self.slot(key));
    }

    /// Removes every entry from the shared backing map.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of entries in the backing map, including not-yet-observed
    /// expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the backing map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Live entries of the whole backing map, keyed by raw slot.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<u64, Value> {
        let now = self.clock.now();
        self.entries
            .iter()
            .filter(|e| !e.is_expired(now))
            .map(|e| (*e.key(), e.value.clone()))
            .collect()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("mask", &format_args!("{:#018x}", self.mask))
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
