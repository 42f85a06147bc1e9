//! Descriptor cache.
//!
//! Descriptors are built on first use of an entity type and kept for the
//! life of the cache. Type shapes are static, so entries are never
//! invalidated.

use std::any::{type_name, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::descriptor::TableDescriptor;
use super::entity::Entity;
use crate::error::Result;

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    /// Get hit count.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Get miss count (descriptor builds).
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

/// Table descriptors keyed by entity type.
///
/// Concurrent first use of a type may build its descriptor more than once;
/// the builds are equivalent and the last insert wins.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: DashMap<TypeId, Arc<TableDescriptor>>,
    stats: CacheStats,
}

impl DescriptorCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the descriptor for `T`, building it on first use.
    ///
    /// A mapping that cannot be resolved fails with a mapping error and
    /// nothing is cached.
    pub fn descriptor<T: Entity>(&self) -> Result<Arc<TableDescriptor>> {
        let id = TypeId::of::<T>();
        if let Some(entry) = self.entries.get(&id) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(entry.value()));
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        let descriptor = Arc::new(TableDescriptor::build(&T::mapping())?);
        debug!(
            entity = type_name::<T>(),
            table = %descriptor.table,
            key_policy = ?descriptor.key_policy,
            columns = descriptor.columns.len(),
            "Built table descriptor"
        );
        self.entries.insert(id, Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Check if a descriptor for `T` is cached.
    pub fn contains<T: Entity>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
