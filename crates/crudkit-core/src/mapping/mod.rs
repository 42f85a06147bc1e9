//! Entity mappings, table descriptors and the descriptor cache.

mod cache;
mod descriptor;
mod entity;
mod types;

pub use cache::{CacheStats, DescriptorCache};
pub use descriptor::{ColumnDescriptor, KeyPolicy, TableDescriptor};
pub use entity::{Entity, EntityMapping, FieldMapping, Key, KeyAnnotation};
pub use types::ScalarType;
