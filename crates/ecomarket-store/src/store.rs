//! The [`StateStore`] trait: atomic primitives over shared state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Convenience alias for an injected store.
pub type SharedStore = Arc<dyn StateStore>;

/// Atomic operations over the shared key/value backend.
///
/// Every method is a single backend round-trip. Callers must never
/// compose a read with a dependent write and assume no interleaving -
/// multiple central replicas share one store.
#[async_trait]
pub trait StateStore: Send + Sync {
    // =========================================================================
    // Locks & Counters
    // =========================================================================

    /// Atomic set-if-absent with expiry. Returns `true` if this caller
    /// created the key (acquired the lock), `false` if a non-expired value
    /// already existed.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool>;

    /// Atomically increments a counter, returning the new value.
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    // =========================================================================
    // Hashes (inventory, user data)
    // =========================================================================

    /// Replaces a hash field in one operation.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;

    /// Reads a hash field.
    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Reads all values of a hash.
    async fn hash_values(&self, key: &str) -> StoreResult<Vec<String>>;

    // =========================================================================
    // Lists (sale history, retry queue)
    // =========================================================================

    /// Appends to the tail of a list.
    async fn list_push_back(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Pops from the head of a list, or `None` if empty.
    async fn list_pop_front(&self, key: &str) -> StoreResult<Option<String>>;

    /// Returns the inclusive range `[start, stop]`, negative indices
    /// counting from the tail (Redis LRANGE semantics).
    async fn list_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    /// Trims a list to the inclusive range `[start, stop]`.
    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> StoreResult<()>;

    /// Length of a list.
    async fn list_len(&self, key: &str) -> StoreResult<u64>;
}
