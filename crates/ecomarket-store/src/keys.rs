//! Canonical key names for the shared store.
//!
//! These strings are part of the deployed data layout; changing one orphans
//! existing state.

/// Hash holding the central inventory-of-record (field = product id).
pub const INVENTORY_HASH: &str = "central_inventory";

/// List holding the bounded global sale history.
pub const SALES_HISTORY_LIST: &str = "central_sales_history";

/// Atomic counter of globally registered users.
pub const USER_COUNT: &str = "global_user_count";

/// Hash of registered users (field = email).
pub const USERS_HASH: &str = "global_user_data";

/// Default branch-side durable retry queue (dispatch mode 4).
pub const SALES_RETRY_QUEUE: &str = "sales_queue_redis";

/// Idempotency lock key for a sale event.
pub fn sale_lock(sale_id: &str) -> String {
    format!("sale_lock:{sale_id}")
}

/// Idempotency lock key for a user-lifecycle event.
pub fn user_event_lock(message_id: &str) -> String {
    format!("user_event_lock:{message_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_key_shapes() {
        assert_eq!(sale_lock("b1_42"), "sale_lock:b1_42");
        assert_eq!(user_event_lock("m-7"), "user_event_lock:m-7");
    }
}
