//! # User-Lifecycle Event Consumers
//!
//! Two consumer roles subscribe to the user fanout exchange, each with its
//! own exclusive queue so both see every event:
//!
//! - **Notifications** simulates the welcome email (logged only).
//! - **Statistics** maintains the global user count and registry, behind
//!   its own idempotency lock (`user_event_lock:{message_id}`) because
//!   fanout redelivery would otherwise double-count.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use ecomarket_store::{keys, SharedStore, StateStore};
use ecomarket_sync::{BrokerMessage, MessageHandler, SyncResult, UserEvent};

/// What a consumer does with a user event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Notifications,
    Statistics,
}

impl UserRole {
    pub fn label(self) -> &'static str {
        match self {
            UserRole::Notifications => "notifications",
            UserRole::Statistics => "statistics",
        }
    }
}

/// Handles user events for one role.
#[derive(Clone)]
pub struct UserEventProcessor {
    store: SharedStore,
    role: UserRole,
    dedup_ttl: Duration,
}

impl UserEventProcessor {
    pub fn new(store: SharedStore, role: UserRole, dedup_ttl: Duration) -> Self {
        UserEventProcessor {
            store,
            role,
            dedup_ttl,
        }
    }

    async fn process(&self, user: UserEvent) -> SyncResult<()> {
        match self.role {
            UserRole::Notifications => {
                // Email delivery is out of scope; the send is simulated.
                info!(
                    email = %user.email,
                    name = %user.name,
                    source = %user.source,
                    "welcome email sent (simulated)"
                );
                Ok(())
            }
            UserRole::Statistics => {
                let lock_key = keys::user_event_lock(&user.message_id);
                if !self
                    .store
                    .set_nx_ex(&lock_key, "counted", self.dedup_ttl)
                    .await?
                {
                    info!(message_id = %user.message_id, "duplicate user event, statistics skipped");
                    return Ok(());
                }
                let count = self.store.incr(keys::USER_COUNT).await?;
                let value = serde_json::to_string(&user)?;
                self.store
                    .hash_set(keys::USERS_HASH, &user.email, &value)
                    .await?;
                info!(
                    email = %user.email,
                    global_user_count = count,
                    "user registered in global statistics"
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl MessageHandler for UserEventProcessor {
    async fn handle(&self, message: BrokerMessage) -> SyncResult<()> {
        match message {
            BrokerMessage::UserCreated(user) => self.process(user).await,
            other => {
                warn!(role = self.role.label(), message = ?other, "unexpected message on user binding, ignored");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use ecomarket_store::{MemoryStore, StateStore};

    fn user(message_id: &str, email: &str) -> UserEvent {
        UserEvent {
            message_id: message_id.into(),
            name: "Ada".into(),
            email: email.into(),
            timestamp: Utc::now(),
            source: "branch-1".into(),
        }
    }

    fn processor(store: SharedStore, role: UserRole) -> UserEventProcessor {
        UserEventProcessor::new(store, role, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_statistics_counts_each_event_once() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let p = processor(Arc::clone(&store), UserRole::Statistics);

        p.handle(BrokerMessage::UserCreated(user("m-1", "ada@example.com")))
            .await
            .unwrap();
        p.handle(BrokerMessage::UserCreated(user("m-1", "ada@example.com")))
            .await
            .unwrap();
        p.handle(BrokerMessage::UserCreated(user("m-2", "bob@example.com")))
            .await
            .unwrap();

        // Next increment would be 3 if both originals counted; duplicate
        // skipped means the counter sits at 2.
        assert_eq!(store.incr(keys::USER_COUNT).await.unwrap(), 3);
        assert_eq!(store.hash_values(keys::USERS_HASH).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_notifications_role_touches_no_state() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let p = processor(Arc::clone(&store), UserRole::Notifications);
        p.handle(BrokerMessage::UserCreated(user("m-1", "ada@example.com")))
            .await
            .unwrap();
        assert!(store.hash_values(keys::USERS_HASH).await.unwrap().is_empty());
        assert_eq!(store.incr(keys::USER_COUNT).await.unwrap(), 1);
    }
}
