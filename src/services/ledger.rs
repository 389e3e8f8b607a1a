use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::SubgateError;
use crate::models::{NewSubscription, SubscriptionRecord};

/// Boundary to the persistent subscription store. The store owns the
/// records; this core only inserts unverified rows and flips them to
/// verified. Transaction-hash uniqueness is enforced here so one payment
/// can never credit two subscriptions.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn insert_unverified(
        &self,
        new: NewSubscription,
    ) -> Result<SubscriptionRecord, SubgateError>;

    async fn mark_verified(
        &self,
        id: Uuid,
        verified_at: DateTime<Utc>,
    ) -> Result<(), SubgateError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionRecord>, SubgateError>;

    async fn find_by_tx_hash(
        &self,
        tx_hash: &str,
    ) -> Result<Option<SubscriptionRecord>, SubgateError>;

    /// All records, newest first. Admin-view read; never touches a chain.
    async fn list(&self) -> Result<Vec<SubscriptionRecord>, SubgateError>;
}

#[derive(Default)]
struct LedgerState {
    by_id: HashMap<Uuid, SubscriptionRecord>,
    id_by_hash: HashMap<String, Uuid>,
}

/// In-memory ledger used by the binary and the tests. The production store
/// lives behind the same trait.
#[derive(Default)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn insert_unverified(
        &self,
        new: NewSubscription,
    ) -> Result<SubscriptionRecord, SubgateError> {
        let mut state = self.state.write().await;
        if state.id_by_hash.contains_key(&new.tx_hash) {
            return Err(SubgateError::DuplicateTransaction(new.tx_hash));
        }

        let record = SubscriptionRecord {
            id: Uuid::new_v4(),
            user_address: new.user_address,
            user_name: new.user_name,
            user_email: new.user_email,
            user_phone: new.user_phone,
            package_name: new.package_name,
            amount: new.amount,
            network: new.network,
            tx_hash: new.tx_hash,
            tx_verified: false,
            verified_at: None,
            created_at: Utc::now(),
        };
        state.id_by_hash.insert(record.tx_hash.clone(), record.id);
        state.by_id.insert(record.id, record.clone());
        Ok(record)
    }

    async fn mark_verified(
        &self,
        id: Uuid,
        verified_at: DateTime<Utc>,
    ) -> Result<(), SubgateError> {
        let mut state = self.state.write().await;
        let record = state
            .by_id
            .get_mut(&id)
            .ok_or(SubgateError::SubscriptionNotFound)?;
        // Written exactly once; a repeat verification leaves the original
        // timestamp untouched.
        if !record.tx_verified {
            record.tx_verified = true;
            record.verified_at = Some(verified_at);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionRecord>, SubgateError> {
        Ok(self.state.read().await.by_id.get(&id).cloned())
    }

    async fn find_by_tx_hash(
        &self,
        tx_hash: &str,
    ) -> Result<Option<SubscriptionRecord>, SubgateError> {
        let state = self.state.read().await;
        Ok(state
            .id_by_hash
            .get(tx_hash)
            .and_then(|id| state.by_id.get(id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<SubscriptionRecord>, SubgateError> {
        let mut records: Vec<_> = self.state.read().await.by_id.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
