//! Persistence seams consumed by the engine.
//!
//! Stores hand out owned copies and write back whole records, so the
//! engine can stage mutations on local copies and save them only once
//! every check has passed. The in-memory implementations back the
//! tests, the bench, and the replay binary.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use thiserror::Error;

use crate::model::{
    Claim, ClaimId, ClaimStatus, Customer, CustomerId, Notification, Reward, RewardId, UserId,
};

pub trait CustomerStore {
    fn get_customer(&self, id: CustomerId) -> Option<Customer>;
    fn save_customer(&mut self, customer: Customer);
    /// All customers, ordered by id. Backs the standings report.
    fn list_customers(&self) -> Vec<Customer>;
}

pub trait RewardStore {
    fn get_reward(&self, id: RewardId) -> Option<Reward>;
    fn save_reward(&mut self, reward: Reward);
}

pub trait ClaimStore {
    /// Allocate the next claim id. Id allocation is a persistence
    /// concern (autoincrement in a database-backed store).
    fn next_claim_id(&mut self) -> ClaimId;
    fn get_claim(&self, id: ClaimId) -> Option<Claim>;
    fn claims_by_customer_and_status(
        &self,
        customer: CustomerId,
        status: ClaimStatus,
    ) -> Vec<Claim>;
    fn save_claim(&mut self, claim: Claim);
    fn delete_claim(&mut self, id: ClaimId);
}

/// The notification sink failed to persist a message. Delivery is
/// best-effort; the engine logs this and carries on.
#[derive(Debug, Error)]
#[error("notification sink failed: {0}")]
pub struct SinkError(pub String);

/// Fire-and-forget message delivery.
pub trait NotificationSink {
    fn emit(&mut self, recipient: UserId, message: String) -> Result<(), SinkError>;
}

/// In-memory store over all three record kinds. Claims live in a
/// `BTreeMap` so listings come out in id order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    customers: HashMap<CustomerId, Customer>,
    rewards: HashMap<RewardId, Reward>,
    claims: BTreeMap<ClaimId, Claim>,
    next_claim_id: ClaimId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CustomerStore for MemoryStore {
    fn get_customer(&self, id: CustomerId) -> Option<Customer> {
        self.customers.get(&id).cloned()
    }

    fn save_customer(&mut self, customer: Customer) {
        self.customers.insert(customer.id, customer);
    }

    fn list_customers(&self) -> Vec<Customer> {
        let mut customers: Vec<Customer> = self.customers.values().cloned().collect();
        customers.sort_by_key(|c| c.id);
        customers
    }
}

impl RewardStore for MemoryStore {
    fn get_reward(&self, id: RewardId) -> Option<Reward> {
        self.rewards.get(&id).cloned()
    }

    fn save_reward(&mut self, reward: Reward) {
        self.rewards.insert(reward.id, reward);
    }
}

impl ClaimStore for MemoryStore {
    fn next_claim_id(&mut self) -> ClaimId {
        self.next_claim_id += 1;
        self.next_claim_id
    }

    fn get_claim(&self, id: ClaimId) -> Option<Claim> {
        self.claims.get(&id).cloned()
    }

    fn claims_by_customer_and_status(
        &self,
        customer: CustomerId,
        status: ClaimStatus,
    ) -> Vec<Claim> {
        self.claims
            .values()
            .filter(|c| c.customer_id == customer && c.status == status)
            .cloned()
            .collect()
    }

    fn save_claim(&mut self, claim: Claim) {
        self.claims.insert(claim.id, claim);
    }

    fn delete_claim(&mut self, id: ClaimId) {
        self.claims.remove(&id);
    }
}

/// In-memory notification sink that persists messages.
#[derive(Debug, Default)]
pub struct MemoryNotifications {
    notifications: Vec<Notification>,
    next_id: u64,
}

impl MemoryNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn for_recipient(&self, recipient: UserId) -> Vec<&Notification> {
        self.notifications
            .iter()
            .filter(|n| n.recipient == recipient)
            .collect()
    }
}

impl NotificationSink for MemoryNotifications {
    fn emit(&mut self, recipient: UserId, message: String) -> Result<(), SinkError> {
        self.next_id += 1;
        self.notifications.push(Notification {
            id: self.next_id,
            recipient,
            message,
            created_at: Utc::now(),
            is_read: false,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_ids_are_sequential() {
        let mut store = MemoryStore::new();
        assert_eq!(store.next_claim_id(), 1);
        assert_eq!(store.next_claim_id(), 2);
    }

    #[test]
    fn save_customer_overwrites() {
        let mut store = MemoryStore::new();
        store.save_customer(Customer::new(1, "Awa", 100));

        let mut customer = store.get_customer(1).unwrap();
        customer.tokens = 40;
        store.save_customer(customer);

        assert_eq!(store.get_customer(1).unwrap().tokens, 40);
    }

    #[test]
    fn claims_filtered_by_customer_and_status() {
        let mut store = MemoryStore::new();
        let mut claim = Claim::new(1, 7, 3);
        store.save_claim(claim.clone());
        claim.id = 2;
        claim.status = ClaimStatus::Pending;
        store.save_claim(claim.clone());
        claim.id = 3;
        claim.customer_id = 8;
        claim.status = ClaimStatus::Cart;
        store.save_claim(claim);

        let cart = store.claims_by_customer_and_status(7, ClaimStatus::Cart);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].id, 1);

        let pending = store.claims_by_customer_and_status(7, ClaimStatus::Pending);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, 2);
    }

    #[test]
    fn delete_claim_removes_it() {
        let mut store = MemoryStore::new();
        store.save_claim(Claim::new(1, 7, 3));
        store.delete_claim(1);
        assert!(store.get_claim(1).is_none());
    }

    #[test]
    fn notifications_recorded_per_recipient() {
        let mut sink = MemoryNotifications::new();
        sink.emit(1, "hello".to_string()).unwrap();
        sink.emit(2, "world".to_string()).unwrap();
        sink.emit(1, "again".to_string()).unwrap();

        assert_eq!(sink.all().len(), 3);
        assert_eq!(sink.for_recipient(1).len(), 2);
        assert!(!sink.all()[0].is_read);
    }
}
