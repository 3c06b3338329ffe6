//! Claim settlement engine.
//!
//! The engine owns the claim lifecycle (cart, pending, validated,
//! cancelled) and the settlement that debits customer jetons and
//! decrements reward stock. Also supports an async stream of
//! operations.
//!
//! Every mutating operation takes `&mut self`, so settlements of the
//! same claim or debits of the same balance are serialized by
//! exclusive access. Within an operation all loads and checks precede
//! all saves, and saves write locally staged copies; an error path
//! never leaves a partial debit or decrement behind.

use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::model::{
    Claim, ClaimId, ClaimStatus, CustomerId, Operation, RewardId, Role, UserId,
};
use crate::store::{
    ClaimStore, CustomerStore, MemoryNotifications, MemoryStore, NotificationSink, RewardStore,
};
use crate::tier::{TierStanding, TierTable};

mod error;
pub use error::{CartError, EngineError, OrderError, SettleError};

/// One cart line as reported by [`Engine::cart_summary`].
#[derive(Debug, Clone)]
pub struct CartItem {
    pub claim_id: ClaimId,
    pub reward_id: RewardId,
    pub title: String,
    pub token_cost: u64,
}

/// Snapshot of a customer's cart against their balance.
#[derive(Debug, Clone)]
pub struct CartSummary {
    pub tokens_available: u64,
    pub tokens_required: u64,
    pub purchase_possible: bool,
    pub items: Vec<CartItem>,
}

/// Result of placing an order: the claims now pending validation.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub claim_ids: Vec<ClaimId>,
    pub total_tokens: u64,
}

/// Result of a settlement operation.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub claim_id: ClaimId,
    pub new_status: ClaimStatus,
    pub message: String,
}

/// A customer's balance and resolved tier standing.
#[derive(Debug, Clone)]
pub struct CustomerStanding {
    pub customer_id: CustomerId,
    pub tokens: u64,
    pub standing: TierStanding,
}

/// The claim settlement engine.
///
/// Generic over the persistence seams so tests and the replay binary
/// can run against the in-memory stores.
pub struct Engine<S = MemoryStore, N = MemoryNotifications> {
    store: S,
    notifications: N,
    tiers: TierTable,
}

impl Engine<MemoryStore, MemoryNotifications> {
    /// Engine over fresh in-memory stores and the default tier ladder.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), MemoryNotifications::new())
    }
}

impl Default for Engine<MemoryStore, MemoryNotifications> {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Public API
impl<S, N> Engine<S, N>
where
    S: CustomerStore + RewardStore + ClaimStore,
    N: NotificationSink,
{
    pub fn new(store: S, notifications: N) -> Self {
        Self::with_tiers(store, notifications, TierTable::default())
    }

    pub fn with_tiers(store: S, notifications: N, tiers: TierTable) -> Self {
        Self {
            store,
            notifications,
            tiers,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Direct store access, for seeding customers and rewards.
    /// Balance and stock mutation stays with the engine.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn notifications(&self) -> &N {
        &self.notifications
    }

    /// Run the engine with the given operation stream. Failed
    /// operations are logged and skipped.
    pub async fn run(&mut self, mut stream: impl Stream<Item = Operation> + Unpin) {
        while let Some(op) = stream.next().await {
            let _ = self.apply(op);
        }
    }

    /// Apply a single operation on top of the current engine state.
    pub fn apply(&mut self, op: Operation) -> Result<(), EngineError> {
        match op {
            Operation::AddToCart {
                customer,
                reward,
                quantity,
            } => {
                let result = self.add_to_cart(customer, reward, quantity);
                Self::log_result("add_to_cart", customer, &result);
                result?;
            }
            Operation::RemoveFromCart { customer, claim } => {
                let result = self.remove_from_cart(customer, claim);
                Self::log_result("remove_from_cart", claim, &result);
                result?;
            }
            Operation::PlaceOrder { customer } => {
                let result = self.place_order(customer);
                Self::log_result("place_order", customer, &result);
                result?;
            }
            Operation::Validate { claim, admin, role } => {
                let result = self.validate(claim, admin, role);
                Self::log_result("validate", claim, &result);
                result?;
            }
            Operation::Cancel { claim, admin, role } => {
                let result = self.cancel(claim, admin, role);
                Self::log_result("cancel", claim, &result);
                result?;
            }
        }
        Ok(())
    }

    /// Put `quantity` units of a reward into the customer's cart.
    ///
    /// Creates one single-unit claim per requested unit; adding the
    /// same reward again stacks further claims (no deduplication).
    /// Balance and stock are untouched here.
    pub fn add_to_cart(
        &mut self,
        customer: CustomerId,
        reward: RewardId,
        quantity: u32,
    ) -> Result<Vec<ClaimId>, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let reward_record = self
            .store
            .get_reward(reward)
            .ok_or(CartError::RewardNotFound(reward))?;

        if self.store.get_customer(customer).is_none() {
            return Err(CartError::CustomerNotFound(customer));
        }

        if reward_record.stock < quantity as u64 {
            return Err(CartError::InsufficientStock {
                reward,
                requested: quantity,
                available: reward_record.stock,
            });
        }

        let mut claim_ids = Vec::with_capacity(quantity as usize);
        for _ in 0..quantity {
            let id = self.store.next_claim_id();
            self.store.save_claim(Claim::new(id, customer, reward));
            claim_ids.push(id);
        }

        Ok(claim_ids)
    }

    /// Remove a claim from the cart. Only the owning customer may
    /// remove it, and only while it is still in the `Cart` state.
    pub fn remove_from_cart(
        &mut self,
        customer: CustomerId,
        claim: ClaimId,
    ) -> Result<(), CartError> {
        let record = self
            .store
            .get_claim(claim)
            .ok_or(CartError::NotInCart(claim))?;

        if record.customer_id != customer || record.status != ClaimStatus::Cart {
            return Err(CartError::NotInCart(claim));
        }

        self.store.delete_claim(claim);
        Ok(())
    }

    /// View the customer's cart against their current balance.
    pub fn cart_summary(&self, customer: CustomerId) -> Result<CartSummary, CartError> {
        let customer_record = self
            .store
            .get_customer(customer)
            .ok_or(CartError::CustomerNotFound(customer))?;

        let mut items = Vec::new();
        let mut required = 0u64;
        for claim in self
            .store
            .claims_by_customer_and_status(customer, ClaimStatus::Cart)
        {
            let Some(reward) = self.store.get_reward(claim.reward_id) else {
                continue;
            };
            required += reward.token_cost;
            items.push(CartItem {
                claim_id: claim.id,
                reward_id: reward.id,
                title: reward.title,
                token_cost: reward.token_cost,
            });
        }

        Ok(CartSummary {
            tokens_available: customer_record.tokens,
            tokens_required: required,
            purchase_possible: customer_record.tokens >= required,
            items,
        })
    }

    /// Place an order: move the customer's cart claims to `Pending`.
    ///
    /// Affordability is checked up front, but the debit only happens
    /// at validation. Claims whose reward no longer exists stay in
    /// the cart.
    pub fn place_order(&mut self, customer: CustomerId) -> Result<OrderSummary, OrderError> {
        let customer_record = self
            .store
            .get_customer(customer)
            .ok_or(OrderError::CustomerNotFound(customer))?;

        let cart = self
            .store
            .claims_by_customer_and_status(customer, ClaimStatus::Cart);

        let mut priced = Vec::new();
        let mut total = 0u64;
        for claim in cart {
            if let Some(reward) = self.store.get_reward(claim.reward_id) {
                total += reward.token_cost;
                priced.push(claim);
            }
        }
        if priced.is_empty() {
            return Err(OrderError::EmptyCart(customer));
        }

        if customer_record.tokens < total {
            return Err(OrderError::InsufficientBalance {
                customer,
                available: customer_record.tokens,
                required: total,
            });
        }

        let claim_ids: Vec<ClaimId> = priced.iter().map(|c| c.id).collect();
        for mut claim in priced {
            claim.status = ClaimStatus::Pending;
            self.store.save_claim(claim);
        }

        self.notify(
            customer,
            format!(
                "Your order of {total} jetons has been recorded and is awaiting \
                 validation by the administrator."
            ),
        );

        Ok(OrderSummary {
            claim_ids,
            total_tokens: total,
        })
    }

    /// Validate a pending claim: debit the customer's jetons by the
    /// reward cost, decrement stock by one, and finalize the claim.
    ///
    /// An out-of-stock reward is recovered locally: the claim
    /// auto-cancels, the customer keeps their jetons, and both
    /// parties are notified.
    pub fn validate(
        &mut self,
        claim_id: ClaimId,
        admin: UserId,
        role: Role,
    ) -> Result<Settlement, SettleError> {
        if !role.may_settle() {
            return Err(SettleError::Forbidden(role));
        }

        let mut claim = self
            .store
            .get_claim(claim_id)
            .ok_or(SettleError::ClaimNotFound(claim_id))?;
        Self::check_pending(&claim)?;

        let mut reward = self
            .store
            .get_reward(claim.reward_id)
            .ok_or(SettleError::RewardNotFound(claim.reward_id))?;

        if reward.stock < 1 {
            let customer_id = claim.customer_id;
            let title = reward.title;
            claim.status = ClaimStatus::Cancelled;
            self.store.save_claim(claim);
            self.notify(
                customer_id,
                format!("Your order {claim_id} was cancelled because {title} is out of stock."),
            );
            self.notify(
                admin,
                format!("Order {claim_id} was cancelled because {title} is out of stock."),
            );
            return Ok(Settlement {
                claim_id,
                new_status: ClaimStatus::Cancelled,
                message: format!("order {claim_id} cancelled, insufficient stock"),
            });
        }

        let mut customer = self
            .store
            .get_customer(claim.customer_id)
            .ok_or(SettleError::CustomerNotFound(claim.customer_id))?;

        if customer.tokens < reward.token_cost {
            return Err(SettleError::InsufficientBalance {
                customer: customer.id,
                available: customer.tokens,
                required: reward.token_cost,
            });
        }

        let customer_id = customer.id;
        let customer_name = customer.name.clone();
        let agency = customer
            .agency
            .clone()
            .unwrap_or_else(|| "your agency".to_string());
        let title = reward.title.clone();

        // Commit point: every check has passed, write all three records.
        customer.tokens -= reward.token_cost;
        reward.stock -= 1;
        claim.status = ClaimStatus::Validated;
        self.store.save_customer(customer);
        self.store.save_reward(reward);
        self.store.save_claim(claim);

        self.notify(
            customer_id,
            format!(
                "Your order {claim_id} for {title} has been validated. \
                 Visit the {agency} agency to pick it up."
            ),
        );
        self.notify(
            admin,
            format!("Order {claim_id} from {customer_name} for {title} has been validated."),
        );

        Ok(Settlement {
            claim_id,
            new_status: ClaimStatus::Validated,
            message: format!("order {claim_id} validated"),
        })
    }

    /// Cancel a pending claim. Jetons were never debited at the
    /// pending stage, so balance and stock are untouched.
    pub fn cancel(
        &mut self,
        claim_id: ClaimId,
        admin: UserId,
        role: Role,
    ) -> Result<Settlement, SettleError> {
        if !role.may_settle() {
            return Err(SettleError::Forbidden(role));
        }

        let mut claim = self
            .store
            .get_claim(claim_id)
            .ok_or(SettleError::ClaimNotFound(claim_id))?;
        Self::check_pending(&claim)?;

        let customer_id = claim.customer_id;
        let title = self
            .store
            .get_reward(claim.reward_id)
            .map(|r| r.title)
            .unwrap_or_else(|| "the item".to_string());

        claim.status = ClaimStatus::Cancelled;
        self.store.save_claim(claim);

        self.notify(
            customer_id,
            format!(
                "Your order {claim_id} for {title} was cancelled. \
                 Your jetons were not debited."
            ),
        );
        self.notify(admin, format!("Order {claim_id} has been cancelled."));

        Ok(Settlement {
            claim_id,
            new_status: ClaimStatus::Cancelled,
            message: format!("order {claim_id} cancelled"),
        })
    }

    /// A customer's balance with its resolved tier standing, as shown
    /// on the dashboard and profile.
    pub fn standing(&self, customer: CustomerId) -> Option<CustomerStanding> {
        let customer = self.store.get_customer(customer)?;
        Some(CustomerStanding {
            customer_id: customer.id,
            tokens: customer.tokens,
            standing: self.tiers.resolve(customer.tokens),
        })
    }

    /// Standings for every known customer, ordered by id.
    pub fn standings(&self) -> Vec<CustomerStanding> {
        self.store
            .list_customers()
            .into_iter()
            .map(|c| CustomerStanding {
                customer_id: c.id,
                tokens: c.tokens,
                standing: self.tiers.resolve(c.tokens),
            })
            .collect()
    }
}

/// Private API
impl<S, N> Engine<S, N>
where
    S: CustomerStore + RewardStore + ClaimStore,
    N: NotificationSink,
{
    /// Small helper to log operation results
    fn log_result<T, E: std::fmt::Display>(op: &str, id: u64, result: &Result<T, E>) {
        match result {
            Ok(_) => info!(id, "{op} applied"),
            Err(e) => info!(id, reason = %e, "{op} skipped"),
        }
    }

    /// Only pending claims can be settled.
    fn check_pending(claim: &Claim) -> Result<(), SettleError> {
        match claim.status {
            ClaimStatus::Pending => Ok(()),
            ClaimStatus::Validated | ClaimStatus::Cancelled => {
                Err(SettleError::AlreadyFinalized(claim.id, claim.status))
            }
            ClaimStatus::Cart => Err(SettleError::InvalidTransition {
                claim: claim.id,
                from: claim.status,
            }),
        }
    }

    /// Notification delivery is best-effort; a sink failure never
    /// reverts a committed transition.
    fn notify(&mut self, recipient: UserId, message: String) {
        if let Err(e) = self.notifications.emit(recipient, message) {
            warn!(recipient, error = %e, "notification delivery failed");
        }
    }
}
