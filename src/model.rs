//! Core domain types for the settlement engine.

use chrono::{DateTime, Utc};

/// Customer identifier.
pub type CustomerId = u64;

/// Reward identifier.
pub type RewardId = u64;

/// Claim identifier.
pub type ClaimId = u64;

/// Notification recipient identifier (customers and admins share the space).
pub type UserId = u64;

/// Caller role, supplied already verified by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
    SuperAdmin,
}

impl Role {
    /// Only super admins may validate or cancel pending claims.
    pub fn may_settle(self) -> bool {
        matches!(self, Role::SuperAdmin)
    }
}

/// Lifecycle state of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    /// In the customer's cart; no order placed yet.
    Cart,
    /// Order placed, awaiting admin settlement. Tokens not yet debited.
    Pending,
    /// Settled; tokens debited and stock decremented. Terminal.
    Validated,
    /// Cancelled without debit. Terminal.
    Cancelled,
}

impl ClaimStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ClaimStatus::Validated | ClaimStatus::Cancelled)
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClaimStatus::Cart => "cart",
            ClaimStatus::Pending => "pending",
            ClaimStatus::Validated => "validated",
            ClaimStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A customer's reward claim. One claim covers one unit of one reward.
#[derive(Debug, Clone)]
pub struct Claim {
    pub id: ClaimId,
    pub customer_id: CustomerId,
    pub reward_id: RewardId,
    pub status: ClaimStatus,
    pub created_at: DateTime<Utc>,
}

impl Claim {
    /// Create a new claim in the `Cart` state.
    pub fn new(id: ClaimId, customer_id: CustomerId, reward_id: RewardId) -> Self {
        Self {
            id,
            customer_id,
            reward_id,
            status: ClaimStatus::Cart,
            created_at: Utc::now(),
        }
    }
}

/// A loyalty-program customer. The token balance is mutated only by
/// settlement; cart operations never touch it.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// Agency where validated rewards are picked up.
    pub agency: Option<String>,
    pub tokens: u64,
}

impl Customer {
    pub fn new(id: CustomerId, name: impl Into<String>, tokens: u64) -> Self {
        Self {
            id,
            name: name.into(),
            agency: None,
            tokens,
        }
    }
}

/// A redeemable reward. Stock is mutated only by settlement.
#[derive(Debug, Clone)]
pub struct Reward {
    pub id: RewardId,
    pub title: String,
    pub token_cost: u64,
    pub stock: u64,
}

impl Reward {
    pub fn new(id: RewardId, title: impl Into<String>, token_cost: u64, stock: u64) -> Self {
        Self {
            id,
            title: title.into(),
            token_cost,
            stock,
        }
    }
}

/// A persisted message for a customer or admin, created as a side
/// effect of order placement and settlement.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub recipient: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

/// An operation representing the possible inputs of the engine.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Put `quantity` units of a reward into a customer's cart.
    AddToCart {
        customer: CustomerId,
        reward: RewardId,
        quantity: u32,
    },
    /// Drop a cart claim before the order is placed.
    RemoveFromCart {
        customer: CustomerId,
        claim: ClaimId,
    },
    /// Move the customer's cart claims to pending; no debit yet.
    PlaceOrder { customer: CustomerId },
    /// Settle a pending claim: debit tokens, decrement stock.
    Validate {
        claim: ClaimId,
        admin: UserId,
        role: Role,
    },
    /// Cancel a pending claim without debit.
    Cancel {
        claim: ClaimId,
        admin: UserId,
        role: Role,
    },
}
