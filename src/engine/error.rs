//! Error types for claim processing.

use thiserror::Error;

use crate::model::{ClaimId, ClaimStatus, CustomerId, RewardId, Role};

/// Top-level error returned by [`Engine::apply`](super::Engine::apply).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cart operation failed: {0}")]
    Cart(#[from] CartError),

    #[error("place order failed: {0}")]
    Order(#[from] OrderError),

    #[error("{0}")]
    Settle(#[from] SettleError),
}

/// Error during add-to-cart or remove-from-cart.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("customer {0} not found")]
    CustomerNotFound(CustomerId),

    #[error("reward {0} not found")]
    RewardNotFound(RewardId),

    #[error("reward {reward} has {available} in stock, requested {requested}")]
    InsufficientStock {
        reward: RewardId,
        requested: u32,
        available: u64,
    },

    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(u32),

    #[error("claim {0} is not in the customer's cart")]
    NotInCart(ClaimId),
}

/// Error during order placement.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("customer {0} not found")]
    CustomerNotFound(CustomerId),

    #[error("customer {0} has an empty cart")]
    EmptyCart(CustomerId),

    #[error("customer {customer} has {available} jetons, order requires {required}")]
    InsufficientBalance {
        customer: CustomerId,
        available: u64,
        required: u64,
    },
}

/// Error during settlement (validate or cancel).
#[derive(Debug, Error)]
pub enum SettleError {
    #[error("role {0:?} may not settle claims")]
    Forbidden(Role),

    #[error("claim {0} not found")]
    ClaimNotFound(ClaimId),

    #[error("claim {0} is already {1}")]
    AlreadyFinalized(ClaimId, ClaimStatus),

    #[error("claim {claim} is {from}; only pending claims can be settled")]
    InvalidTransition { claim: ClaimId, from: ClaimStatus },

    #[error("reward {0} not found")]
    RewardNotFound(RewardId),

    #[error("customer {0} not found")]
    CustomerNotFound(CustomerId),

    #[error("customer {customer} has {available} jetons, reward costs {required}")]
    InsufficientBalance {
        customer: CustomerId,
        available: u64,
        required: u64,
    },
}
