pub mod csv;
pub mod engine;
pub mod model;
pub mod store;
pub mod tier;

pub use engine::Engine;
pub use model::{Claim, ClaimId, ClaimStatus, Customer, CustomerId, Operation, Reward, RewardId, Role, UserId};
pub use tier::{TierStanding, TierTable};
