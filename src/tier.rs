//! Loyalty tier table and resolver.
//!
//! A [`TierTable`] is an ordered list of tier definitions that must
//! partition `[0, ∞)` with no gaps or overlaps. [`TierTable::resolve`]
//! maps a token balance to the containing tier, the percentage of
//! progress within it, and the tokens still needed for the next tier.
//! Resolution is pure and deterministic.

use serde::Deserialize;
use thiserror::Error;

/// A single tier definition. `max_tokens == None` means unbounded;
/// only the last tier may be unbounded.
#[derive(Debug, Clone, Deserialize)]
pub struct Tier {
    pub name: String,
    pub code: String,
    pub min_tokens: u64,
    pub max_tokens: Option<u64>,
}

/// A customer's position within the tier ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct TierStanding {
    pub tier_name: String,
    pub code: String,
    /// Progress through the tier's range, rounded to two decimals.
    /// `0.0` for the unbounded top tier, which has no "next".
    pub percentage: f64,
    /// Tokens needed to reach the next tier's threshold; `0` at the top.
    pub tokens_to_next_tier: u64,
}

/// A tier table that failed the partition invariant.
#[derive(Debug, Error)]
pub enum TierTableError {
    #[error("tier table is empty")]
    Empty,

    #[error("first tier '{0}' starts at {1}, expected 0")]
    FirstNotZero(String, u64),

    #[error("tier '{name}' has empty range [{min}, {max})")]
    EmptyRange { name: String, min: u64, max: u64 },

    #[error("tier '{0}' is unbounded but is not the last tier")]
    UnboundedNotLast(String),

    #[error("last tier '{0}' is bounded; the table must cover [0, ∞)")]
    LastBounded(String),

    #[error("tier '{next}' starts at {start}, expected {expected} (gap or overlap)")]
    NotContiguous {
        next: String,
        start: u64,
        expected: u64,
    },
}

/// Ordered, validated tier definitions.
#[derive(Debug, Clone)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    /// Build a table, enforcing that the tiers partition `[0, ∞)`:
    /// first tier starts at 0, each tier's upper bound is the next
    /// tier's lower bound, and only the last tier is unbounded.
    pub fn new(tiers: Vec<Tier>) -> Result<Self, TierTableError> {
        let Some(first) = tiers.first() else {
            return Err(TierTableError::Empty);
        };
        if first.min_tokens != 0 {
            return Err(TierTableError::FirstNotZero(
                first.name.clone(),
                first.min_tokens,
            ));
        }

        let last = tiers.len() - 1;
        for (i, tier) in tiers.iter().enumerate() {
            match tier.max_tokens {
                Some(max) if max <= tier.min_tokens => {
                    return Err(TierTableError::EmptyRange {
                        name: tier.name.clone(),
                        min: tier.min_tokens,
                        max,
                    });
                }
                Some(max) => {
                    if i == last {
                        return Err(TierTableError::LastBounded(tier.name.clone()));
                    }
                    let next = &tiers[i + 1];
                    if next.min_tokens != max {
                        return Err(TierTableError::NotContiguous {
                            next: next.name.clone(),
                            start: next.min_tokens,
                            expected: max,
                        });
                    }
                }
                None if i != last => {
                    return Err(TierTableError::UnboundedNotLast(tier.name.clone()));
                }
                None => {}
            }
        }

        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Resolve a token balance to its tier standing.
    pub fn resolve(&self, balance: u64) -> TierStanding {
        for (i, tier) in self.tiers.iter().enumerate() {
            let contains = match tier.max_tokens {
                Some(max) => tier.min_tokens <= balance && balance < max,
                None => tier.min_tokens <= balance,
            };
            if !contains {
                continue;
            }

            let (percentage, tokens_to_next_tier) = match tier.max_tokens {
                Some(max) => {
                    let width = (max - tier.min_tokens) as f64;
                    let position = (balance - tier.min_tokens) as f64;
                    let pct = position / width * 100.0;
                    let to_next = self
                        .tiers
                        .get(i + 1)
                        .map(|next| next.min_tokens - balance)
                        .unwrap_or(0);
                    (round2(pct), to_next)
                }
                // Top tier has no "next"; percentage is 0 by convention.
                None => (0.0, 0),
            };

            return TierStanding {
                tier_name: tier.name.clone(),
                code: tier.code.clone(),
                percentage,
                tokens_to_next_tier,
            };
        }

        // Unreachable on a validated table; defensive fallback only.
        TierStanding {
            tier_name: "Unknown".to_string(),
            code: String::new(),
            percentage: 0.0,
            tokens_to_next_tier: 0,
        }
    }
}

impl Default for TierTable {
    /// The standard program ladder.
    fn default() -> Self {
        let tier = |name: &str, code: &str, min, max| Tier {
            name: name.to_string(),
            code: code.to_string(),
            min_tokens: min,
            max_tokens: max,
        };
        Self::new(vec![
            tier("Eco Premium", "A", 0, Some(100)),
            tier("Executive", "B", 100, Some(1000)),
            tier("Executive +", "C", 1000, Some(3000)),
            tier("First Class", "D", 3000, None),
        ])
        .expect("default tier table is a valid partition")
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
