//! CSV front-end for the replay binary.
//!
//! One program file carries seed rows (`customer`, `reward`) and
//! operation rows (`add_to_cart`, `remove_from_cart`, `place_order`,
//! `validate`, `cancel`). Seeds go straight to the stores; operations
//! are replayed through the engine.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::engine::CustomerStanding;
use crate::model::{ClaimId, Customer, CustomerId, Operation, Reward, RewardId, Role, UserId};

/// Errors that can occur when parsing csv rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized operation '{op}'")]
    UnrecognizedOp { line: usize, op: String },

    #[error("line {line}: {op} missing field '{field}'")]
    MissingField {
        line: usize,
        op: String,
        field: &'static str,
    },

    #[error("line {line}: unrecognized role '{role}'")]
    UnrecognizedRole { line: usize, role: String },
}

#[derive(Debug, Deserialize)]
struct InputRow {
    op: String,
    customer: Option<CustomerId>,
    reward: Option<RewardId>,
    claim: Option<ClaimId>,
    admin: Option<UserId>,
    role: Option<String>,
    quantity: Option<u32>,
    tokens: Option<u64>,
    cost: Option<u64>,
    stock: Option<u64>,
    name: Option<String>,
    agency: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow {
    customer: CustomerId,
    jetons: u64,
    tier: String,
    percentage: String,
    to_next: u64,
}

/// A parsed program row: a store seed or an engine operation.
#[derive(Debug, Clone)]
pub enum Row {
    Customer(Customer),
    Reward(Reward),
    Op(Operation),
}

fn require<T>(
    value: Option<T>,
    line: usize,
    op: &str,
    field: &'static str,
) -> Result<T, CsvError> {
    value.ok_or_else(|| CsvError::MissingField {
        line,
        op: op.to_string(),
        field,
    })
}

fn parse_role(value: Option<String>, line: usize) -> Result<Role, CsvError> {
    match value.as_deref() {
        // Settlement rows default to superadmin; a lesser role can be
        // given explicitly to exercise the forbidden path.
        None | Some("superadmin") => Ok(Role::SuperAdmin),
        Some("admin") => Ok(Role::Admin),
        Some("customer") => Ok(Role::Customer),
        Some(other) => Err(CsvError::UnrecognizedRole {
            line,
            role: other.to_string(),
        }),
    }
}

/// Read program rows from a csv file
pub fn read_rows(path: impl AsRef<Path>) -> impl Iterator<Item = Result<Row, CsvError>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .expect("failed to open csv file");

    reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            let op = row.op.as_str();
            match op {
                "customer" => {
                    let id = require(row.customer, line, op, "customer")?;
                    let mut customer = Customer::new(
                        id,
                        row.name.unwrap_or_else(|| format!("Customer {id}")),
                        row.tokens.unwrap_or(0),
                    );
                    customer.agency = row.agency;
                    Ok(Row::Customer(customer))
                }
                "reward" => {
                    let id = require(row.reward, line, op, "reward")?;
                    Ok(Row::Reward(Reward::new(
                        id,
                        row.name.unwrap_or_else(|| format!("Reward {id}")),
                        require(row.cost, line, op, "cost")?,
                        row.stock.unwrap_or(0),
                    )))
                }
                "add_to_cart" => Ok(Row::Op(Operation::AddToCart {
                    customer: require(row.customer, line, op, "customer")?,
                    reward: require(row.reward, line, op, "reward")?,
                    quantity: row.quantity.unwrap_or(1),
                })),
                "remove_from_cart" => Ok(Row::Op(Operation::RemoveFromCart {
                    customer: require(row.customer, line, op, "customer")?,
                    claim: require(row.claim, line, op, "claim")?,
                })),
                "place_order" => Ok(Row::Op(Operation::PlaceOrder {
                    customer: require(row.customer, line, op, "customer")?,
                })),
                "validate" => Ok(Row::Op(Operation::Validate {
                    claim: require(row.claim, line, op, "claim")?,
                    admin: require(row.admin, line, op, "admin")?,
                    role: parse_role(row.role, line)?,
                })),
                "cancel" => Ok(Row::Op(Operation::Cancel {
                    claim: require(row.claim, line, op, "claim")?,
                    admin: require(row.admin, line, op, "admin")?,
                    role: parse_role(row.role, line)?,
                })),
                other => Err(CsvError::UnrecognizedOp {
                    line,
                    op: other.to_string(),
                }),
            }
        })
}

/// write customer standings to stdout in csv format
pub fn write_standings(standings: impl IntoIterator<Item = CustomerStanding>) {
    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());

    for standing in standings {
        let row = OutputRow {
            customer: standing.customer_id,
            jetons: standing.tokens,
            tier: standing.standing.tier_name,
            percentage: format!("{:.2}", standing.standing.percentage),
            to_next: standing.standing.tokens_to_next_tier,
        };
        writer.serialize(&row).expect("failed to write csv row");
    }

    writer.flush().expect("failed to flush csv writer");
}
