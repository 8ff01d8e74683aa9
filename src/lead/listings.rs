//! Listings lookup — pluggable search over external property inventory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::lead::model::ListingMatch;
use crate::registry::tokens;

/// Kind of property being sought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Apartment,
    House,
}

/// Kind of transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transaction {
    Rent,
    Buy,
}

/// Filter criteria derived from a completed wizard run.
///
/// Fields other than the category pair are optional: a lookup can still run
/// when the user's answer did not map to a structured filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingsQuery {
    pub property: PropertyKind,
    pub transaction: Transaction,
    /// Minimum room count; `4` stands for "4 or more".
    pub rooms: Option<u8>,
    /// Raw district token, the stable key listing feeds filter on.
    pub district: Option<String>,
    pub budget_min: Option<u32>,
    pub budget_max: Option<u32>,
}

impl ListingsQuery {
    /// Derive a query from recorded answer tokens.
    ///
    /// Returns `None` when the category token is missing or unknown; every
    /// other token degrades to an open filter instead of failing.
    pub fn from_tokens(
        category: Option<&str>,
        rooms: Option<&str>,
        district: Option<&str>,
        budget: Option<&str>,
    ) -> Option<Self> {
        let (property, transaction) = parse_category(category?)?;
        let (budget_min, budget_max) = budget.map(budget_bounds).unwrap_or((None, None));
        Some(Self {
            property,
            transaction,
            rooms: rooms.and_then(parse_rooms),
            district: district.map(str::to_string),
            budget_min,
            budget_max,
        })
    }
}

fn parse_category(token: &str) -> Option<(PropertyKind, Transaction)> {
    match token {
        tokens::RENT_APARTMENT => Some((PropertyKind::Apartment, Transaction::Rent)),
        tokens::BUY_APARTMENT => Some((PropertyKind::Apartment, Transaction::Buy)),
        tokens::RENT_HOUSE => Some((PropertyKind::House, Transaction::Rent)),
        tokens::BUY_HOUSE => Some((PropertyKind::House, Transaction::Buy)),
        _ => None,
    }
}

fn parse_rooms(token: &str) -> Option<u8> {
    match token {
        tokens::ROOMS_1 => Some(1),
        tokens::ROOMS_2 => Some(2),
        tokens::ROOMS_3 => Some(3),
        tokens::ROOMS_4_PLUS => Some(4),
        _ => None,
    }
}

fn budget_bounds(token: &str) -> (Option<u32>, Option<u32>) {
    match token {
        tokens::BUDGET_TO_10K => (None, Some(10_000)),
        tokens::BUDGET_10K_20K => (Some(10_000), Some(20_000)),
        tokens::BUDGET_20K_40K => (Some(20_000), Some(40_000)),
        tokens::BUDGET_40K_PLUS => (Some(40_000), None),
        _ => (None, None),
    }
}

/// Search over an external listings source.
///
/// Implementations are called once per completed lead, under the
/// finalizer's hard timeout, and must tolerate being abandoned mid-flight.
#[async_trait]
pub trait ListingsLookup: Send + Sync {
    /// Human-readable source name, used in logs.
    fn source(&self) -> &str;

    /// Find listings matching `query`, best matches first.
    async fn lookup(&self, query: &ListingsQuery) -> Result<Vec<ListingMatch>, LookupError>;
}

/// Placeholder lookup used until a real feed client exists. Always empty.
//
// TODO: replace with the OLX feed client once the agency's API access lands.
pub struct StubListings;

#[async_trait]
impl ListingsLookup for StubListings {
    fn source(&self) -> &str {
        "stub"
    }

    async fn lookup(&self, _query: &ListingsQuery) -> Result<Vec<ListingMatch>, LookupError> {
        Ok(Vec::new())
    }
}
