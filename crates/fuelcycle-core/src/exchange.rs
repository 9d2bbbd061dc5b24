//! Resource-exchange primitives.
//!
//! The market itself lives outside this crate. These are the value types a
//! reactor hands to it (requests, bids, capacity constraints) and receives
//! back (trades, with fuel units attached on the way in).

use crate::fixed::Fixed64;
use crate::id::{Commodity, FuelUnitId, RecipeId, RegionId, RequestId};
use crate::inventory::FuelUnit;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A request for one assembly of fuel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub commodity: Commodity,
    pub quantity: Fixed64,
    /// Exact composition wanted.
    pub recipe: RecipeId,
    pub preference: Fixed64,
    /// All-or-nothing: the whole quantity or none of it.
    pub exclusive: bool,
}

/// A group of requests from one requester. Reactors emit one portfolio per
/// missing assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPortfolio {
    pub region: RegionId,
    pub requests: Vec<Request>,
}

/// A request as seen by bidders, tagged with the market's id for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedRequest {
    pub id: RequestId,
    pub request: Request,
}

/// Outstanding requests from other agents, grouped by commodity.
pub type RequestsByCommodity = BTreeMap<Commodity, Vec<PostedRequest>>;

// ---------------------------------------------------------------------------
// Bids
// ---------------------------------------------------------------------------

/// An offer of one spent unit against one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bid {
    pub request: RequestId,
    pub unit: FuelUnitId,
    pub quantity: Fixed64,
    pub exclusive: bool,
}

/// Caps the total quantity the market may award across a portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityConstraint {
    pub capacity: Fixed64,
}

/// All bids for one output commodity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidPortfolio {
    pub commodity: Commodity,
    pub bids: Vec<Bid>,
    pub constraints: Vec<CapacityConstraint>,
}

impl BidPortfolio {
    pub fn new(commodity: Commodity) -> Self {
        Self {
            commodity,
            bids: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn add_bid(&mut self, bid: Bid) {
        self.bids.push(bid);
    }

    pub fn add_constraint(&mut self, constraint: CapacityConstraint) {
        self.constraints.push(constraint);
    }

    /// The tightest capacity constraint, if any.
    pub fn capacity(&self) -> Option<Fixed64> {
        self.constraints.iter().map(|c| c.capacity).min()
    }
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// A matched request. For trades the reactor answers, `commodity` is the
/// requested commodity, which selects the spent fuel pool to draw from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub request: RequestId,
    pub commodity: Commodity,
    pub quantity: Fixed64,
}

/// A trade paired with the unit that settles it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeResponse {
    pub trade: Trade,
    pub unit: FuelUnit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_fixed64;

    #[test]
    fn portfolio_capacity_is_tightest_constraint() {
        let mut port = BidPortfolio::new("waste".into());
        assert_eq!(port.capacity(), None);
        port.add_constraint(CapacityConstraint {
            capacity: f64_to_fixed64(900.0),
        });
        port.add_constraint(CapacityConstraint {
            capacity: f64_to_fixed64(300.0),
        });
        assert_eq!(port.capacity(), Some(f64_to_fixed64(300.0)));
    }
}
