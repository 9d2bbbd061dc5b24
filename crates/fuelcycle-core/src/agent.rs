//! Capability traits a host simulation uses to drive facilities.
//!
//! A host only needs these three capabilities; there is no base class.
//! [`Reactor`] implements all of them, and any other reactor variant can be
//! driven by the same loop by implementing the same traits.

use crate::exchange::{BidPortfolio, RequestPortfolio, RequestsByCommodity, Trade, TradeResponse};
use crate::fixed::{Fixed64, Ticks};
use crate::reactor::{Reactor, ReactorError};

/// Takes part in the per-step Tick / Tock phases.
pub trait Steps {
    fn tick(&mut self, now: Ticks) -> Result<(), ReactorError>;

    fn tock(&mut self, now: Ticks);
}

/// Buys and sells fuel through the resource-exchange market.
pub trait ExchangesFuel {
    fn get_requests(&mut self, now: Ticks) -> Vec<RequestPortfolio>;

    fn accept_trades(&mut self, now: Ticks, responses: Vec<TradeResponse>)
    -> Result<(), ReactorError>;

    fn get_bids(&self, requests: &RequestsByCommodity) -> Result<Vec<BidPortfolio>, ReactorError>;

    fn give_trades(&mut self, now: Ticks, trades: &[Trade])
    -> Result<Vec<TradeResponse>, ReactorError>;
}

/// Reports a power time series under a configurable name.
pub trait ReportsPower {
    fn power_name(&self) -> &str;

    /// Power reported at the most recent step.
    fn power_output(&self) -> Fixed64;
}

impl Steps for Reactor {
    fn tick(&mut self, now: Ticks) -> Result<(), ReactorError> {
        Reactor::tick(self, now)
    }

    fn tock(&mut self, now: Ticks) {
        Reactor::tock(self, now)
    }
}

impl ExchangesFuel for Reactor {
    fn get_requests(&mut self, now: Ticks) -> Vec<RequestPortfolio> {
        Reactor::get_requests(self, now)
    }

    fn accept_trades(
        &mut self,
        now: Ticks,
        responses: Vec<TradeResponse>,
    ) -> Result<(), ReactorError> {
        Reactor::accept_trades(self, now, responses)
    }

    fn get_bids(&self, requests: &RequestsByCommodity) -> Result<Vec<BidPortfolio>, ReactorError> {
        Reactor::get_bids(self, requests)
    }

    fn give_trades(
        &mut self,
        now: Ticks,
        trades: &[Trade],
    ) -> Result<Vec<TradeResponse>, ReactorError> {
        Reactor::give_trades(self, now, trades)
    }
}

impl ReportsPower for Reactor {
    fn power_name(&self) -> &str {
        Reactor::power_name(self)
    }

    fn power_output(&self) -> Fixed64 {
        self.power()
    }
}
