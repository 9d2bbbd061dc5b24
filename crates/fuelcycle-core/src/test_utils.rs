//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).
//!
//! [`MockMarket`] stands in for the host simulation: it drives an agent
//! through one step of the protocol at a time, supplies fresh fuel from
//! [`FuelSource`]s and takes spent fuel into [`FuelSink`]s.

use crate::agent::{ExchangesFuel, Steps};
use crate::composition::Composition;
use crate::config::{ReactorConfig, UNBOUNDED_SPENT_ASSEMBLIES};
use crate::exchange::*;
use crate::fixed::{Fixed64, Ticks};
use crate::id::*;
use crate::inventory::FuelUnit;
use crate::reactor::{Reactor, ReactorError};
use crate::region::{Region, RegionSpec};
use crate::registry::{Registry, RegistryBuilder};
use slotmap::SlotMap;
use std::collections::{BTreeMap, BTreeSet};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Nuclides and recipes
// ===========================================================================

pub fn u235() -> NuclideId {
    NuclideId(922350000)
}
pub fn u238() -> NuclideId {
    NuclideId(922380000)
}
pub fn pu239() -> NuclideId {
    NuclideId(942390000)
}

// Ids follow registration order in `test_registry`.
pub fn uox() -> RecipeId {
    RecipeId(0)
}
pub fn mox() -> RecipeId {
    RecipeId(1)
}
pub fn spent_uox() -> RecipeId {
    RecipeId(2)
}
pub fn spent_mox() -> RecipeId {
    RecipeId(3)
}

/// Registry with `uox`, `mox`, `spentuox`, `spentmox`, in that order.
pub fn test_registry() -> Registry {
    let mut builder = RegistryBuilder::new();
    builder.register_recipe("uox", Composition::from_mass([(u235(), 0.04), (u238(), 0.96)]));
    builder.register_recipe(
        "mox",
        Composition::from_mass([(u235(), 0.7), (u238(), 100.0), (pu239(), 3.3)]),
    );
    builder.register_recipe(
        "spentuox",
        Composition::from_mass([(u235(), 0.8), (u238(), 100.0), (pu239(), 1.0)]),
    );
    builder.register_recipe(
        "spentmox",
        Composition::from_mass([(u235(), 0.2), (u238(), 100.0), (pu239(), 0.9)]),
    );
    builder.build().expect("test registry is valid")
}

// ===========================================================================
// Region and reactor configurations
// ===========================================================================

/// uox -> waste: core 3, fresh 2, batch 1, 300 per assembly.
pub fn uox_region_spec() -> RegionSpec {
    RegionSpec {
        in_commodity: "uox".into(),
        in_recipe: uox(),
        out_commodity: "waste".into(),
        out_recipe: spent_uox(),
        assem_size: fixed(300.0),
        batch_size: 1,
        core_capacity: 3,
        fresh_capacity: 2,
        spent_capacity: UNBOUNDED_SPENT_ASSEMBLIES,
    }
}

/// mox -> waste2: core 2, fresh 1, batch 1, 150 per assembly.
pub fn mox_region_spec() -> RegionSpec {
    RegionSpec {
        in_commodity: "mox".into(),
        in_recipe: mox(),
        out_commodity: "waste2".into(),
        out_recipe: spent_mox(),
        assem_size: fixed(150.0),
        batch_size: 1,
        core_capacity: 2,
        fresh_capacity: 1,
        spent_capacity: UNBOUNDED_SPENT_ASSEMBLIES,
    }
}

/// Region 0 built from [`uox_region_spec`], region 1 from [`mox_region_spec`].
pub fn two_regions() -> Vec<Region> {
    vec![
        Region::new(RegionId(0), uox_region_spec()),
        Region::new(RegionId(1), mox_region_spec()),
    ]
}

/// One uox region matching [`uox_region_spec`], 1000 power, never retires.
pub fn single_region_config() -> ReactorConfig {
    ReactorConfig {
        in_commodities: vec!["uox".into()],
        in_recipes: vec!["uox".to_string()],
        out_commodities: vec!["waste".into()],
        out_recipes: vec!["spentuox".to_string()],
        assem_size: vec![300.0],
        batch_size: vec![1],
        core_size: vec![3],
        fresh_capacity: vec![2],
        spent_capacity: Vec::new(),
        cycle_length: 7,
        refuel_length: 1,
        power_capacity: 1000.0,
        power_name: "power".to_string(),
        keep_packaging: true,
        transmute_all: false,
        exit_time: None,
    }
}

/// A uox region and a mox region, both discharging to `waste`.
pub fn two_region_config() -> ReactorConfig {
    ReactorConfig {
        in_commodities: vec!["uox".into(), "mox".into()],
        in_recipes: vec!["uox".to_string(), "mox".to_string()],
        out_commodities: vec!["waste".into(), "waste".into()],
        out_recipes: vec!["spentuox".to_string(), "spentmox".to_string()],
        assem_size: vec![300.0, 150.0],
        batch_size: vec![1, 1],
        core_size: vec![3, 2],
        fresh_capacity: vec![1, 1],
        spent_capacity: Vec::new(),
        ..single_region_config()
    }
}

/// Build a reactor against [`test_registry`].
pub fn make_reactor(config: &ReactorConfig) -> Reactor {
    Reactor::new(config, &test_registry()).expect("test config is valid")
}

/// Exit time for a reactor that starts at step 0 and runs `lifetime` steps.
/// A lifetime of zero has no exit step.
pub fn exit_for_lifetime(lifetime: Ticks) -> Option<Ticks> {
    lifetime.checked_sub(1)
}

// ===========================================================================
// Fuel units and requests
// ===========================================================================

/// Issues fuel units with fresh ids.
#[derive(Debug, Clone, Default)]
pub struct Minter {
    keys: SlotMap<FuelUnitId, ()>,
}

impl Minter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, mass: Fixed64, recipe: RecipeId) -> FuelUnit {
        FuelUnit::new(self.keys.insert(()), mass, recipe)
    }

    pub fn minted(&self) -> usize {
        self.keys.len()
    }
}

pub fn posted_request(id: u64, commodity: &str, quantity: f64) -> PostedRequest {
    PostedRequest {
        id: RequestId(id),
        request: Request {
            commodity: commodity.into(),
            quantity: fixed(quantity),
            recipe: spent_uox(),
            preference: Fixed64::ONE,
            exclusive: false,
        },
    }
}

// ===========================================================================
// Market participants
// ===========================================================================

/// Supplies one commodity of a fixed recipe.
#[derive(Debug, Clone)]
pub struct FuelSource {
    pub commodity: Commodity,
    pub recipe: RecipeId,
    /// First step the source trades.
    pub start: Ticks,
    /// Steps the source trades for. `None` is forever.
    pub lifetime: Option<Ticks>,
    /// Mass supplied per step. `None` is unlimited.
    pub capacity: Option<Fixed64>,
}

impl FuelSource {
    pub fn unlimited(commodity: &str, recipe: RecipeId) -> Self {
        Self {
            commodity: commodity.into(),
            recipe,
            start: 0,
            lifetime: None,
            capacity: None,
        }
    }

    pub fn starting_at(mut self, start: Ticks) -> Self {
        self.start = start;
        self
    }

    pub fn with_lifetime(mut self, lifetime: Ticks) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    pub fn with_capacity(mut self, mass: f64) -> Self {
        self.capacity = Some(fixed(mass));
        self
    }

    pub fn is_active(&self, now: Ticks) -> bool {
        now >= self.start && self.lifetime.is_none_or(|l| now < self.start + l)
    }
}

/// Takes one commodity, keeping everything it receives.
#[derive(Debug, Clone)]
pub struct FuelSink {
    pub commodity: Commodity,
    /// Mass accepted per step. `None` is unlimited.
    pub capacity: Option<Fixed64>,
    pub received: Vec<FuelUnit>,
}

impl FuelSink {
    pub fn unlimited(commodity: &str) -> Self {
        Self {
            commodity: commodity.into(),
            capacity: None,
            received: Vec::new(),
        }
    }

    pub fn with_capacity(mut self, mass: f64) -> Self {
        self.capacity = Some(fixed(mass));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Fresh fuel sold to the agent.
    Bought,
    /// Spent fuel taken from the agent.
    Sold,
}

/// One unit changing hands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub tick: Ticks,
    pub direction: Direction,
    pub commodity: Commodity,
    pub recipe: RecipeId,
    pub quantity: Fixed64,
}

// ===========================================================================
// MockMarket
// ===========================================================================

/// A minimal resource exchange. Requests are filled in order from the first
/// active source with room; sink requests are matched against bids in order
/// without splitting units.
#[derive(Debug, Clone, Default)]
pub struct MockMarket {
    now: Ticks,
    minter: Minter,
    next_request: u64,
    sources: Vec<FuelSource>,
    sinks: Vec<FuelSink>,
    transactions: Vec<Transaction>,
}

impl MockMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, source: FuelSource) {
        self.sources.push(source);
    }

    pub fn add_sink(&mut self, sink: FuelSink) {
        self.sinks.push(sink);
    }

    /// The step the next call to [`step`](Self::step) runs.
    pub fn now(&self) -> Ticks {
        self.now
    }

    pub fn sinks(&self) -> &[FuelSink] {
        &self.sinks
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Run one full step: tick, buy, sell, tock.
    pub fn step<A: Steps + ExchangesFuel>(&mut self, agent: &mut A) -> Result<(), ReactorError> {
        let now = self.now;
        agent.tick(now)?;

        let ports = agent.get_requests(now);
        let responses = self.fill_requests(now, &ports);
        agent.accept_trades(now, responses)?;

        let requests = self.sink_requests();
        if !requests.is_empty() {
            let bids = agent.get_bids(&requests)?;
            let trades = self.match_bids(&requests, &bids);
            if !trades.is_empty() {
                let responses = agent.give_trades(now, &trades)?;
                self.deliver_to_sinks(now, &requests, responses);
            }
        }

        agent.tock(now);
        self.now += 1;
        Ok(())
    }

    pub fn run<A: Steps + ExchangesFuel>(
        &mut self,
        agent: &mut A,
        steps: Ticks,
    ) -> Result<(), ReactorError> {
        for _ in 0..steps {
            self.step(agent)?;
        }
        Ok(())
    }

    fn fill_requests(&mut self, now: Ticks, ports: &[RequestPortfolio]) -> Vec<TradeResponse> {
        let mut remaining: Vec<Option<Fixed64>> = self.sources.iter().map(|s| s.capacity).collect();
        let mut responses = Vec::new();

        for request in ports.iter().flat_map(|p| &p.requests) {
            let found = self.sources.iter().enumerate().position(|(i, s)| {
                s.commodity == request.commodity
                    && s.is_active(now)
                    && remaining[i].is_none_or(|left| left >= request.quantity)
            });
            let Some(i) = found else {
                continue;
            };
            if let Some(left) = remaining[i].as_mut() {
                *left -= request.quantity;
            }

            let recipe = self.sources[i].recipe;
            let unit = self.minter.mint(request.quantity, recipe);
            self.next_request += 1;
            self.transactions.push(Transaction {
                tick: now,
                direction: Direction::Bought,
                commodity: request.commodity.clone(),
                recipe,
                quantity: request.quantity,
            });
            responses.push(TradeResponse {
                trade: Trade {
                    request: RequestId(self.next_request),
                    commodity: request.commodity.clone(),
                    quantity: request.quantity,
                },
                unit,
            });
        }
        responses
    }

    /// One request per sink, keyed by the sink's position.
    fn sink_requests(&self) -> RequestsByCommodity {
        let mut requests = RequestsByCommodity::new();
        for (i, sink) in self.sinks.iter().enumerate() {
            requests
                .entry(sink.commodity.clone())
                .or_default()
                .push(PostedRequest {
                    id: RequestId(i as u64),
                    request: Request {
                        commodity: sink.commodity.clone(),
                        quantity: sink.capacity.unwrap_or(Fixed64::MAX),
                        recipe: spent_uox(),
                        preference: Fixed64::ONE,
                        exclusive: false,
                    },
                });
        }
        requests
    }

    fn match_bids(&self, requests: &RequestsByCommodity, ports: &[BidPortfolio]) -> Vec<Trade> {
        let mut trades = Vec::new();
        for port in ports {
            let Some(posted) = requests.get(&port.commodity) else {
                continue;
            };
            let mut capacity = port.capacity().unwrap_or(Fixed64::MAX);
            let mut used: BTreeSet<FuelUnitId> = BTreeSet::new();

            for request in posted {
                let mut wanted = request.request.quantity;
                for bid in port.bids.iter().filter(|b| b.request == request.id) {
                    if used.contains(&bid.unit) || bid.quantity > wanted || bid.quantity > capacity {
                        continue;
                    }
                    used.insert(bid.unit);
                    wanted -= bid.quantity;
                    capacity -= bid.quantity;
                    trades.push(Trade {
                        request: request.id,
                        commodity: port.commodity.clone(),
                        quantity: bid.quantity,
                    });
                }
            }
        }
        trades
    }

    fn deliver_to_sinks(
        &mut self,
        now: Ticks,
        requests: &RequestsByCommodity,
        responses: Vec<TradeResponse>,
    ) {
        let owners: BTreeMap<RequestId, usize> = requests
            .values()
            .flatten()
            .map(|p| (p.id, p.id.0 as usize))
            .collect();
        for TradeResponse { trade, unit } in responses {
            self.transactions.push(Transaction {
                tick: now,
                direction: Direction::Sold,
                commodity: trade.commodity.clone(),
                recipe: unit.recipe,
                quantity: unit.mass,
            });
            if let Some(&i) = owners.get(&trade.request) {
                self.sinks[i].received.push(unit);
            }
        }
    }

    // -- Counting helpers --

    fn count(&self, direction: Direction, commodity: Option<&str>) -> usize {
        self.transactions
            .iter()
            .filter(|t| t.direction == direction)
            .filter(|t| commodity.is_none_or(|c| t.commodity.as_str() == c))
            .count()
    }

    /// Units bought on any commodity.
    pub fn bought(&self) -> usize {
        self.count(Direction::Bought, None)
    }

    pub fn bought_of(&self, commodity: &str) -> usize {
        self.count(Direction::Bought, Some(commodity))
    }

    pub fn sold(&self) -> usize {
        self.count(Direction::Sold, None)
    }

    pub fn sold_of(&self, commodity: &str) -> usize {
        self.count(Direction::Sold, Some(commodity))
    }

    /// Units bought during `tick`.
    pub fn bought_at(&self, tick: Ticks) -> usize {
        self.transactions
            .iter()
            .filter(|t| t.direction == Direction::Bought && t.tick == tick)
            .count()
    }
}
