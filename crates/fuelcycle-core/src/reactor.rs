//! The multi-region reactor engine.
//!
//! [`Reactor`] owns N regions, the shared cycle clock, and the fuel index,
//! and drives them through the per-step protocol:
//!
//! 1. [`tick`](Reactor::tick) -- burn and discharge at end of cycle, load
//!    fresh fuel; once retired, wind the core down instead.
//! 2. [`get_requests`](Reactor::get_requests) /
//!    [`accept_trades`](Reactor::accept_trades) -- buy fresh fuel.
//! 3. [`get_bids`](Reactor::get_bids) / [`give_trades`](Reactor::give_trades)
//!    -- sell spent fuel.
//! 4. [`tock`](Reactor::tock) -- advance the clock and report power.
//!
//! Cross-region invariants live here: a cycle only starts when every region
//! is full and has discharged, and decommissioning is signalled once every
//! region's core and spent inventories are empty.

use crate::clock::CycleClock;
use crate::config::{ConfigError, ReactorConfig};
use crate::event::{Event, EventBus};
use crate::exchange::*;
use crate::fixed::{ceil_div, saturating_sum, Fixed64, Ticks};
use crate::id::{Commodity, FuelUnitId, RegionId};
use crate::index::FuelIndex;
use crate::inventory::FuelUnit;
use crate::region::{DischargeOutcome, Region};
use crate::registry::Registry;
use crate::timeseries::TimeSeries;
use crate::transmute::TransmutationTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReactorError {
    /// Traded fuel arrived on a commodity no region takes.
    #[error("unsupported commodity: {0}")]
    UnsupportedCommodity(Commodity),
    /// A held unit is missing from the fuel index.
    #[error("fuel unit {0:?} is not indexed")]
    UnindexedFuel(FuelUnitId),
    #[error("no transmutation for {commodity} received by {region}")]
    MissingTransmutation {
        region: RegionId,
        commodity: Commodity,
    },
    /// The market awarded more spent fuel than the reactor holds.
    #[error("no spent fuel left to trade on {0}")]
    NoSpentFuel(Commodity),
    #[error("{inventory} inventory of {region} is full")]
    InventoryFull {
        region: RegionId,
        inventory: &'static str,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Reactor
// ---------------------------------------------------------------------------

/// End-of-life bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecommissionState {
    /// The core has been burnt for decommissioning.
    pub transmuted: bool,
    /// Decommission readiness has been signalled.
    pub signalled: bool,
}

#[derive(Debug)]
pub struct Reactor {
    pub(crate) regions: Vec<Region>,
    pub(crate) clock: CycleClock,
    pub(crate) index: FuelIndex,
    pub(crate) transmutations: TransmutationTable,
    pub(crate) exit_time: Option<Ticks>,
    pub(crate) transmute_all: bool,
    pub(crate) keep_packaging: bool,
    pub(crate) power_capacity: Fixed64,
    pub(crate) power_name: String,
    pub(crate) power: Fixed64,
    pub(crate) decommission: DecommissionState,
    pub event_bus: EventBus,
    pub series: TimeSeries,
}

impl Reactor {
    /// Validate `config`, resolve its recipes, and build an empty reactor.
    pub fn new(config: &ReactorConfig, registry: &Registry) -> Result<Self, ConfigError> {
        let specs = config.region_specs(registry)?;
        let regions: Vec<Region> = specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| Region::new(RegionId(i as u32), spec))
            .collect();
        let transmutations =
            TransmutationTable::from_regions(regions.iter().map(|r| (r.id(), r.spec())));

        info!(
            regions = regions.len(),
            cycle_length = config.cycle_length,
            refuel_length = config.refuel_length,
            exit_time = ?config.exit_time,
            "reactor built"
        );

        Ok(Self {
            clock: CycleClock::new(config.cycle_length, config.refuel_length, regions.len()),
            regions,
            index: FuelIndex::new(),
            transmutations,
            exit_time: config.exit_time,
            transmute_all: config.transmute_all,
            keep_packaging: config.keep_packaging,
            power_capacity: config.power_capacity(),
            power_name: config.power_name.clone(),
            power: Fixed64::ZERO,
            decommission: DecommissionState::default(),
            event_bus: EventBus::default(),
            series: TimeSeries::new(),
        })
    }

    // -- Queries --

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.index())
    }

    pub fn clock(&self) -> &CycleClock {
        &self.clock
    }

    pub fn index(&self) -> &FuelIndex {
        &self.index
    }

    pub fn exit_time(&self) -> Option<Ticks> {
        self.exit_time
    }

    /// Past the configured exit time.
    pub fn retired(&self, now: Ticks) -> bool {
        self.exit_time.is_some_and(|exit| now > exit)
    }

    pub fn all_full(&self) -> bool {
        self.regions.iter().all(Region::is_full)
    }

    pub fn decommission_state(&self) -> DecommissionState {
        self.decommission
    }

    pub fn is_decommission_ready(&self) -> bool {
        self.decommission.signalled
    }

    /// Power reported at the last tock; zero once retired.
    pub fn power(&self) -> Fixed64 {
        self.power
    }

    pub fn power_name(&self) -> &str {
        &self.power_name
    }

    /// Distinct output commodities, derived from region configuration.
    pub fn out_commodities(&self) -> BTreeSet<Commodity> {
        self.regions
            .iter()
            .map(|r| r.spec().out_commodity.clone())
            .collect()
    }

    /// Units held across all regions and inventories.
    pub fn fuel_count(&self) -> usize {
        self.regions
            .iter()
            .map(|r| r.fresh.count() + r.core.count() + r.spent.count())
            .sum()
    }

    // -- Step entry points --

    /// Discharge, burn and load for this step.
    pub fn tick(&mut self, now: Ticks) -> Result<(), ReactorError> {
        if self.retired(now) {
            return self.wind_down(now);
        }

        if self.clock.is_end_of_cycle() {
            for i in 0..self.regions.len() {
                let batch = self.regions[i].spec().batch_size;
                self.transmute_region(i, batch, now)?;
            }
            self.event_bus.emit(Event::CycleEnd { tick: now });
            debug!(tick = now, "cycle end");
        }

        if self.clock.past_end_of_cycle() {
            for i in 0..self.regions.len() {
                let id = self.regions[i].id();
                if !self.clock.is_discharged(id) && self.discharge_region(i, now) {
                    self.clock.mark_discharged(id);
                }
            }
            for i in 0..self.regions.len() {
                self.load_region(i, now);
            }
        }

        Ok(())
    }

    /// Advance the cycle clock and report power.
    pub fn tock(&mut self, now: Ticks) {
        if self.retired(now) {
            return;
        }

        let all_full = self.all_full();
        if self.clock.try_reset(all_full) {
            debug!(tick = now, "refuel complete");
        }
        if self.clock.cycle_step() == 0 && all_full {
            self.event_bus.emit(Event::CycleStart { tick: now });
            debug!(tick = now, "cycle start");
        }

        self.power = if self.clock.is_mid_cycle() && all_full {
            self.power_capacity
        } else {
            Fixed64::ZERO
        };
        self.series.record(&self.power_name, now, self.power);

        self.clock.advance(all_full);
    }

    // -- Exchange entry points --

    /// One single-request portfolio per missing assembly, per region.
    /// Near retirement, orders are capped to the batches that can still be
    /// burnt before the exit time.
    pub fn get_requests(&mut self, now: Ticks) -> Vec<RequestPortfolio> {
        if self.retired(now) {
            return Vec::new();
        }

        let mut ports = Vec::new();
        for region in &self.regions {
            let order = self.order_size(region, now);
            let spec = region.spec();
            let demand = format!("demand{}", spec.in_commodity);
            for _ in 0..order {
                ports.push(RequestPortfolio {
                    region: region.id(),
                    requests: vec![Request {
                        commodity: spec.in_commodity.clone(),
                        quantity: spec.assem_size,
                        recipe: spec.in_recipe,
                        preference: Fixed64::ONE,
                        exclusive: true,
                    }],
                });
                self.series.record(&demand, now, spec.assem_size);
            }
        }
        ports
    }

    fn order_size(&self, region: &Region, now: Ticks) -> usize {
        let mut order = region.unmet_need() as i64;
        if let Some(exit) = self.exit_time {
            // +1: the reactor still operates during its exit step.
            let t_left = exit as i64 - now as i64 + 1;
            let t_left_cycle = self.clock.steps_left_in_cycle();
            let cycles_left = ceil_div(t_left - t_left_cycle, self.clock.cadence() as i64);
            let spec = region.spec();
            let need = cycles_left * spec.batch_size as i64 - spec.fresh_capacity as i64
                + spec.core_capacity as i64
                - region.core.count() as i64;
            order = order.min(need.max(0));
        }
        order.max(0) as usize
    }

    /// Take delivery of purchased fuel: into the core while it has room,
    /// then into the region's fresh buffer. A batch that does not fit, or
    /// carries a commodity no region takes, is rejected whole.
    pub fn accept_trades(
        &mut self,
        now: Ticks,
        responses: Vec<TradeResponse>,
    ) -> Result<(), ReactorError> {
        // Place every unit before moving any, so a rejected batch leaves the
        // reactor untouched.
        let mut core_room: Vec<usize> = self.regions.iter().map(|r| r.core.space()).collect();
        let mut fresh_room: Vec<usize> = self.regions.iter().map(|r| r.fresh.space()).collect();
        let mut placements = Vec::with_capacity(responses.len());
        for response in &responses {
            let region = FuelIndex::route(&response.trade.commodity, &self.regions)?;
            let i = region.index();
            let to_core = if core_room[i] > 0 {
                core_room[i] -= 1;
                true
            } else if fresh_room[i] > 0 {
                fresh_room[i] -= 1;
                false
            } else {
                return Err(ReactorError::InventoryFull {
                    region,
                    inventory: "fresh",
                });
            };
            placements.push((region, to_core));
        }

        let mut loaded = vec![0usize; self.regions.len()];
        for (TradeResponse { trade, mut unit }, (region, to_core)) in
            responses.into_iter().zip(placements)
        {
            self.index.index(unit.id, &trade.commodity, &self.regions)?;
            if !self.keep_packaging {
                unit.package = None;
            }

            let target = &mut self.regions[region.index()];
            let (inventory, name) = if to_core {
                loaded[region.index()] += 1;
                (&mut target.core, "core")
            } else {
                (&mut target.fresh, "fresh")
            };
            inventory.push(unit).map_err(|_| ReactorError::InventoryFull {
                region,
                inventory: name,
            })?;
        }

        for (i, assemblies) in loaded.into_iter().enumerate() {
            if assemblies > 0 {
                self.event_bus.emit(Event::Load {
                    region: RegionId(i as u32),
                    assemblies,
                    tick: now,
                });
                debug!(tick = now, region = i, assemblies, "fuel loaded into core");
            }
        }
        Ok(())
    }

    /// Offer spent fuel against other agents' requests, oldest units first,
    /// with one capacity constraint per output commodity.
    pub fn get_bids(
        &self,
        requests: &RequestsByCommodity,
    ) -> Result<Vec<BidPortfolio>, ReactorError> {
        let wanted: Vec<Commodity> = self
            .out_commodities()
            .into_iter()
            .filter(|c| requests.get(c).is_some_and(|r| !r.is_empty()))
            .collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let spent = self.peek_spent()?;
        let mut ports = Vec::new();
        for commodity in wanted {
            let Some(units) = spent.get(&commodity).filter(|u| !u.is_empty()) else {
                continue;
            };

            let mut port = BidPortfolio::new(commodity.clone());
            for posted in &requests[&commodity] {
                let mut offered = Fixed64::ZERO;
                for unit in units {
                    offered = offered.saturating_add(unit.mass);
                    port.add_bid(Bid {
                        request: posted.id,
                        unit: unit.id,
                        quantity: unit.mass,
                        exclusive: true,
                    });
                    if offered >= posted.request.quantity {
                        break;
                    }
                }
            }
            port.add_constraint(CapacityConstraint {
                capacity: saturating_sum(units.iter().map(|u| u.mass)),
            });
            ports.push(port);
        }
        Ok(ports)
    }

    /// Hand over spent fuel for matched trades, oldest unit of each
    /// commodity first. If the reactor cannot settle every trade, nothing
    /// is handed over.
    pub fn give_trades(
        &mut self,
        now: Ticks,
        trades: &[Trade],
    ) -> Result<Vec<TradeResponse>, ReactorError> {
        let mut mats = self.pop_spent()?;
        let mut responses = Vec::with_capacity(trades.len());
        let mut shortfall = None;

        for trade in trades {
            match mats.get_mut(&trade.commodity).and_then(Vec::pop) {
                Some(unit) => responses.push(TradeResponse {
                    trade: trade.clone(),
                    unit,
                }),
                None => {
                    shortfall = Some(trade.commodity.clone());
                    break;
                }
            }
        }

        if let Some(commodity) = shortfall {
            for response in responses.into_iter().rev() {
                mats.entry(response.trade.commodity)
                    .or_default()
                    .push(response.unit);
            }
            self.push_spent(mats)?;
            return Err(ReactorError::NoSpentFuel(commodity));
        }

        for response in &responses {
            self.index.remove(response.unit.id);
        }
        self.push_spent(mats)?;
        debug!(tick = now, traded = responses.len(), "spent fuel traded");
        Ok(responses)
    }

    // -- Spent fuel views --

    /// Spent units grouped by output commodity, oldest first, without
    /// removing them.
    pub fn peek_spent(&self) -> Result<BTreeMap<Commodity, Vec<&FuelUnit>>, ReactorError> {
        let mut mapped: BTreeMap<Commodity, Vec<&FuelUnit>> = BTreeMap::new();
        for region in &self.regions {
            for unit in region.spent.iter() {
                let commodity = self.spent_commodity(unit.id)?;
                mapped.entry(commodity.clone()).or_default().push(unit);
            }
        }
        Ok(mapped)
    }

    /// Remove every spent unit, grouped by output commodity. Each group is
    /// reversed so its oldest unit is last and can be taken with `pop`.
    pub fn pop_spent(&mut self) -> Result<BTreeMap<Commodity, Vec<FuelUnit>>, ReactorError> {
        // Resolve every commodity before draining so a bad index loses no fuel.
        let commodities = self
            .regions
            .iter()
            .map(|r| {
                r.spent
                    .iter()
                    .map(|u| self.spent_commodity(u.id).cloned())
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut mapped: BTreeMap<Commodity, Vec<FuelUnit>> = BTreeMap::new();
        for (region, commodities) in self.regions.iter_mut().zip(commodities) {
            for (unit, commodity) in region.spent.drain_all().into_iter().zip(commodities) {
                mapped.entry(commodity).or_default().push(unit);
            }
        }
        for units in mapped.values_mut() {
            units.reverse();
        }
        Ok(mapped)
    }

    /// Return units taken by [`pop_spent`](Self::pop_spent), restoring
    /// oldest-first order in each region's spent inventory.
    pub fn push_spent(
        &mut self,
        mapped: BTreeMap<Commodity, Vec<FuelUnit>>,
    ) -> Result<(), ReactorError> {
        for (_, mut units) in mapped {
            units.reverse();
            for unit in units {
                let region = self.index.region_of(unit.id)?;
                let target = self
                    .regions
                    .get_mut(region.index())
                    .ok_or(ReactorError::UnindexedFuel(unit.id))?;
                target
                    .spent
                    .push(unit)
                    .map_err(|_| ReactorError::InventoryFull {
                        region,
                        inventory: "spent",
                    })?;
            }
        }
        Ok(())
    }

    fn spent_commodity(&self, unit: FuelUnitId) -> Result<&Commodity, ReactorError> {
        let region = self.index.region_of(unit)?;
        self.regions
            .get(region.index())
            .map(|r| &r.spec().out_commodity)
            .ok_or(ReactorError::UnindexedFuel(unit))
    }

    // -- Region operations with recording --

    fn transmute_region(&mut self, i: usize, n: usize, now: Ticks) -> Result<usize, ReactorError> {
        let burnt = self.regions[i].transmute(n, &self.index, &self.transmutations)?;
        if burnt > 0 {
            self.event_bus.emit(Event::Transmute {
                region: RegionId(i as u32),
                assemblies: burnt,
                tick: now,
            });
            debug!(tick = now, region = i, assemblies = burnt, "fuel transmuted");
        }
        Ok(burnt)
    }

    /// Returns whether the discharge succeeded.
    fn discharge_region(&mut self, i: usize, now: Ticks) -> bool {
        let region = RegionId(i as u32);
        match self.regions[i].discharge() {
            DischargeOutcome::Discharged(assemblies) => {
                self.event_bus.emit(Event::Discharge {
                    region,
                    assemblies,
                    tick: now,
                });

                let commodity = self.regions[i].spec().out_commodity.clone();
                let supply = saturating_sum(
                    self.regions
                        .iter()
                        .filter(|r| r.spec().out_commodity == commodity)
                        .map(|r| r.spent.quantity()),
                );
                self.series
                    .record(&format!("supply{commodity}"), now, supply);
                debug!(tick = now, region = i, assemblies, "batch discharged");
                true
            }
            DischargeOutcome::Blocked { needed, room } => {
                self.event_bus.emit(Event::DischargeFailed {
                    region,
                    needed,
                    room,
                    tick: now,
                });
                warn!(tick = now, region = i, needed, room, "discharge blocked: spent inventory full");
                false
            }
        }
    }

    fn load_region(&mut self, i: usize, now: Ticks) {
        let assemblies = self.regions[i].load();
        if assemblies > 0 {
            self.event_bus.emit(Event::Load {
                region: RegionId(i as u32),
                assemblies,
                tick: now,
            });
            debug!(tick = now, region = i, assemblies, "fresh fuel loaded");
        }
    }

    /// Retired tick: burn the core once, empty it as far as spent room
    /// allows, and signal decommissioning when nothing is left.
    fn wind_down(&mut self, now: Ticks) -> Result<(), ReactorError> {
        self.power = Fixed64::ZERO;
        self.event_bus.emit(Event::Retired { tick: now });
        if self.decommission.signalled {
            return Ok(());
        }

        if !self.decommission.transmuted {
            for i in 0..self.regions.len() {
                let capacity = self.regions[i].spec().core_capacity;
                let n = if self.transmute_all {
                    capacity
                } else {
                    capacity.div_ceil(2)
                };
                self.transmute_region(i, n, now)?;
            }
            self.decommission.transmuted = true;
            info!(tick = now, transmute_all = self.transmute_all, "reactor retired");
        }

        for i in 0..self.regions.len() {
            while !self.regions[i].core.is_empty() {
                if !self.discharge_region(i, now) {
                    break;
                }
            }
        }
        for region in &mut self.regions {
            region.drain_fresh_to_spent();
        }

        if self.regions.iter().all(Region::is_empty) {
            self.decommission.signalled = true;
            self.event_bus.emit(Event::DecommissionReady { tick: now });
            info!(tick = now, "reactor ready to decommission");
        }
        Ok(())
    }
}
