//! Fuelcycle Core -- a discrete-time engine for multi-region nuclear reactors.
//!
//! This crate models the operating cycle of a reactor whose core is split
//! into N independently parameterized regions. Each region owns three FIFO
//! inventories (fresh, core, spent), loads and discharges fuel in whole
//! assemblies, and burns its fuel through a static transmutation table.
//! Fuel is bought and sold through an external resource-exchange market.
//!
//! # Per-Step Protocol
//!
//! The owning simulation loop drives a [`reactor::Reactor`] once per step:
//!
//! 1. **Tick** -- Transmute at end of cycle, discharge completed batches,
//!    top up each core from its fresh buffer. Retired reactors wind down.
//! 2. **Exchange** -- The market collects [`reactor::Reactor::get_requests`],
//!    clears them, and hands fuel over via [`reactor::Reactor::accept_trades`].
//!    It then collects [`reactor::Reactor::get_bids`] against other agents'
//!    requests and takes spent fuel via [`reactor::Reactor::give_trades`].
//! 3. **Tock** -- Advance the cycle clock and report power output.
//!
//! # Key Types
//!
//! - [`reactor::Reactor`] -- Orchestrates regions through the protocol.
//! - [`region::Region`] -- One fuel zone with fresh/core/spent inventories.
//! - [`clock::CycleClock`] -- Shared cycle and refuel timing.
//! - [`index::FuelIndex`] -- Provenance of every fuel unit held.
//! - [`transmute::TransmutationTable`] -- (region, commodity) -> burnt recipe.
//! - [`registry::Registry`] -- Immutable registry of named compositions.
//! - [`event::EventBus`] -- Buffered reactor events with passive listeners.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.
//! - [`serialize`] -- Versioned snapshots via bitcode.

pub mod agent;
pub mod clock;
pub mod composition;
pub mod config;
pub mod event;
pub mod exchange;
pub mod fixed;
pub mod id;
pub mod index;
pub mod inventory;
pub mod reactor;
pub mod region;
pub mod registry;
pub mod serialize;
pub mod timeseries;
pub mod transmute;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
