//! Adversarial input tests for the reactor engine.
//!
//! Tests edge cases that should either return errors or be handled gracefully
//! without panics.

use fuelcycle_core::config::ConfigError;
use fuelcycle_core::exchange::*;
use fuelcycle_core::fixed::Fixed64;
use fuelcycle_core::id::*;
use fuelcycle_core::reactor::{Reactor, ReactorError};
use fuelcycle_core::test_utils::*;

/// Zero-capacity spent inventory: the reactor fills, burns once, then sits
/// at zero power forever.
#[test]
fn zero_capacity_spent_inventory() {
    let mut cfg = single_region_config();
    cfg.cycle_length = 1;
    cfg.refuel_length = 0;
    cfg.spent_capacity = vec![0];
    let mut reactor = make_reactor(&cfg);
    let mut market = MockMarket::new();
    market.add_source(FuelSource::unlimited("uox", uox()));

    market.run(&mut reactor, 20).unwrap();
    assert_eq!(reactor.power(), Fixed64::ZERO);
    assert_eq!(reactor.regions()[0].spent.count(), 0);
    assert_eq!(market.bought(), 5);
}

/// Zero-capacity fresh buffer: the core is ordered directly.
#[test]
fn zero_capacity_fresh_inventory() {
    let mut cfg = single_region_config();
    cfg.fresh_capacity = vec![0];
    cfg.cycle_length = 1;
    cfg.refuel_length = 0;
    let mut reactor = make_reactor(&cfg);
    let mut market = MockMarket::new();
    market.add_source(FuelSource::unlimited("uox", uox()));
    market.add_sink(FuelSink::unlimited("waste"));

    market.run(&mut reactor, 10).unwrap();
    assert_eq!(reactor.regions()[0].fresh.count(), 0);
    assert!(reactor.all_full());
}

/// Batch larger than the core: a discharge empties the core.
#[test]
fn batch_larger_than_core() {
    let mut cfg = single_region_config();
    cfg.batch_size = vec![10];
    cfg.cycle_length = 1;
    cfg.refuel_length = 0;
    let mut reactor = make_reactor(&cfg);
    let mut market = MockMarket::new();
    market.add_source(FuelSource::unlimited("uox", uox()));
    market.add_sink(FuelSink::unlimited("waste"));

    market.run(&mut reactor, 10).unwrap();
    assert!(market.sold() > 0);
    assert_eq!(reactor.index().len(), reactor.fuel_count());
}

/// No source at all: the reactor never starts and the clock holds at zero.
#[test]
fn starved_reactor_never_starts() {
    let mut reactor = make_reactor(&single_region_config());
    let mut market = MockMarket::new();
    market.run(&mut reactor, 50).unwrap();
    assert_eq!(reactor.clock().cycle_step(), 0);
    assert!(reactor.series.get("power").iter().all(|s| s.value == Fixed64::ZERO));
}

/// Exit time zero: the reactor runs one step and retires straight after.
#[test]
fn exit_at_first_step() {
    let mut cfg = single_region_config();
    cfg.exit_time = Some(0);
    let mut reactor = make_reactor(&cfg);
    let mut market = MockMarket::new();
    market.add_source(FuelSource::unlimited("uox", uox()));
    market.add_sink(FuelSink::unlimited("waste"));

    market.run(&mut reactor, 5).unwrap();
    assert!(reactor.is_decommission_ready());
    assert_eq!(reactor.fuel_count(), 0);
}

/// Trades on an unknown commodity are rejected, not silently dropped into a
/// region.
#[test]
fn foreign_commodity_delivery() {
    let mut reactor = make_reactor(&single_region_config());
    let mut minter = Minter::new();
    let responses = vec![TradeResponse {
        trade: Trade {
            request: RequestId(0),
            commodity: "plutonium".into(),
            quantity: fixed(300.0),
        },
        unit: minter.mint(fixed(300.0), mox()),
    }];
    assert!(matches!(
        reactor.accept_trades(0, responses),
        Err(ReactorError::UnsupportedCommodity(_))
    ));
    assert!(reactor.index().is_empty());
}

/// Asking for more spent fuel than exists fails without losing any.
#[test]
fn over_asked_give_trades() {
    let mut reactor = make_reactor(&single_region_config());
    let trades = vec![Trade {
        request: RequestId(0),
        commodity: "waste".into(),
        quantity: fixed(300.0),
    }];
    assert_eq!(
        reactor.give_trades(0, &trades),
        Err(ReactorError::NoSpentFuel("waste".into()))
    );
    assert_eq!(reactor.fuel_count(), 0);
}

/// Empty trade and request lists are fine.
#[test]
fn empty_exchanges() {
    let mut reactor = make_reactor(&single_region_config());
    reactor.accept_trades(0, Vec::new()).unwrap();
    assert!(reactor.give_trades(0, &[]).unwrap().is_empty());
    assert!(reactor.get_bids(&RequestsByCommodity::new()).unwrap().is_empty());
}

/// Malformed configurations are rejected at construction.
#[test]
fn malformed_configurations() {
    let registry = test_registry();

    let mut cfg = single_region_config();
    cfg.core_size.push(3);
    assert!(matches!(
        Reactor::new(&cfg, &registry),
        Err(ConfigError::LengthMismatch { field: "core_size", .. })
    ));

    let mut cfg = single_region_config();
    cfg.assem_size = vec![f64::NAN];
    assert!(matches!(
        Reactor::new(&cfg, &registry),
        Err(ConfigError::BadAssemblySize { .. })
    ));

    let mut cfg = single_region_config();
    cfg.batch_size = vec![0];
    assert!(matches!(
        Reactor::new(&cfg, &registry),
        Err(ConfigError::ZeroBatchSize { .. })
    ));
}

/// Assembly masses near the fixed-point range saturate instead of
/// overflowing.
#[test]
fn huge_assemblies_saturate() {
    let mut cfg = single_region_config();
    cfg.assem_size = vec![1.0e12];
    let mut reactor = make_reactor(&cfg);
    let mut market = MockMarket::new();
    market.add_source(FuelSource::unlimited("uox", uox()));
    market.run(&mut reactor, 3).unwrap();
    assert!(reactor.all_full());
    assert_eq!(reactor.regions()[0].core.quantity(), Fixed64::MAX);
}
