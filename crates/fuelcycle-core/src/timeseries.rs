//! Named time series of fixed-point samples.
//!
//! The reactor records its power output under a configurable name every
//! tock, a `demand<commodity>` sample for each assembly it requests, and a
//! `supply<commodity>` sample of its spent inventory after each discharge.

use crate::fixed::{Fixed64, Ticks};
use std::collections::BTreeMap;

/// One recorded sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub tick: Ticks,
    pub value: Fixed64,
}

#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    series: BTreeMap<String, Vec<Sample>>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &str, tick: Ticks, value: Fixed64) {
        self.series
            .entry(name.to_string())
            .or_default()
            .push(Sample { tick, value });
    }

    /// All samples recorded under `name`, oldest first.
    pub fn get(&self, name: &str) -> &[Sample] {
        self.series.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn latest(&self, name: &str) -> Option<Sample> {
        self.get(name).last().copied()
    }

    /// Samples of `name` recorded at `tick`.
    pub fn at(&self, name: &str, tick: Ticks) -> impl Iterator<Item = Fixed64> + '_ {
        self.get(name)
            .iter()
            .filter(move |s| s.tick == tick)
            .map(|s| s.value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }
}
