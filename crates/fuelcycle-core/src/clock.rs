//! Shared cycle clock.
//!
//! All regions cycle in lockstep. `cycle_step` counts steps since the current
//! cycle started and only begins counting once every region is full, so a
//! freshly deployed reactor does not age before its first load.

use crate::fixed::Ticks;
use crate::id::RegionId;
use serde::{Deserialize, Serialize};

/// Where the reactor is within its operating cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclePhase {
    /// Waiting for the first full core; the clock is held at zero.
    Filling,
    /// `0 <= cycle_step < cycle_length`.
    Irradiating,
    /// `cycle_step == cycle_length`: burn and discharge.
    EndOfCycle,
    /// Outage: `cycle_length < cycle_step < cycle_length + refuel_length`.
    Refueling,
    /// Outage elapsed; a new cycle starts once every region is full and
    /// has discharged.
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleClock {
    cycle_step: Ticks,
    cycle_length: Ticks,
    refuel_length: Ticks,
    /// Per region: end-of-cycle discharge has succeeded this cycle.
    discharged: Vec<bool>,
}

impl CycleClock {
    pub fn new(cycle_length: Ticks, refuel_length: Ticks, regions: usize) -> Self {
        Self {
            cycle_step: 0,
            cycle_length,
            refuel_length,
            discharged: vec![false; regions],
        }
    }

    pub fn cycle_step(&self) -> Ticks {
        self.cycle_step
    }

    pub fn cycle_length(&self) -> Ticks {
        self.cycle_length
    }

    pub fn refuel_length(&self) -> Ticks {
        self.refuel_length
    }

    /// Steps from one cycle start to the next.
    pub fn cadence(&self) -> Ticks {
        self.cycle_length + self.refuel_length
    }

    pub fn phase(&self, all_full: bool) -> CyclePhase {
        let step = self.cycle_step;
        if step == 0 && !all_full {
            CyclePhase::Filling
        } else if step < self.cycle_length {
            CyclePhase::Irradiating
        } else if step == self.cycle_length {
            CyclePhase::EndOfCycle
        } else if step < self.cadence() {
            CyclePhase::Refueling
        } else {
            CyclePhase::Ready
        }
    }

    pub fn is_end_of_cycle(&self) -> bool {
        self.cycle_step == self.cycle_length
    }

    pub fn past_end_of_cycle(&self) -> bool {
        self.cycle_step >= self.cycle_length
    }

    pub fn is_mid_cycle(&self) -> bool {
        self.cycle_step < self.cycle_length
    }

    pub fn refuel_elapsed(&self) -> bool {
        self.cycle_step >= self.cadence()
    }

    /// Steps left until the next cycle could start. Negative while a late
    /// reload holds the clock past its cadence.
    pub fn steps_left_in_cycle(&self) -> i64 {
        self.cadence() as i64 - self.cycle_step as i64
    }

    pub fn is_discharged(&self, region: RegionId) -> bool {
        self.discharged
            .get(region.index())
            .copied()
            .unwrap_or(false)
    }

    pub fn mark_discharged(&mut self, region: RegionId) {
        if let Some(flag) = self.discharged.get_mut(region.index()) {
            *flag = true;
        }
    }

    pub fn all_discharged(&self) -> bool {
        self.discharged.iter().all(|d| *d)
    }

    /// Start a new cycle if the outage has elapsed and every region is full
    /// and discharged. Returns whether the clock was reset.
    pub fn try_reset(&mut self, all_full: bool) -> bool {
        if self.refuel_elapsed() && all_full && self.all_discharged() {
            self.cycle_step = 0;
            self.discharged.iter_mut().for_each(|d| *d = false);
            true
        } else {
            false
        }
    }

    /// Advance one step, unless the clock is at zero and the core is not yet
    /// full. Returns whether the clock moved.
    pub fn advance(&mut self, all_full: bool) -> bool {
        if self.cycle_step > 0 || all_full {
            self.cycle_step += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_holds_at_zero_until_full() {
        let mut clock = CycleClock::new(3, 1, 1);
        assert_eq!(clock.phase(false), CyclePhase::Filling);
        assert!(!clock.advance(false));
        assert_eq!(clock.cycle_step(), 0);
        assert!(clock.advance(true));
        assert_eq!(clock.cycle_step(), 1);
    }

    #[test]
    fn clock_keeps_running_once_started() {
        let mut clock = CycleClock::new(3, 1, 1);
        clock.advance(true);
        assert!(clock.advance(false));
        assert_eq!(clock.cycle_step(), 2);
    }

    #[test]
    fn phases_follow_cycle_then_outage() {
        let mut clock = CycleClock::new(2, 2, 1);
        let mut phases = Vec::new();
        for _ in 0..5 {
            phases.push(clock.phase(true));
            clock.advance(true);
        }
        assert_eq!(
            phases,
            vec![
                CyclePhase::Irradiating,
                CyclePhase::Irradiating,
                CyclePhase::EndOfCycle,
                CyclePhase::Refueling,
                CyclePhase::Ready,
            ]
        );
    }

    #[test]
    fn reset_requires_every_region_discharged() {
        let mut clock = CycleClock::new(1, 0, 2);
        clock.advance(true);
        clock.mark_discharged(RegionId(0));
        assert!(!clock.try_reset(true));
        clock.mark_discharged(RegionId(1));
        assert!(!clock.try_reset(false));
        assert!(clock.try_reset(true));
        assert_eq!(clock.cycle_step(), 0);
        assert!(!clock.is_discharged(RegionId(0)));
        assert!(!clock.is_discharged(RegionId(1)));
    }

    #[test]
    fn reset_waits_for_outage() {
        let mut clock = CycleClock::new(1, 2, 1);
        clock.advance(true);
        clock.mark_discharged(RegionId(0));
        assert!(!clock.try_reset(true));
        clock.advance(true);
        clock.advance(true);
        assert!(clock.try_reset(true));
    }

    #[test]
    fn steps_left_goes_negative_on_late_reload() {
        let mut clock = CycleClock::new(1, 1, 1);
        for _ in 0..4 {
            clock.advance(true);
        }
        assert_eq!(clock.steps_left_in_cycle(), -2);
    }
}
