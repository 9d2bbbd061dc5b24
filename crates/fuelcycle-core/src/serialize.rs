//! Serialization and snapshot support for reactors.
//!
//! Provides binary serialization via `bitcode` with a versioned header, a
//! snapshot ring buffer for rollback, and FNV-1a state hashing for
//! determinism checks.

use crate::clock::CycleClock;
use crate::event::EventBus;
use crate::fixed::{Fixed64, Ticks};
use crate::index::FuelIndex;
use crate::inventory::Inventory;
use crate::reactor::{DecommissionState, Reactor};
use crate::region::Region;
use crate::timeseries::TimeSeries;
use crate::transmute::TransmutationTable;
use serde::{Deserialize, Serialize};
use slotmap::Key;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a reactor snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xF0E1_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every snapshot for format and version checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Step at which the snapshot was taken.
    pub tick: Ticks,
}

impl SnapshotHeader {
    pub fn new(tick: Ticks) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Serializable reactor state
// ---------------------------------------------------------------------------

/// Everything needed to resume a reactor. The event bus (closures) and the
/// recorded time series are not part of it; the transmutation table is
/// rebuilt from the region specs.
#[derive(Debug, Serialize, Deserialize)]
struct ReactorSnapshot {
    header: SnapshotHeader,
    regions: Vec<Region>,
    clock: CycleClock,
    index: FuelIndex,
    exit_time: Option<Ticks>,
    transmute_all: bool,
    keep_packaging: bool,
    power_capacity: Fixed64,
    power_name: String,
    power: Fixed64,
    decommission: DecommissionState,
}

impl Reactor {
    /// Serialize the reactor state, stamped with the current step.
    pub fn serialize(&self, tick: Ticks) -> Result<Vec<u8>, SerializeError> {
        let snapshot = ReactorSnapshot {
            header: SnapshotHeader::new(tick),
            regions: self.regions.clone(),
            clock: self.clock.clone(),
            index: self.index.clone(),
            exit_time: self.exit_time,
            transmute_all: self.transmute_all,
            keep_packaging: self.keep_packaging,
            power_capacity: self.power_capacity,
            power_name: self.power_name.clone(),
            power: self.power,
            decommission: self.decommission,
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Restore a reactor. Validates the header before use; the event bus and
    /// time series start empty.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: ReactorSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;

        let transmutations = TransmutationTable::from_regions(
            snapshot.regions.iter().map(|r| (r.id(), r.spec())),
        );
        Ok(Reactor {
            regions: snapshot.regions,
            clock: snapshot.clock,
            index: snapshot.index,
            transmutations,
            exit_time: snapshot.exit_time,
            transmute_all: snapshot.transmute_all,
            keep_packaging: snapshot.keep_packaging,
            power_capacity: snapshot.power_capacity,
            power_name: snapshot.power_name,
            power: snapshot.power,
            decommission: snapshot.decommission,
            event_bus: EventBus::default(),
            series: TimeSeries::new(),
        })
    }

    /// Deterministic hash of inventories, clock, index and lifecycle flags.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        for region in &self.regions {
            h.write_u32(region.id().0);
            for inventory in [&region.fresh, &region.core, &region.spent] {
                hash_inventory(&mut h, inventory);
            }
        }

        h.write_u64(self.clock.cycle_step());
        for region in &self.regions {
            h.write(&[self.clock.is_discharged(region.id()) as u8]);
        }

        for (unit, entry) in self.index.iter() {
            h.write_u64(unit.data().as_ffi());
            h.write_u32(entry.region.0);
            h.write(entry.commodity.as_str().as_bytes());
        }

        h.write(&[
            self.decommission.transmuted as u8,
            self.decommission.signalled as u8,
        ]);
        h.write_fixed64(self.power);
        h.finish()
    }

    /// Serialize into a ring buffer entry.
    pub fn take_snapshot(
        &self,
        tick: Ticks,
        buffer: &mut SnapshotRingBuffer,
    ) -> Result<(), SerializeError> {
        let data = self.serialize(tick)?;
        buffer.push(SnapshotEntry { tick, data });
        Ok(())
    }

    /// Restore from a ring buffer entry (0 = oldest). `None` if out of range.
    pub fn restore_snapshot(
        buffer: &SnapshotRingBuffer,
        index: usize,
    ) -> Result<Option<Reactor>, DeserializeError> {
        let Some(entry) = buffer.get(index) else {
            return Ok(None);
        };
        Reactor::deserialize(&entry.data).map(Some)
    }
}

fn hash_inventory(h: &mut StateHash, inventory: &Inventory) {
    h.write_u64(inventory.count() as u64);
    for unit in inventory.iter() {
        h.write_u64(unit.id.data().as_ffi());
        h.write_fixed64(unit.mass);
        h.write_u32(unit.recipe.0);
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// FNV-1a (64-bit) hash for desync detection. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// SnapshotRingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer of serialized reactor snapshots. When full,
/// the oldest snapshot is evicted.
#[derive(Debug)]
pub struct SnapshotRingBuffer {
    entries: Vec<Option<SnapshotEntry>>,
    head: usize,
    len: usize,
}

#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub tick: Ticks,
    pub data: Vec<u8>,
}

impl SnapshotRingBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, entry: SnapshotEntry) {
        self.entries[self.head] = Some(entry);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 0 = oldest, len-1 = newest.
    pub fn get(&self, index: usize) -> Option<&SnapshotEntry> {
        if index >= self.len {
            return None;
        }
        let start = if self.len < self.capacity() { 0 } else { self.head };
        self.entries[(start + index) % self.capacity()].as_ref()
    }

    pub fn latest(&self) -> Option<&SnapshotEntry> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }
}
