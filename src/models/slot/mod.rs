// Slot module
// Quantized positions on the time grid

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Minutes covered by one grid slot.
pub const SLOT_MINUTES: u32 = 15;
/// Slots per hour of the grid.
pub const SLOTS_PER_HOUR: u32 = 60 / SLOT_MINUTES;
/// Slots in one day; valid slot indices are `0..SLOTS_PER_DAY`.
pub const SLOTS_PER_DAY: u32 = 24 * SLOTS_PER_HOUR;

/// A 15-minute position on the grid.
///
/// Start slots are always within `00:00..=23:45`. The only slot outside that
/// range is [`Slot::END_OF_DAY`] (`24:00`), used as an exclusive range end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    pub hour: u32,
    pub minute: u32,
}

impl Slot {
    pub const START_OF_DAY: Slot = Slot { hour: 0, minute: 0 };
    pub const LAST: Slot = Slot {
        hour: 23,
        minute: 45,
    };
    pub const END_OF_DAY: Slot = Slot {
        hour: 24,
        minute: 0,
    };

    /// Create a start slot; `minute` must be a multiple of 15.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 && minute % SLOT_MINUTES == 0 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Linear index of the slot within the day (`hour*4 + minute/15`).
    pub fn index(&self) -> u32 {
        self.hour
            .saturating_mul(SLOTS_PER_HOUR)
            .saturating_add(self.minute / SLOT_MINUTES)
    }

    /// Inverse of [`Slot::index`]. Index 96 maps to [`Slot::END_OF_DAY`];
    /// anything beyond is clamped there.
    pub fn from_index(index: u32) -> Self {
        let index = index.min(SLOTS_PER_DAY);
        Self {
            hour: index / SLOTS_PER_HOUR,
            minute: (index % SLOTS_PER_HOUR) * SLOT_MINUTES,
        }
    }

    /// Offset of the slot from midnight.
    pub fn offset(&self) -> Duration {
        Duration::minutes(i64::from(self.hour) * 60 + i64::from(self.minute))
    }

    /// Wall-clock time of the slot; `None` for [`Slot::END_OF_DAY`].
    pub fn time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0)
    }

    /// Wall-clock date-time of this slot on `date` (24:00 rolls to the next day).
    pub fn on(&self, date: NaiveDate) -> chrono::NaiveDateTime {
        date.and_time(NaiveTime::MIN) + self.offset()
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Half-open slot range `[start_slot, end_slot)` covered by a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRange {
    pub start_slot: Slot,
    pub end_slot: Slot,
}

impl SlotRange {
    /// Range covering the slots between two indices, inclusive of both.
    pub fn covering(a: u32, b: u32) -> Self {
        let lo = a.min(b).min(SLOTS_PER_DAY - 1);
        let hi = a.max(b).min(SLOTS_PER_DAY - 1);
        Self {
            start_slot: Slot::from_index(lo),
            end_slot: Slot::from_index(hi + 1),
        }
    }

    /// Range of `len` slots starting at `start` (at least one slot, clipped to the day).
    pub fn starting_at(start: Slot, len: u32) -> Self {
        let first = start.index().min(SLOTS_PER_DAY - 1);
        Self {
            start_slot: Slot::from_index(first),
            end_slot: Slot::from_index(first + len.max(1)),
        }
    }

    /// Number of slots covered.
    pub fn len(&self) -> u32 {
        self.end_slot.index().saturating_sub(self.start_slot.index())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration(&self) -> Duration {
        self.end_slot.offset() - self.start_slot.offset()
    }
}
