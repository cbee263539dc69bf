//! Pixel ⇄ slot conversion for the time grid.
//!
//! The live preview and the final drop both go through these functions, so the
//! range a user sees while dragging is exactly the range that gets applied.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use egui::{Pos2, Rect};

use crate::models::settings::Settings;
use crate::models::slot::{Slot, SlotRange, SLOTS_PER_DAY, SLOTS_PER_HOUR};
use crate::utils::date::localize;

/// Linear index of a slot (`hour*4 + minute/15`).
pub fn slot_to_linear_index(slot: Slot) -> u32 {
    slot.index()
}

/// Inverse of [`slot_to_linear_index`].
pub fn index_to_slot(index: u32) -> Slot {
    Slot::from_index(index)
}

/// Slot under a pointer position.
///
/// Total: positions above or below the grid clamp to the first or last
/// visible row, and the result is always within `00:00..=23:45`.
pub fn slot_from_position(pointer: Pos2, grid: Rect, first_visible_hour: u32, slot_height_px: f32) -> Slot {
    let first_index = first_row(first_visible_hour);
    if !(slot_height_px > 0.0) {
        return Slot::from_index(first_index);
    }

    let max_offset = (grid.height() - 1.0).max(0.0);
    let offset_y = (pointer.y - grid.top()).clamp(0.0, max_offset);
    // Float-to-int casts saturate, so NaN lands on row 0.
    let rows = (offset_y / slot_height_px).floor() as u32;

    Slot::from_index(first_index.saturating_add(rows).min(SLOTS_PER_DAY - 1))
}

/// Index of the first visible row; hours past the end of the day clamp to 23.
fn first_row(first_visible_hour: u32) -> u32 {
    first_visible_hour.min(23) * SLOTS_PER_HOUR
}

/// Absolute instant at which `slot` starts on `date` in the calendar zone.
pub fn slot_start_instant(date: NaiveDate, slot: Slot, tz: Tz) -> DateTime<Utc> {
    localize(tz, slot.on(date))
}

/// Top offset and height of a preview block, relative to the grid top.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PreviewGeometry {
    pub top: f32,
    pub height: f32,
}

/// Placement of the time grid on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub rect: Rect,
    pub first_visible_hour: u32,
    pub slot_height_px: f32,
}

impl GridMetrics {
    pub fn new(rect: Rect, first_visible_hour: u32, slot_height_px: f32) -> Self {
        Self {
            rect,
            first_visible_hour,
            slot_height_px,
        }
    }

    pub fn from_settings(rect: Rect, settings: &Settings) -> Self {
        Self::new(rect, settings.first_visible_hour, settings.slot_height_px)
    }

    pub fn slot_at(&self, pointer: Pos2) -> Slot {
        slot_from_position(pointer, self.rect, self.first_visible_hour, self.slot_height_px)
    }

    /// Offset of a slot boundary from the grid top (negative above the visible area).
    pub fn slot_top(&self, slot: Slot) -> f32 {
        let first = i64::from(first_row(self.first_visible_hour));
        (i64::from(slot.index()) - first) as f32 * self.slot_height_px
    }

    /// Preview block for a slot range; never shorter than one slot.
    pub fn preview_for(&self, range: SlotRange) -> PreviewGeometry {
        PreviewGeometry {
            top: self.slot_top(range.start_slot),
            height: (range.len() as f32 * self.slot_height_px).max(self.slot_height_px),
        }
    }
}
