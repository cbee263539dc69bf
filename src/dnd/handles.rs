// Resize edge zones
//
// A press on the top or bottom band of a timed event block starts a resize of
// that edge; a press anywhere else on the block starts a move.

use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};

use super::payload::DragPayload;
use crate::models::event::CalendarEvent;
use crate::models::ui::ViewKind;

/// Blocks shorter than this split evenly into a top and a bottom zone.
pub const SMALL_BLOCK_HEIGHT: f32 = 50.0;
/// Zone height on blocks of at least [`SMALL_BLOCK_HEIGHT`].
pub const EDGE_ZONE_HEIGHT: f32 = 20.0;

/// Zone of a timed block a resize was grabbed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeEdge {
    /// Upper band: the start snaps to the pointer's slot, the end stays.
    Top,
    /// Lower band: the end snaps to the pointer's slot, the start stays.
    Bottom,
}

/// Hit zones for the two resize edges of a timed event block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeZones {
    pub top: Rect,
    pub bottom: Rect,
}

impl EdgeZones {
    pub fn for_timed_event(block: Rect) -> Self {
        let height = block.height().max(0.0);
        let zone_height = if height < SMALL_BLOCK_HEIGHT {
            height / 2.0
        } else {
            EDGE_ZONE_HEIGHT
        };

        // Zones span the full width of the block
        Self {
            top: Rect::from_min_size(block.left_top(), Vec2::new(block.width(), zone_height)),
            bottom: Rect::from_min_size(
                Pos2::new(block.left(), block.bottom() - zone_height),
                Vec2::new(block.width(), zone_height),
            ),
        }
    }

    /// Edge under `pos`, top first when the zones touch.
    pub fn hit_test(&self, pos: Pos2) -> Option<ResizeEdge> {
        if self.top.contains(pos) {
            Some(ResizeEdge::Top)
        } else if self.bottom.contains(pos) {
            Some(ResizeEdge::Bottom)
        } else {
            None
        }
    }

    pub fn get(&self, edge: ResizeEdge) -> Rect {
        match edge {
            ResizeEdge::Top => self.top,
            ResizeEdge::Bottom => self.bottom,
        }
    }
}

/// Payload for a press at `pos` on the rendered block of `event`.
///
/// Only timed events have resize edges; all-day events always move.
pub fn grab_payload(event: &CalendarEvent, block: Rect, pos: Pos2, view: ViewKind) -> DragPayload {
    if !event.is_all_day() && view.has_time_grid() {
        if let Some(edge) = EdgeZones::for_timed_event(block).hit_test(pos) {
            return DragPayload::EventResize {
                event: event.clone(),
                edge,
            };
        }
    }

    DragPayload::EventMove {
        event: event.clone(),
        source_view: Some(view),
    }
}
