//! Pointer-drag state machine for the time grid.
//!
//! `Idle → Armed → Dragging → Idle`. A press arms the tracker and attaches the
//! broad-scope listeners; the first move past the threshold starts the drag;
//! release or cancel consumes the gesture and detaches the listeners again.
//!
//! Feedback flows through two channels: every move while dragging places the
//! retained preview block through [`PositionSink`] immediately, while the
//! semantic preview range only changes (and [`DragTracker::pointer_move`] only
//! reports a change) when the pointer crosses into another slot.

use chrono::NaiveDate;
use egui::{Pos2, Rect};

use super::geometry::{GridMetrics, PreviewGeometry};
use super::payload::DragPayload;
use crate::models::settings::Settings;
use crate::models::slot::{Slot, SlotRange};

/// Listener scope broader than the element the press started on.
pub trait PointerScope {
    fn attach(&mut self);
    fn detach(&mut self);
}

/// Retained visual handle for the preview block.
pub trait PositionSink {
    fn place(&mut self, geometry: PreviewGeometry);
    fn clear(&mut self);
}

/// Listener bookkeeping for hosts that route pointer input themselves.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScopeListeners {
    attached: bool,
    attach_count: usize,
    detach_count: usize,
}

impl ScopeListeners {
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn attach_count(&self) -> usize {
        self.attach_count
    }

    pub fn detach_count(&self) -> usize {
        self.detach_count
    }
}

impl PointerScope for ScopeListeners {
    fn attach(&mut self) {
        self.attached = true;
        self.attach_count += 1;
    }

    fn detach(&mut self) {
        self.attached = false;
        self.detach_count += 1;
    }
}

/// Preview block held outside the render cycle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RetainedPreview {
    pub geometry: Option<PreviewGeometry>,
    pub placements: usize,
}

impl PositionSink for RetainedPreview {
    fn place(&mut self, geometry: PreviewGeometry) {
        self.geometry = Some(geometry);
        self.placements += 1;
    }

    fn clear(&mut self) {
        self.geometry = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Armed,
    Dragging,
}

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// Released after crossing the threshold.
    Dragged {
        date: NaiveDate,
        /// Slots between the origin and the release slot, both included.
        range: SlotRange,
        /// Slot under the pointer at release.
        release_slot: Slot,
        payload: Option<DragPayload>,
    },
    /// Released without crossing the threshold.
    Clicked {
        date: NaiveDate,
        slot: Slot,
        /// Default-length range starting at the clicked slot.
        range: SlotRange,
        payload: Option<DragPayload>,
    },
    Cancelled,
    /// Nothing was in progress.
    Ignored,
}

#[derive(Debug, Clone)]
struct Gesture {
    date: NaiveDate,
    origin_pos: Pos2,
    origin_slot: Slot,
    current_slot: Slot,
    preview: Option<SlotRange>,
    crossed_threshold: bool,
    payload: Option<DragPayload>,
}

impl Gesture {
    fn covered_range(&self) -> SlotRange {
        SlotRange::covering(self.origin_slot.index(), self.current_slot.index())
    }
}

pub struct DragTracker<S: PointerScope, P: PositionSink> {
    scope: S,
    sink: P,
    metrics: GridMetrics,
    threshold_px: f32,
    click_duration_slots: u32,
    gesture: Option<Gesture>,
    listening: bool,
    suppress_click: bool,
}

impl<S: PointerScope, P: PositionSink> DragTracker<S, P> {
    pub fn new(scope: S, sink: P, metrics: GridMetrics, threshold_px: f32, click_duration_slots: u32) -> Self {
        Self {
            scope,
            sink,
            metrics,
            threshold_px,
            click_duration_slots: click_duration_slots.max(1),
            gesture: None,
            listening: false,
            suppress_click: false,
        }
    }

    pub fn from_settings(scope: S, sink: P, grid: Rect, settings: &Settings) -> Self {
        Self::new(
            scope,
            sink,
            GridMetrics::from_settings(grid, settings),
            settings.drag_threshold_px,
            settings.click_duration_slots,
        )
    }

    pub fn phase(&self) -> DragPhase {
        match &self.gesture {
            None => DragPhase::Idle,
            Some(g) if g.crossed_threshold => DragPhase::Dragging,
            Some(_) => DragPhase::Armed,
        }
    }

    /// Semantic preview range; only set while dragging.
    pub fn preview_range(&self) -> Option<SlotRange> {
        self.gesture.as_ref().and_then(|g| g.preview)
    }

    pub fn origin_slot(&self) -> Option<Slot> {
        self.gesture.as_ref().map(|g| g.origin_slot)
    }

    pub fn payload(&self) -> Option<&DragPayload> {
        self.gesture.as_ref().and_then(|g| g.payload.as_ref())
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn metrics(&self) -> &GridMetrics {
        &self.metrics
    }

    /// Grid moved or resized between frames.
    pub fn set_metrics(&mut self, metrics: GridMetrics) {
        self.metrics = metrics;
    }

    pub fn scope(&self) -> &S {
        &self.scope
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Press over a draggable region of the column for `date`.
    ///
    /// Returns true when the tracker armed. A primary press while a gesture is
    /// already active restarts it without registering listeners twice.
    pub fn pointer_down(
        &mut self,
        button: PointerButton,
        pos: Pos2,
        date: NaiveDate,
        payload: Option<DragPayload>,
    ) -> bool {
        if button != PointerButton::Primary {
            return false;
        }

        if self.gesture.is_some() {
            log::debug!("Pointer down during an active gesture; restarting");
            self.sink.clear();
        }
        self.release_listeners();

        let origin_slot = self.metrics.slot_at(pos);
        self.gesture = Some(Gesture {
            date,
            origin_pos: pos,
            origin_slot,
            current_slot: origin_slot,
            preview: None,
            crossed_threshold: false,
            payload,
        });
        self.suppress_click = false;
        self.scope.attach();
        self.listening = true;

        log::debug!("Drag armed at {} on {}", origin_slot, date);
        true
    }

    /// Pointer moved anywhere within the listener scope.
    ///
    /// Returns true when the semantic preview range changed.
    pub fn pointer_move(&mut self, pos: Pos2) -> bool {
        let threshold = self.threshold_px;
        let metrics = self.metrics;
        let Some(gesture) = self.gesture.as_mut() else {
            return false;
        };

        if !gesture.crossed_threshold {
            if gesture.origin_pos.distance(pos) <= threshold {
                return false;
            }
            gesture.crossed_threshold = true;
            log::debug!("Drag started from {}", gesture.origin_slot);
        }

        gesture.current_slot = metrics.slot_at(pos);
        let range = gesture.covered_range();
        self.sink.place(metrics.preview_for(range));

        if gesture.preview == Some(range) {
            return false;
        }
        gesture.preview = Some(range);
        true
    }

    /// Pointer released; consumes the gesture.
    pub fn pointer_up(&mut self, pos: Pos2) -> GestureOutcome {
        let Some(mut gesture) = self.gesture.take() else {
            return GestureOutcome::Ignored;
        };
        self.finish();

        let outcome = if gesture.crossed_threshold {
            gesture.current_slot = self.metrics.slot_at(pos);
            let range = gesture.covered_range();
            log::debug!("Drag committed: {}..{}", range.start_slot, range.end_slot);
            GestureOutcome::Dragged {
                date: gesture.date,
                range,
                release_slot: gesture.current_slot,
                payload: gesture.payload,
            }
        } else {
            let range = SlotRange::starting_at(gesture.origin_slot, self.click_duration_slots);
            log::debug!("Click at {}", gesture.origin_slot);
            GestureOutcome::Clicked {
                date: gesture.date,
                slot: gesture.origin_slot,
                range,
                payload: gesture.payload,
            }
        };

        self.suppress_click = true;
        outcome
    }

    /// Gesture interrupted by the platform; nothing is committed.
    pub fn pointer_cancel(&mut self) -> GestureOutcome {
        if self.gesture.take().is_none() {
            return GestureOutcome::Ignored;
        }
        self.finish();
        log::debug!("Drag cancelled");
        GestureOutcome::Cancelled
    }

    /// Consume the one synthetic click that follows a commit.
    ///
    /// Returns true when the click should be swallowed.
    pub fn take_synthetic_click(&mut self) -> bool {
        std::mem::take(&mut self.suppress_click)
    }

    fn finish(&mut self) {
        self.sink.clear();
        self.release_listeners();
    }

    fn release_listeners(&mut self) {
        if self.listening {
            self.scope.detach();
            self.listening = false;
        }
    }
}

impl<S: PointerScope, P: PositionSink> Drop for DragTracker<S, P> {
    fn drop(&mut self) {
        self.release_listeners();
    }
}
