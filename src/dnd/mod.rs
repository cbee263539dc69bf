//! Drag-and-drop scheduling on the calendar grid.
//!
//! Pointer input flows through [`tracker::DragTracker`] (using the quantization
//! in [`geometry`]), the dragged item and hovered zones are described by
//! [`payload`], [`resolve`] turns a finished drop into a mutation descriptor and
//! [`coordinator`] gates it on the recurring-scope dialog before handing it to
//! the optimistic cache.

pub mod coordinator;
pub mod geometry;
pub mod handles;
pub mod payload;
pub mod resolve;
pub mod tracker;

pub use coordinator::{DropCoordinator, DropOutcome};
pub use geometry::{GridMetrics, PreviewGeometry};
pub use handles::{EdgeZones, ResizeEdge};
pub use payload::{DragPayload, DropTarget};
pub use resolve::{DropContext, DropDecision, Rejection};
pub use tracker::{DragPhase, DragTracker, GestureOutcome, PointerButton, PointerScope, PositionSink};
