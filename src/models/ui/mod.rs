// UI models module
// Calendar views that host drop zones

use serde::{Deserialize, Serialize};

/// Calendar view a drag starts from or drops into.
///
/// The view decides what a day-cell drop means: in `Month` a day cell is a
/// whole day of the grid, in `Week`/`Day` it is the all-day row above the
/// time grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Day,
    Week,
    #[default]
    Month,
}

impl ViewKind {
    pub fn has_time_grid(&self) -> bool {
        matches!(self, ViewKind::Day | ViewKind::Week)
    }
}
