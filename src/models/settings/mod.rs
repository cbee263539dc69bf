// Settings module
// Calendar grid and drag-and-drop configuration

use chrono::Duration;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Calendar time zone used for day arithmetic and slot instants.
    pub time_zone: Tz,
    /// First hour shown at the top of the time grid.
    pub first_visible_hour: u32,
    /// Pixel height of one 15-minute slot.
    pub slot_height_px: f32,
    /// Pointer travel (px) before a press becomes a drag.
    pub drag_threshold_px: f32,
    /// Slots covered by a plain click on the grid.
    pub click_duration_slots: u32,
    /// Length of the event created when a task is dropped on a time block.
    pub task_duration_minutes: i64,
    /// Window used when a task is dropped on a whole day.
    pub task_day_start_hour: u32,
    pub task_day_end_hour: u32,
    /// Calendar that receives events created from tasks.
    pub default_calendar_id: Option<String>,
    /// Buffer the range queries apply on both sides of their window.
    pub range_buffer_hours: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_zone: Tz::UTC,
            first_visible_hour: 0,
            slot_height_px: 24.0,
            drag_threshold_px: 5.0,
            click_duration_slots: 1,
            task_duration_minutes: 60,
            task_day_start_hour: 9,
            task_day_end_hour: 10,
            default_calendar_id: None,
            range_buffer_hours: 24,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if self.first_visible_hour > 23 {
            return Err("first_visible_hour must be between 0 and 23".to_string());
        }

        if !(self.slot_height_px.is_finite() && self.slot_height_px > 0.0) {
            return Err("slot_height_px must be a positive number".to_string());
        }

        if !(self.drag_threshold_px.is_finite() && self.drag_threshold_px >= 0.0) {
            return Err("drag_threshold_px must not be negative".to_string());
        }

        if self.click_duration_slots == 0 {
            return Err("click_duration_slots must be at least 1".to_string());
        }

        if self.task_duration_minutes <= 0 {
            return Err("task_duration_minutes must be positive".to_string());
        }

        if self.task_day_start_hour > 23 || self.task_day_end_hour > 24 {
            return Err("task day window hours must be within the day".to_string());
        }

        if self.task_day_end_hour <= self.task_day_start_hour {
            return Err("task_day_end_hour must be after task_day_start_hour".to_string());
        }

        if self.range_buffer_hours < 0 {
            return Err("range_buffer_hours must not be negative".to_string());
        }

        Ok(())
    }

    pub fn task_duration(&self) -> Duration {
        Duration::minutes(self.task_duration_minutes)
    }

    pub fn range_buffer(&self) -> Duration {
        Duration::hours(self.range_buffer_hours)
    }
}
