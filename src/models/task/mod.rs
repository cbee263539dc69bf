// Task module
// Read-only task items that can be dragged onto the calendar

use serde::{Deserialize, Serialize};

use super::event::TaskLink;

/// An item from the external task list (e.g. an issue tracker).
///
/// The engine only reads these as drag payload content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskItem {
    #[serde(alias = "_id")]
    pub id: String,
    pub external_task_id: String,
    pub title: String,
    #[serde(default)]
    pub identifier: Option<String>,
    pub url: String,
}

impl TaskItem {
    /// Link stored on the event created when this task is scheduled.
    pub fn link(&self) -> TaskLink {
        TaskLink {
            external_task_id: self.external_task_id.clone(),
            url: self.url.clone(),
        }
    }
}
