// Service module exports
// Collaborators of the drag-and-drop engine and the optimistic event cache

pub mod database;
pub mod dialog;
pub mod event_store;
pub mod notification;
pub mod query_cache;
pub mod settings;
