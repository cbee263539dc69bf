// Calendar DnD Library
// Drag-and-drop scheduling engine and optimistic event cache

pub mod dnd;
pub mod models;
pub mod services;
pub mod utils;
