// Module exports for models

pub mod event;
pub mod mutation;
pub mod settings;
pub mod slot;
pub mod task;
pub mod ui;
