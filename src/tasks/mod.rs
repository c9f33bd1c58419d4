//! Background Tasks Module
//!
//! Contains the work the worker schedules without making the caller wait.
//!
//! # Tasks
//! - Revalidation: refreshes a stored asset after a cache hit was served
//! - Pruning: trims the media store back to its bound after a write

mod background;

pub use background::BackgroundTasks;
