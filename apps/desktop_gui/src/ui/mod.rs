//! UI layer for the review window.

pub mod app;

pub use app::{PersistedSettings, ReviewApp};
