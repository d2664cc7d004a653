//! UI to backend worker bridge.

pub mod commands;
pub mod runtime;
