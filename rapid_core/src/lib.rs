#![forbid(unsafe_code)]

//! Core engine for Rapid Response Central.
//!
//! This crate provides:
//! - Domain types (emergencies, timers, alerts)
//! - Session and timer registries
//! - The tick driver for running timers
//! - The command layer tying the registries together
//! - Configuration, logging and shift snapshots

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod protocols;
pub mod session;
pub mod timers;
pub mod alerts;
pub mod ticker;
pub mod format;
pub mod state;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, TimerSettings};
pub use protocols::protocol_for;
pub use session::SessionRegistry;
pub use timers::TimerRegistry;
pub use alerts::AlertLog;
pub use ticker::{Tick, TickHandle, TickInterval, Ticker};
pub use format::format_elapsed;
pub use state::{ShiftLock, ShiftState};
pub use engine::{CprOutcome, Engine};
