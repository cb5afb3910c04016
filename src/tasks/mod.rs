//! Background Tasks Module
//!
//! Contains the background timers that run alongside cache operations.
//!
//! # Tasks
//! - Expiration: removes a single entry once its ttl elapses
//! - Update: periodically replaces an entry's value through its update function

mod timer;

pub use timer::{Schedule, TimerRegistry};
