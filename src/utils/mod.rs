//! Utility functions and helpers
//!
//! This module contains timestamp utilities and other helper functions.

pub mod time;

pub use time::{current_timestamp, days_until, format_timestamp, today};
