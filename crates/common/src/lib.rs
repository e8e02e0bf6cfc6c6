//! Common types and utilities for Foodhall
//!
//! This crate provides primitives shared by every Foodhall crate.
//!
//! # Modules
//!
//! - [`money`] - Integer minor-unit amounts and their major-unit presentation
//! - [`clock`] - Injectable wall clock for timestamps and "today" windows

pub mod clock;
pub mod money;

pub use clock::{Clock, ManualClock, SystemClock};
pub use money::Money;
