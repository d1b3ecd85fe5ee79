//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Handle-keyed collections for pooled instances and load operations
//! - Frame timing and fixed-cadence stepping
//! - Logging utilities

pub mod collections;
pub mod time;
pub mod logging;
