//! Foundation module - Core utilities shared by every layer object
//!
//! This module provides:
//! - Logging utilities
//! - Handle-keyed collections

pub mod collections;
pub mod logging;
