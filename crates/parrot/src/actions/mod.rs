//! Action handling module for orchestration layers
//!
//! This module provides:
//! - `handler`: Name-based dispatch of JSON actions to a device controller

mod handler;

pub use handler::{parse_action, ActionHandler, ActionResult, SUPPORTED_ACTIONS};
