//! GTD Board Library
//!
//! A hierarchical task board: tasks live in status columns, nest under
//! parents, and move between columns with their subtrees. This module exports
//! the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod subscriptions;
pub mod tree;
pub mod types;
