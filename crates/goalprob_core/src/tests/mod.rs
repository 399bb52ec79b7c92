//! Scenario tests for the goal probability engine
//!
//! Tests are organized by topic:
//! - `fixtures` - Shared profiles, goals and engine setup
//! - `categories` - Every goal category through calculator and simulation
//! - `probability` - Single-goal simulation properties
//! - `caching` - Cache behaviour seen through the engine
//! - `batch` - Batch evaluation, isolation and cancellation
//! - `robustness` - Timeouts, invalid draws and bad parameters

mod categories;
mod robustness;
