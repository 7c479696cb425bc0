//! Shared test utilities for autonews integration tests.

#![allow(dead_code)]

pub mod harness;
pub mod mock_api;

pub use harness::{two_step_table, TestHarness};
pub use mock_api::{ApiCall, MockApi};
