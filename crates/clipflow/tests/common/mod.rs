//! Shared test utilities for clipflow integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated engines backed by a temp-dir database
//! - Helpers for draining the job event stream

pub mod harness;

pub use harness::TestHarness;
