//! Integration tests for sqlfleet
//!
//! These tests verify the interaction between the registry, the polling
//! loops, and the persistence layer without mocking.

pub mod persistence_tests;
pub mod poll_pipeline_tests;
