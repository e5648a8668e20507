//! Property-based tests for the window and cursor invariants

pub mod window_proptest;
