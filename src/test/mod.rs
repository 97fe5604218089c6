//! Shared functionality which is used in unit- and integration-tests.

pub mod factories;
