//! Utility functions and helpers.

pub mod report;
