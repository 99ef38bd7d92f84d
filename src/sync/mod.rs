//! Reconciliation of a violation set with the tracker and the end-of-run report

pub mod driver;
pub mod outcome;
pub mod render;
