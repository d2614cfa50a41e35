//! Compliance engine: recurrence evaluation, occurrence materialization,
//! due-window aggregation and temperature threshold classification.
//!
//! Every function in this crate is pure and synchronous. The clock is always
//! injected (`now` / `today` parameters), so results are deterministic and
//! safe to recompute any number of times — a property the occurrence
//! materializer relies on for idempotent re-runs.

pub mod due;
pub mod materialize;
pub mod recurrence;
pub mod thresholds;

#[cfg(test)]
mod tests;
