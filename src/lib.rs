//! Upload tables, filter and reshape them, and aggregate them into
//! chart-ready series.
//!
//! The pipeline is `load -> normalize -> (filter | pivot) -> build_chart`,
//! each stage a pure function of its inputs. [`state::SessionState`] holds
//! the per-user tables and selections that drive it.

pub mod chart;
pub mod config;
pub mod data;
pub mod state;
