//! Data layer: core types, loading, inference, filtering and reshaping.
//!
//! Architecture:
//! ```text
//!  .csv / .parquet / .json
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  parse file → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ datetime │  coerce date/time-named columns (once, on upload)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐   ┌──────────┐
//!   │  filter  │ → │  pivot   │  per-column predicates, optional reshape
//!   └──────────┘   └──────────┘
//!        │
//!        ▼
//!   chart::build_chart   (types + reduce)
//! ```

pub mod datetime;
pub mod filter;
pub mod loader;
pub mod model;
pub mod pivot;
pub mod reduce;
pub mod types;
