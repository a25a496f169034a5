//! Data layer: fetching, loading and filtering datasets.
//!
//! Architecture:
//! ```text
//!   remote URL
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  fetch    │  download once → local .csv / .csv.gz
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Table
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  Table    │  named columns of CellValue
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  apply column predicates → row indices
//!   └──────────┘
//! ```

pub mod fetch;
pub mod filter;
pub mod loader;
pub mod model;
