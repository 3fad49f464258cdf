//! ETL and analytics core of the observatory of violence against women in
//! Santa Catarina.
//!
//! Raw spreadsheet exports go through [`etl::Pipeline`] into a columnar
//! snapshot; [`snapshot::Observatory`] loads it back for filtering
//! ([`filter`]), population metrics ([`metrics`]) and report tables
//! ([`reports`]).

pub mod adjacency;
pub mod config;
pub mod error;
pub mod etl;
pub mod filter;
pub mod geometry;
pub mod metrics;
pub mod normalize;
pub mod output;
pub mod reports;
pub mod snapshot;
pub mod types;
pub mod util;

pub use adjacency::{build_adjacency, AdjacencyGraph};
pub use error::{ObservatoryError, Result};
pub use etl::{EtlOutput, EtlReport, Pipeline, SourcePaths};
pub use filter::FilterSelection;
pub use normalize::normalize;
pub use snapshot::Observatory;
