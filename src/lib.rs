//! cardmap: summary statistics and geo-clustering for marketplace shipment orders
//!
//! This library takes a table of parsed, geocoded order shipments and produces
//! aggregates by country, by location, and by spatial cluster (nearby locations
//! grouped together for map display), plus grand totals.

pub mod cli;
pub mod cluster;
pub mod data;
pub mod geo;
pub mod grouping;

// Re-export public items for easier access
pub use cli::Args;
pub use cluster::{cluster_locations, ClusterAggregate, Dendrogram};
pub use data::{load_orders, ShipmentRecord};
pub use grouping::{
    groupby_country, groupby_location, summarize, CountryAggregate, LocationAggregate,
    RepresentativePolicy, Totals,
};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
