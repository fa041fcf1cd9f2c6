//! Persistence of graphs.

/// bson dump and reload of a graph with its features
pub mod bson;
