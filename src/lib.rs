//! Message passing on graphs with named node and edge features.
//!
//! - [graph] : the graph store, topology queries, feature tables, subgraphs and transformations.
//! - [engine] : update_all (message, reduce, optional apply), send_and_recv, apply_edges, apply_nodes
//!   and local feature scopes.
//! - [batch] : fusion of several graphs into one, unbatching and graph level readout.
//! - [io] : bson dump and reload.
//!
//! Features are dense `ndarray::Array2` with one row per node or per edge, of element type f32 or f64.

pub mod errors;

pub mod graph;

pub mod engine;

pub mod batch;

pub mod io;

pub mod prelude;
