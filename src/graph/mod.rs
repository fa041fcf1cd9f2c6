//! The graph store.
//!
//! A [Graph](store::Graph) is a directed multigraph over node ids 0..N-1, edges being identified
//! by their insertion rank. Per node and per edge features are stored in named [FeatureTable](features::FeatureTable).
//!
//! The in and out incidences are computed once at build time as Csr matrices (see the sprs crate), so that
//! degrees are O(1) and inbound edges of a node come in ascending edge id order.

use num_traits::{Float, FromPrimitive};

/// Our feature element type must satisfy:
/// Float for the builtin reductions, FromPrimitive to divide by mailbox sizes,
/// ScalarOperand for ndarray scalar operations, Send + Sync for parallel iterations.
/// The bit accessors give the IEEE representation, widened to 64 bits, used by the bson dump.
pub trait FeatureT:
    Float + FromPrimitive + ndarray::ScalarOperand + Send + Sync + std::fmt::Debug + Default + 'static
{
    fn to_bits64(self) -> u64;
    fn from_bits64(bits: u64) -> Option<Self>;
}

impl FeatureT for f32 {
    fn to_bits64(self) -> u64 {
        u64::from(self.to_bits())
    }
    // upper bits must be clear
    fn from_bits64(bits: u64) -> Option<Self> {
        u32::try_from(bits).ok().map(f32::from_bits)
    }
}

impl FeatureT for f64 {
    fn to_bits64(self) -> u64 {
        self.to_bits()
    }
    fn from_bits64(bits: u64) -> Option<Self> {
        Some(f64::from_bits(bits))
    }
}

pub mod features;

pub mod degrees;

pub mod store;

/// extraction of node induced and edge induced subgraphs
pub mod subgraph;

/// structural transformations returning new graphs
pub mod transform;

/// conversion from/to petgraph
pub mod convert;

pub use features::{Column, ColumnKind, FeatureSource, FeatureTable};
pub use store::Graph;
pub use subgraph::{EID, NID};
