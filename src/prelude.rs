//! To ease access to most frequently used items

pub use crate::errors::{GraphError, Result};

pub use crate::graph::degrees::Degree;
pub use crate::graph::{Column, ColumnKind, FeatureSource, FeatureT, FeatureTable, Graph, EID, NID};

pub use crate::engine::apply::{apply_edges, apply_nodes};
pub use crate::engine::funcs::*;
pub use crate::engine::params::PassParams;
pub use crate::engine::scope::FeatureScope;
pub use crate::engine::update::{send_and_recv, update_all, update_all_apply, IsolatedFill, NodeUpdate};

pub use crate::batch::batched::{batch, unbatch};
pub use crate::batch::readout::{broadcast_nodes, readout_edges, readout_nodes};

pub use crate::io::bson::{bson_dump, bson_reload, get_bson_header};
