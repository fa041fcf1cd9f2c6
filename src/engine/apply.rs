//! Edge-wise and node-wise computations : apply_edges, apply_nodes.
//!
//! apply_edges computes one row per edge from the rows of its endpoints and its own row, there is
//! no reduction. The output is a fresh array, calling it twice with the same inputs gives the same result.

use cpu_time::ProcessTime;
use std::time::SystemTime;

use ndarray::Array2;

use crate::errors::{GraphError, Result};
use crate::graph::{FeatureSource, FeatureT, FeatureTable, Graph};

use super::funcs::{EdgeFn, EdgeRef, NodeFn, NodeRef};
use super::params::PassParams;
use super::{check_rows, map_indices, stack_rows};

/// computes edge_fn on every edge. Row e of the result is the row of edge e.
/// A graph without edges gives a (0,0) array.
pub fn apply_edges<F, E>(
    graph: &Graph<F>,
    edge_fn: &E,
    node_features: &(dyn FeatureSource<F> + Sync),
    edge_features: &(dyn FeatureSource<F> + Sync),
    params: &PassParams,
) -> Result<Array2<F>>
where
    F: FeatureT,
    E: EdgeFn<F> + ?Sized,
{
    check_rows("node features", graph.get_nb_nodes(), node_features.nb_rows())?;
    check_rows("edge features", graph.get_nb_edges(), edge_features.nb_rows())?;
    //
    let cpu_start = ProcessTime::now();
    let sys_start = SystemTime::now();
    let (src, dst) = graph.get_edges();
    let rows = map_indices(graph.get_nb_edges(), params.get_parallel(), |eid| {
        let edge = EdgeRef::new(eid, src[eid], dst[eid], node_features, edge_features);
        log::trace!("apply on edge {}", eid);
        edge_fn
            .call(&edge)
            .map_err(|e| GraphError::from_user(format!("edge function on edge {}", eid), e))
    })?;
    let result = stack_rows(rows, "edge result")?;
    log::debug!(
        "apply_edges nb edges : {}, sys time(ms) {:?} cpu time(ms) {:?}",
        graph.get_nb_edges(),
        sys_start.elapsed().map(|t| t.as_millis()).unwrap_or(0),
        cpu_start.elapsed().as_millis()
    );
    Ok(result)
} // end of apply_edges

/// computes node_fn on every node. [NodeRef::reduced] is None.
pub fn apply_nodes<F, N>(
    graph: &Graph<F>,
    node_fn: &N,
    node_features: &(dyn FeatureSource<F> + Sync),
    params: &PassParams,
) -> Result<Array2<F>>
where
    F: FeatureT,
    N: NodeFn<F> + ?Sized,
{
    check_rows("node features", graph.get_nb_nodes(), node_features.nb_rows())?;
    let rows = map_indices(graph.get_nb_nodes(), params.get_parallel(), |node| {
        let node_ref = NodeRef::new(node, node_features, None);
        node_fn
            .call(&node_ref)
            .map_err(|e| GraphError::from_user(format!("node function on node {}", node), e))
    })?;
    log::debug!("apply_nodes nb nodes : {}", graph.get_nb_nodes());
    stack_rows(rows, "node result")
} // end of apply_nodes

impl<F> Graph<F>
where
    F: FeatureT,
{
    /// apply_edges on the graph's own tables. Returns a copy of the edge table with out_name holding the result.
    pub fn apply_edges<E>(
        &self,
        edge_fn: &E,
        out_name: &str,
        params: &PassParams,
    ) -> Result<FeatureTable<F>>
    where
        E: EdgeFn<F> + ?Sized,
    {
        let result = apply_edges(self, edge_fn, self.get_ndata(), self.get_edata(), params)?;
        let mut table = self.get_edata().clone();
        table.set(out_name, result)?;
        Ok(table)
    }

    /// apply_nodes on the graph's own node table. Returns a copy of it with out_name holding the result.
    pub fn apply_nodes<N>(
        &self,
        node_fn: &N,
        out_name: &str,
        params: &PassParams,
    ) -> Result<FeatureTable<F>>
    where
        N: NodeFn<F> + ?Sized,
    {
        let result = apply_nodes(self, node_fn, self.get_ndata(), params)?;
        let mut table = self.get_ndata().clone();
        table.set(out_name, result)?;
        Ok(table)
    }
} // end of impl Graph

//=====================================================================================

// end of mod tests
