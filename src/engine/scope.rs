//! Local feature scope.
//!
//! A [FeatureScope] borrows a graph immutably and holds two overlay tables, one for nodes and one for edges.
//! Reads look into the overlay first, then into the graph tables. Everything written in the scope goes into
//! the overlay and is discarded when the scope is dropped, whatever the exit path (normal end, `?` or panic).
//! The graph cannot be modified while a scope on it lives.

use ndarray::{Array2, ArrayView2};

use crate::errors::Result;
use crate::graph::{FeatureSource, FeatureT, FeatureTable, Graph};

use super::apply::{apply_edges, apply_nodes};
use super::funcs::{EdgeFn, NodeFn, ReduceFn};
use super::params::PassParams;
use super::update::{update_all, IsolatedFill};

// overlay then base lookup
struct Layered<'a, F> {
    overlay: &'a FeatureTable<F>,
    base: &'a FeatureTable<F>,
}

impl<'a, F> FeatureSource<F> for Layered<'a, F>
where
    F: FeatureT,
{
    fn nb_rows(&self) -> usize {
        self.base.get_nb_rows()
    }

    fn dense(&self, name: &str) -> Result<ArrayView2<'_, F>> {
        if self.overlay.contains(name) {
            self.overlay.dense(name)
        } else {
            self.base.dense(name)
        }
    }
} // end of impl FeatureSource for Layered

/// Temporary features over a borrowed graph.
pub struct FeatureScope<'g, F>
where
    F: FeatureT,
{
    graph: &'g Graph<F>,
    ndata: FeatureTable<F>,
    edata: FeatureTable<F>,
} // end of FeatureScope

impl<'g, F> FeatureScope<'g, F>
where
    F: FeatureT,
{
    pub(crate) fn new(graph: &'g Graph<F>) -> Self {
        log::debug!("entering local scope");
        FeatureScope {
            graph,
            ndata: FeatureTable::new(graph.get_nb_nodes()),
            edata: FeatureTable::new(graph.get_nb_edges()),
        }
    }

    /// the underlying graph
    pub fn get_graph(&self) -> &Graph<F> {
        self.graph
    }

    /// node features written in the scope
    pub fn get_ndata_overlay(&self) -> &FeatureTable<F> {
        &self.ndata
    }

    /// edge features written in the scope
    pub fn get_edata_overlay(&self) -> &FeatureTable<F> {
        &self.edata
    }

    fn nodes(&self) -> Layered<'_, F> {
        Layered {
            overlay: &self.ndata,
            base: self.graph.get_ndata(),
        }
    }

    fn edges(&self) -> Layered<'_, F> {
        Layered {
            overlay: &self.edata,
            base: self.graph.get_edata(),
        }
    }

    /// sets a temporary node feature. It shadows a graph feature of the same name.
    pub fn set_ndata(&mut self, name: &str, arr: Array2<F>) -> Result<()> {
        self.ndata.set(name, arr)
    }

    /// sets a temporary edge feature. It shadows a graph feature of the same name.
    pub fn set_edata(&mut self, name: &str, arr: Array2<F>) -> Result<()> {
        self.edata.set(name, arr)
    }

    /// node feature, overlay first
    pub fn ndata(&self, name: &str) -> Result<ArrayView2<'_, F>> {
        if self.ndata.contains(name) {
            self.ndata.dense(name)
        } else {
            self.graph.get_ndata().dense(name)
        }
    }

    /// edge feature, overlay first
    pub fn edata(&self, name: &str) -> Result<ArrayView2<'_, F>> {
        if self.edata.contains(name) {
            self.edata.dense(name)
        } else {
            self.graph.get_edata().dense(name)
        }
    }

    /// update_all reading scope features. The result goes into node feature out_name of the overlay,
    /// nodes without mailbox get a zero row.
    pub fn update_all<M, R>(
        &mut self,
        message_fn: &M,
        reduce_fn: &R,
        out_name: &str,
        params: &PassParams,
    ) -> Result<()>
    where
        M: EdgeFn<F> + ?Sized,
        R: ReduceFn<F> + ?Sized,
    {
        let dense = {
            let nodes = self.nodes();
            let edges = self.edges();
            let update = update_all(self.graph, message_fn, reduce_fn, &nodes, &edges, params)?;
            update.to_dense(IsolatedFill::Zero)?
        };
        self.ndata.set(out_name, dense)
    } // end of update_all

    /// apply_edges reading scope features, the result goes into edge feature out_name of the overlay.
    pub fn apply_edges<E>(&mut self, edge_fn: &E, out_name: &str, params: &PassParams) -> Result<()>
    where
        E: EdgeFn<F> + ?Sized,
    {
        let result = {
            let nodes = self.nodes();
            let edges = self.edges();
            apply_edges(self.graph, edge_fn, &nodes, &edges, params)?
        };
        self.edata.set(out_name, result)
    } // end of apply_edges

    /// apply_nodes reading scope features, the result goes into node feature out_name of the overlay.
    pub fn apply_nodes<N>(&mut self, node_fn: &N, out_name: &str, params: &PassParams) -> Result<()>
    where
        N: NodeFn<F> + ?Sized,
    {
        let result = {
            let nodes = self.nodes();
            apply_nodes(self.graph, node_fn, &nodes, params)?
        };
        self.ndata.set(out_name, result)
    } // end of apply_nodes
} // end of impl FeatureScope

impl<'g, F> Drop for FeatureScope<'g, F>
where
    F: FeatureT,
{
    fn drop(&mut self) {
        log::debug!(
            "leaving local scope, discarding {} node features and {} edge features",
            self.ndata.len(),
            self.edata.len()
        );
    }
} // end of impl Drop for FeatureScope

impl<F> Graph<F>
where
    F: FeatureT,
{
    /// opens a scope of temporary features on the graph
    pub fn local_scope(&self) -> FeatureScope<'_, F> {
        FeatureScope::new(self)
    }

    /// runs f in a local scope, the scope is discarded on return whatever f returned
    pub fn with_local_scope<T, G>(&self, f: G) -> Result<T>
    where
        G: FnOnce(&mut FeatureScope<'_, F>) -> Result<T>,
    {
        let mut scope = self.local_scope();
        f(&mut scope)
    }
} // end of impl Graph

//=====================================================================================

// end of mod tests
