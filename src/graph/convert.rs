//! Conversion from and to petgraph.
//!
//! petgraph keeps edges in insertion order (EdgeIndex), so edge ids are preserved.
//! An undirected petgraph graph is converted to a bidirected one : edge i gives the edges u->v and v->u
//! (a self loop is kept once).

use petgraph::graph::{Graph as PGraph, IndexType, NodeIndex};
use petgraph::{Directed, EdgeType};

use crate::errors::Result;

use super::store::Graph;
use super::FeatureT;

impl<F> Graph<F>
where
    F: FeatureT,
{
    /// topology of a petgraph graph, node and edge weights are ignored.
    pub fn from_petgraph<N, E, Ty, Ix>(pgraph: &PGraph<N, E, Ty, Ix>) -> Result<Graph<F>>
    where
        Ty: EdgeType,
        Ix: IndexType,
    {
        let nb_edges = pgraph.edge_count();
        let mut src = Vec::<usize>::with_capacity(2 * nb_edges);
        let mut dst = Vec::<usize>::with_capacity(2 * nb_edges);
        for edge in pgraph.raw_edges() {
            let (u, v) = (edge.source().index(), edge.target().index());
            src.push(u);
            dst.push(v);
            if !Ty::is_directed() && u != v {
                src.push(v);
                dst.push(u);
            }
        }
        log::debug!(
            "from_petgraph directed : {}, nb nodes : {}, nb edges : {}",
            Ty::is_directed(),
            pgraph.node_count(),
            src.len()
        );
        Graph::from_src_dst(src, dst, Some(pgraph.node_count()))
    } // end of from_petgraph

    /// a petgraph Graph with node id as node weight and edge id as edge weight
    pub fn to_petgraph(&self) -> PGraph<usize, usize, Directed> {
        let mut pgraph =
            PGraph::<usize, usize, Directed>::with_capacity(self.get_nb_nodes(), self.get_nb_edges());
        for v in 0..self.get_nb_nodes() {
            pgraph.add_node(v);
        }
        let (src, dst) = self.get_edges();
        for eid in 0..self.get_nb_edges() {
            pgraph.add_edge(NodeIndex::new(src[eid]), NodeIndex::new(dst[eid]), eid);
        }
        pgraph
    } // end of to_petgraph
} // end of impl Graph

//=====================================================================================

// end of mod tests
