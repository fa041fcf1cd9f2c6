//! Graph topology and its feature tables.
//!
//! For an edge e from u to v, we say that e is IN for v and OUT for u.
//! The in incidence is a Csr matrix of shape (nb_nodes, nb_edges): row v lists the edges entering v
//! (as column indices, so in ascending edge id order) and stores their source node as data.
//! The out incidence is built the same way from sources.

use ndarray::Array2;
use petgraph::Direction;
use sprs::{CsMat, CsMatI, TriMatI};

use crate::errors::{GraphError, Result};

use super::degrees::Degree;
use super::features::FeatureTable;
use super::FeatureT;

/// A directed multigraph with features attached to nodes and edges.
///
/// Graphs produced by [batch](crate::batch::batched::batch) keep the number of nodes and edges of
/// each constituent in batch_num_nodes and batch_num_edges. A plain graph has exactly one entry in each.
#[derive(Clone, Debug)]
pub struct Graph<F> {
    nb_nodes: usize,
    /// source of each edge, indexed by edge id
    src: Vec<usize>,
    /// destination of each edge, indexed by edge id
    dst: Vec<usize>,
    /// row v : edges entering v, data is the source node
    in_incidence: CsMatI<usize, usize>,
    /// row u : edges leaving u, data is the destination node
    out_incidence: CsMatI<usize, usize>,
    ///
    ndata: FeatureTable<F>,
    ///
    edata: FeatureTable<F>,
    ///
    batch_num_nodes: Vec<usize>,
    ///
    batch_num_edges: Vec<usize>,
} // end of struct Graph

// rows are nodes, columns are edge ids.
fn incidence(nb_nodes: usize, rows: &[usize], other_end: &[usize]) -> CsMatI<usize, usize> {
    let nb_edges = rows.len();
    let eids: Vec<usize> = (0..nb_edges).collect();
    let trimat = TriMatI::<usize, usize>::from_triplets(
        (nb_nodes, nb_edges),
        rows.to_vec(),
        eids,
        other_end.to_vec(),
    );
    trimat.to_csr()
} // end of incidence

impl<F> Graph<F>
where
    F: FeatureT,
{
    /// build a graph from a list of edges (source, destination).
    /// If nb_nodes is None it is inferred as max(ids)+1, which requires at least one edge.
    pub fn build(edges: &[(usize, usize)], nb_nodes: Option<usize>) -> Result<Self> {
        let src: Vec<usize> = edges.iter().map(|e| e.0).collect();
        let dst: Vec<usize> = edges.iter().map(|e| e.1).collect();
        Graph::from_src_dst(src, dst, nb_nodes)
    } // end of build

    /// build a graph from the vector of sources and the vector of destinations
    pub fn from_src_dst(src: Vec<usize>, dst: Vec<usize>, nb_nodes: Option<usize>) -> Result<Self> {
        if src.len() != dst.len() {
            log::error!(
                "from_src_dst, got {} sources and {} destinations",
                src.len(),
                dst.len()
            );
            return Err(GraphError::Configuration(format!(
                "got {} sources and {} destinations",
                src.len(),
                dst.len()
            )));
        }
        let max_id = src.iter().chain(dst.iter()).max().copied();
        let nb_nodes = match (nb_nodes, max_id) {
            (Some(n), Some(max_id)) => {
                if max_id >= n {
                    log::error!("node id {} out of range, nb_nodes : {}", max_id, n);
                    return Err(GraphError::Configuration(format!(
                        "node id {} out of range for {} nodes",
                        max_id, n
                    )));
                }
                n
            }
            (Some(n), None) => n,
            (None, Some(max_id)) => max_id + 1,
            (None, None) => {
                return Err(GraphError::Configuration(String::from(
                    "cannot infer the number of nodes from an empty edge list",
                )));
            }
        };
        log::debug!(
            "building graph nb_nodes : {}, nb_edges : {}",
            nb_nodes,
            src.len()
        );
        let nb_edges = src.len();
        Ok(Graph::from_parts(
            nb_nodes,
            src,
            dst,
            FeatureTable::new(nb_nodes),
            FeatureTable::new(nb_edges),
            vec![nb_nodes],
            vec![nb_edges],
        ))
    } // end of from_src_dst

    /// assemble a graph from already checked parts. Ids must be in range and tables correctly sized.
    pub(crate) fn from_parts(
        nb_nodes: usize,
        src: Vec<usize>,
        dst: Vec<usize>,
        ndata: FeatureTable<F>,
        edata: FeatureTable<F>,
        batch_num_nodes: Vec<usize>,
        batch_num_edges: Vec<usize>,
    ) -> Self {
        debug_assert_eq!(src.len(), dst.len());
        debug_assert_eq!(ndata.get_nb_rows(), nb_nodes);
        debug_assert_eq!(edata.get_nb_rows(), src.len());
        let in_incidence = incidence(nb_nodes, &dst, &src);
        let out_incidence = incidence(nb_nodes, &src, &dst);
        Graph {
            nb_nodes,
            src,
            dst,
            in_incidence,
            out_incidence,
            ndata,
            edata,
            batch_num_nodes,
            batch_num_edges,
        }
    } // end of from_parts

    /// number of nodes
    pub fn get_nb_nodes(&self) -> usize {
        self.nb_nodes
    }

    /// number of edges
    pub fn get_nb_edges(&self) -> usize {
        self.src.len()
    }

    /// sources and destinations, indexed by edge id
    pub fn get_edges(&self) -> (&[usize], &[usize]) {
        (&self.src, &self.dst)
    }

    /// returns (source, destination) of edge eid
    pub fn get_edge(&self, eid: usize) -> Result<(usize, usize)> {
        self.check_edge(eid)?;
        Ok((self.src[eid], self.dst[eid]))
    }

    /// returns the endpoints of edges given by id
    pub fn find_edges(&self, eids: &[usize]) -> Result<Vec<(usize, usize)>> {
        eids.iter().map(|e| self.get_edge(*e)).collect()
    }

    pub(crate) fn check_node(&self, node: usize) -> Result<()> {
        if node >= self.nb_nodes {
            log::error!("node {} out of range, nb_nodes : {}", node, self.nb_nodes);
            return Err(GraphError::Configuration(format!(
                "node {} out of range for {} nodes",
                node, self.nb_nodes
            )));
        }
        Ok(())
    }

    pub(crate) fn check_edge(&self, eid: usize) -> Result<()> {
        if eid >= self.src.len() {
            log::error!("edge {} out of range, nb_edges : {}", eid, self.src.len());
            return Err(GraphError::Configuration(format!(
                "edge {} out of range for {} edges",
                eid,
                self.src.len()
            )));
        }
        Ok(())
    }

    /// ids of edges entering node, in ascending order. No check on node.
    pub(crate) fn inbound(&self, node: usize) -> &[usize] {
        let range = self.in_incidence.indptr().outer_inds_sz(node);
        &self.in_incidence.indices()[range]
    }

    /// ids of edges leaving node, in ascending order. No check on node.
    pub(crate) fn outbound(&self, node: usize) -> &[usize] {
        let range = self.out_incidence.indptr().outer_inds_sz(node);
        &self.out_incidence.indices()[range]
    }

    /// ids of edges entering node, in ascending order
    pub fn in_edges(&self, node: usize) -> Result<Vec<usize>> {
        self.check_node(node)?;
        Ok(self.inbound(node).to_vec())
    }

    /// ids of edges leaving node, in ascending order
    pub fn out_edges(&self, node: usize) -> Result<Vec<usize>> {
        self.check_node(node)?;
        Ok(self.outbound(node).to_vec())
    }

    /// sources of edges entering node, one per edge, in ascending edge id order
    pub fn predecessors(&self, node: usize) -> Result<Vec<usize>> {
        self.check_node(node)?;
        let range = self.in_incidence.indptr().outer_inds_sz(node);
        Ok(self.in_incidence.data()[range].to_vec())
    }

    /// destinations of edges leaving node, one per edge, in ascending edge id order
    pub fn successors(&self, node: usize) -> Result<Vec<usize>> {
        self.check_node(node)?;
        let range = self.out_incidence.indptr().outer_inds_sz(node);
        Ok(self.out_incidence.data()[range].to_vec())
    }

    /// in degree (Direction::Incoming) or out degree (Direction::Outgoing) of a node. O(1)
    pub fn degree(&self, node: usize, direction: Direction) -> Result<usize> {
        self.check_node(node)?;
        let degree = match direction {
            Direction::Incoming => self.in_incidence.indptr().nnz_in_outer_sz(node),
            Direction::Outgoing => self.out_incidence.indptr().nnz_in_outer_sz(node),
        };
        Ok(degree)
    }

    pub fn in_degree(&self, node: usize) -> Result<usize> {
        self.degree(node, Direction::Incoming)
    }

    pub fn out_degree(&self, node: usize) -> Result<usize> {
        self.degree(node, Direction::Outgoing)
    }

    /// returns a vector of degrees (in, out), self loops included.
    pub fn get_degrees(&self) -> Vec<Degree> {
        (0..self.nb_nodes)
            .map(|v| {
                Degree::new(
                    self.in_incidence.indptr().nnz_in_outer_sz(v),
                    self.out_incidence.indptr().nnz_in_outer_sz(v),
                )
            })
            .collect()
    } // end of get_degrees

    /// adjacency matrix (nb_nodes, nb_nodes). Entry (u,v) counts the edges from u to v.
    pub fn adjacency(&self) -> CsMat<f64> {
        let values = vec![1f64; self.src.len()];
        let trimat = TriMatI::<f64, usize>::from_triplets(
            (self.nb_nodes, self.nb_nodes),
            self.src.clone(),
            self.dst.clone(),
            values,
        );
        // duplicate entries are summed, so multiedges get their multiplicity
        trimat.to_csr()
    } // end of adjacency

    //  features

    /// node feature table
    pub fn get_ndata(&self) -> &FeatureTable<F> {
        &self.ndata
    }

    /// edge feature table
    pub fn get_edata(&self) -> &FeatureTable<F> {
        &self.edata
    }

    /// dense node feature
    pub fn ndata(&self, name: &str) -> Result<&Array2<F>> {
        self.ndata.get(name)
    }

    /// dense edge feature
    pub fn edata(&self, name: &str) -> Result<&Array2<F>> {
        self.edata.get(name)
    }

    /// set a dense node feature, it must have one row per node
    pub fn set_ndata(&mut self, name: &str, arr: Array2<F>) -> Result<()> {
        self.ndata.set(name, arr)
    }

    /// set a dense edge feature, it must have one row per edge
    pub fn set_edata(&mut self, name: &str, arr: Array2<F>) -> Result<()> {
        self.edata.set(name, arr)
    }

    pub fn remove_ndata(&mut self, name: &str) -> Result<()> {
        self.ndata
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| GraphError::MissingFeature(name.to_string()))
    }

    pub fn remove_edata(&mut self, name: &str) -> Result<()> {
        self.edata
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| GraphError::MissingFeature(name.to_string()))
    }

    /// mutable access to the node table, row count stays checked by the table itself
    pub fn get_ndata_mut(&mut self) -> &mut FeatureTable<F> {
        &mut self.ndata
    }

    pub fn get_edata_mut(&mut self) -> &mut FeatureTable<F> {
        &mut self.edata
    }

    //  batch bookkeeping

    /// number of graphs fused in this graph (1 for a plain graph)
    pub fn batch_size(&self) -> usize {
        self.batch_num_nodes.len()
    }

    /// number of nodes of each constituent, in batching order
    pub fn get_batch_num_nodes(&self) -> &[usize] {
        &self.batch_num_nodes
    }

    /// number of edges of each constituent, in batching order
    pub fn get_batch_num_edges(&self) -> &[usize] {
        &self.batch_num_edges
    }

    /// set batch bookkeeping, counts must sum to node and edge counts
    pub(crate) fn set_batch_info(
        &mut self,
        batch_num_nodes: Vec<usize>,
        batch_num_edges: Vec<usize>,
    ) -> Result<()> {
        if batch_num_nodes.len() != batch_num_edges.len()
            || batch_num_nodes.iter().sum::<usize>() != self.nb_nodes
            || batch_num_edges.iter().sum::<usize>() != self.src.len()
        {
            return Err(GraphError::Configuration(String::from(
                "batch counts do not match graph size",
            )));
        }
        self.batch_num_nodes = batch_num_nodes;
        self.batch_num_edges = batch_num_edges;
        Ok(())
    } // end of set_batch_info
} // end of impl Graph

//=====================================================================================

// end of mod tests
