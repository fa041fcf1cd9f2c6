//! Subgraph extraction.
//!
//! The subgraph owns copies of the selected feature rows. Provenance is not a reference to the parent
//! (the parent may be dropped while the subgraph lives) but an index column stored in the subgraph tables:
//! row i of the column [NID] in node data is the parent id of node i, row e of [EID] in edge data is the parent id of edge e.

use ndarray::Array1;

use crate::errors::{GraphError, Result};

use super::features::FeatureTable;
use super::store::Graph;
use super::FeatureT;

/// reserved name of the index column giving parent node ids
pub const NID: &str = "_ID";

/// reserved name of the index column giving parent edge ids
pub const EID: &str = "_ID";

// checks ids are in range and distinct
fn check_selection(ids: &[usize], bound: usize, what: &str) -> Result<()> {
    let mut seen = vec![false; bound];
    for id in ids {
        if *id >= bound {
            log::error!("subgraph {} id {} out of range {}", what, id, bound);
            return Err(GraphError::Configuration(format!(
                "{} id {} out of range for {} {}s",
                what, id, bound, what
            )));
        }
        if seen[*id] {
            return Err(GraphError::Configuration(format!(
                "{} id {} selected twice",
                what, id
            )));
        }
        seen[*id] = true;
    }
    Ok(())
} // end of check_selection

impl<F> Graph<F>
where
    F: FeatureT,
{
    /// Subgraph induced by node_ids. New node i is node_ids\[i\].
    /// An edge is kept iff both its endpoints are selected, kept edges come in ascending parent edge id.
    pub fn node_subgraph(&self, node_ids: &[usize]) -> Result<Graph<F>> {
        check_selection(node_ids, self.get_nb_nodes(), "node")?;
        // parent node -> new node
        let mut relabel: Vec<Option<usize>> = vec![None; self.get_nb_nodes()];
        for (new_id, old_id) in node_ids.iter().enumerate() {
            relabel[*old_id] = Some(new_id);
        }
        let (src, dst) = self.get_edges();
        let mut kept_edges = Vec::<usize>::new();
        let mut new_src = Vec::<usize>::new();
        let mut new_dst = Vec::<usize>::new();
        for eid in 0..self.get_nb_edges() {
            if let (Some(u), Some(v)) = (relabel[src[eid]], relabel[dst[eid]]) {
                kept_edges.push(eid);
                new_src.push(u);
                new_dst.push(v);
            }
        }
        log::debug!(
            "node_subgraph nb nodes : {}, nb edges kept : {}",
            node_ids.len(),
            kept_edges.len()
        );
        self.extract(node_ids, &kept_edges, new_src, new_dst)
    } // end of node_subgraph

    /// Subgraph induced by edge_ids. New edge e is edge_ids\[e\].
    /// Nodes are the endpoints of selected edges, in ascending parent node id.
    pub fn edge_subgraph(&self, edge_ids: &[usize]) -> Result<Graph<F>> {
        check_selection(edge_ids, self.get_nb_edges(), "edge")?;
        let (src, dst) = self.get_edges();
        let mut used = vec![false; self.get_nb_nodes()];
        for eid in edge_ids {
            used[src[*eid]] = true;
            used[dst[*eid]] = true;
        }
        let node_ids: Vec<usize> = (0..self.get_nb_nodes()).filter(|v| used[*v]).collect();
        let mut relabel = vec![0usize; self.get_nb_nodes()];
        for (new_id, old_id) in node_ids.iter().enumerate() {
            relabel[*old_id] = new_id;
        }
        let new_src: Vec<usize> = edge_ids.iter().map(|e| relabel[src[*e]]).collect();
        let new_dst: Vec<usize> = edge_ids.iter().map(|e| relabel[dst[*e]]).collect();
        log::debug!(
            "edge_subgraph nb nodes : {}, nb edges : {}",
            node_ids.len(),
            edge_ids.len()
        );
        self.extract(&node_ids, edge_ids, new_src, new_dst)
    } // end of edge_subgraph

    // copies rows and attaches provenance
    fn extract(
        &self,
        node_ids: &[usize],
        edge_ids: &[usize],
        src: Vec<usize>,
        dst: Vec<usize>,
    ) -> Result<Graph<F>> {
        let mut ndata: FeatureTable<F> = self.get_ndata().select_rows(node_ids);
        let mut edata: FeatureTable<F> = self.get_edata().select_rows(edge_ids);
        // an existing column named _ID is replaced
        ndata.set_index(NID, Array1::from_vec(node_ids.to_vec()))?;
        edata.set_index(EID, Array1::from_vec(edge_ids.to_vec()))?;
        Ok(Graph::from_parts(
            node_ids.len(),
            src,
            dst,
            ndata,
            edata,
            vec![node_ids.len()],
            vec![edge_ids.len()],
        ))
    } // end of extract
} // end of impl Graph

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use ndarray::array;

    #[allow(dead_code)]
    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn get_graph() -> Graph<f64> {
        let mut graph = Graph::<f64>::build(&[(0, 1), (1, 2), (2, 0), (3, 2), (1, 2)], None).unwrap();
        graph
            .set_ndata("h", array![[0.], [10.], [20.], [30.]])
            .unwrap();
        graph
            .set_edata("w", array![[0.], [1.], [2.], [3.], [4.]])
            .unwrap();
        graph
    }

    #[test]
    fn test_node_subgraph() {
        log_init_test();
        let graph = get_graph();
        let sub = graph.node_subgraph(&[2, 1]).unwrap();
        assert_eq!(sub.get_nb_nodes(), 2);
        // edges 1 and 4 (1->2 twice) survive, relabelled 0 -> 1
        assert_eq!(sub.get_edges(), (&[1usize, 1][..], &[0usize, 0][..]));
        assert_eq!(sub.ndata("h").unwrap(), &array![[20.], [10.]]);
        assert_eq!(sub.edata("w").unwrap(), &array![[1.], [4.]]);
        assert_eq!(sub.get_ndata().get_index(NID).unwrap(), &array![2, 1]);
        assert_eq!(sub.get_edata().get_index(EID).unwrap(), &array![1, 4]);
        // provenance survives the parent
        drop(graph);
        assert_eq!(sub.get_ndata().get_index(NID).unwrap()[0], 2);
    } // end of test_node_subgraph

    #[test]
    fn test_edge_subgraph() {
        log_init_test();
        let graph = get_graph();
        let sub = graph.edge_subgraph(&[3, 0]).unwrap();
        // nodes 0, 1, 2, 3 are endpoints of 3->2 and 0->1
        assert_eq!(sub.get_nb_nodes(), 4);
        let sub = graph.edge_subgraph(&[3]).unwrap();
        assert_eq!(sub.get_nb_nodes(), 2);
        assert_eq!(sub.get_edges(), (&[1usize][..], &[0usize][..]));
        assert_eq!(sub.ndata("h").unwrap(), &array![[20.], [30.]]);
        assert_eq!(sub.edata("w").unwrap(), &array![[3.]]);
        assert_eq!(sub.get_ndata().get_index(NID).unwrap(), &array![2, 3]);
    } // end of test_edge_subgraph

    #[test]
    fn test_subgraph_of_subgraph_replaces_provenance() {
        log_init_test();
        let mut graph = get_graph();
        // a dense column under the reserved name
        graph.set_ndata(NID, array![[7.], [7.], [7.], [7.]]).unwrap();
        let sub = graph.node_subgraph(&[3, 2]).unwrap();
        assert_eq!(sub.get_ndata().get_index(NID).unwrap(), &array![3, 2]);
        let subsub = sub.edge_subgraph(&[0]).unwrap();
        // ids are relative to the parent
        assert_eq!(subsub.get_ndata().get_index(NID).unwrap(), &array![0, 1]);
        assert_eq!(subsub.get_edata().get_index(EID).unwrap(), &array![0]);
        assert_eq!(subsub.ndata("h").unwrap(), &array![[30.], [20.]]);
    } // end of test_subgraph_of_subgraph_replaces_provenance

    #[test]
    fn test_bad_selection() {
        log_init_test();
        let graph = get_graph();
        assert!(matches!(
            graph.node_subgraph(&[0, 4]),
            Err(GraphError::Configuration(_))
        ));
        assert!(matches!(
            graph.node_subgraph(&[1, 1]),
            Err(GraphError::Configuration(_))
        ));
        assert!(matches!(
            graph.edge_subgraph(&[5]),
            Err(GraphError::Configuration(_))
        ));
        // empty selections are fine
        let sub = graph.node_subgraph(&[]).unwrap();
        assert_eq!(sub.get_nb_nodes(), 0);
        assert_eq!(sub.get_nb_edges(), 0);
    } // end of test_bad_selection
} // end of mod tests
