//! Structural transformations. A graph is never modified, a new graph is returned.
//!
//! Batch bookkeeping is maintained: edges added or removed are accounted to the constituent
//! graph owning them, so that unbatching a transformed batch gives the transformed constituents.

use super::store::Graph;
use super::FeatureT;

impl<F> Graph<F>
where
    F: FeatureT,
{
    /// Adds one self loop per node. In each constituent, loops come after the existing edges
    /// of the constituent. Edge features of new edges are zero rows, index columns are dropped.
    /// Useful before message passing so that no node has an empty mailbox.
    pub fn add_self_loop(&self) -> Graph<F> {
        let (src, dst) = self.get_edges();
        let nb_new = self.get_nb_edges() + self.get_nb_nodes();
        let mut new_src = Vec::<usize>::with_capacity(nb_new);
        let mut new_dst = Vec::<usize>::with_capacity(nb_new);
        let mut origin = Vec::<Option<usize>>::with_capacity(nb_new);
        let mut batch_num_edges = Vec::<usize>::with_capacity(self.batch_size());
        //
        let mut node_offset = 0;
        let mut edge_offset = 0;
        for (nb_nodes, nb_edges) in self
            .get_batch_num_nodes()
            .iter()
            .zip(self.get_batch_num_edges())
        {
            for eid in edge_offset..edge_offset + nb_edges {
                new_src.push(src[eid]);
                new_dst.push(dst[eid]);
                origin.push(Some(eid));
            }
            for v in node_offset..node_offset + nb_nodes {
                new_src.push(v);
                new_dst.push(v);
                origin.push(None);
            }
            batch_num_edges.push(nb_edges + nb_nodes);
            node_offset += nb_nodes;
            edge_offset += nb_edges;
        }
        log::debug!("add_self_loop, nb edges : {}", new_src.len());
        let edata = self.get_edata().gather_rows(&origin);
        Graph::from_parts(
            self.get_nb_nodes(),
            new_src,
            new_dst,
            self.get_ndata().clone(),
            edata,
            self.get_batch_num_nodes().to_vec(),
            batch_num_edges,
        )
    } // end of add_self_loop

    /// Removes every self loop, remaining edges keep their relative order and their features.
    pub fn remove_self_loop(&self) -> Graph<F> {
        let (src, dst) = self.get_edges();
        let mut new_src = Vec::<usize>::with_capacity(self.get_nb_edges());
        let mut new_dst = Vec::<usize>::with_capacity(self.get_nb_edges());
        let mut origin = Vec::<Option<usize>>::with_capacity(self.get_nb_edges());
        let mut batch_num_edges = Vec::<usize>::with_capacity(self.batch_size());
        let mut edge_offset = 0;
        for nb_edges in self.get_batch_num_edges() {
            let mut kept = 0;
            for eid in edge_offset..edge_offset + nb_edges {
                if src[eid] != dst[eid] {
                    new_src.push(src[eid]);
                    new_dst.push(dst[eid]);
                    origin.push(Some(eid));
                    kept += 1;
                }
            }
            batch_num_edges.push(kept);
            edge_offset += nb_edges;
        }
        log::debug!(
            "remove_self_loop, removed {} edges",
            self.get_nb_edges() - new_src.len()
        );
        let edata = self.get_edata().gather_rows(&origin);
        Graph::from_parts(
            self.get_nb_nodes(),
            new_src,
            new_dst,
            self.get_ndata().clone(),
            edata,
            self.get_batch_num_nodes().to_vec(),
            batch_num_edges,
        )
    } // end of remove_self_loop

    /// Edge e from u to v becomes edge e from v to u. Features are copied.
    pub fn reverse(&self) -> Graph<F> {
        let (src, dst) = self.get_edges();
        Graph::from_parts(
            self.get_nb_nodes(),
            dst.to_vec(),
            src.to_vec(),
            self.get_ndata().clone(),
            self.get_edata().clone(),
            self.get_batch_num_nodes().to_vec(),
            self.get_batch_num_edges().to_vec(),
        )
    } // end of reverse
} // end of impl Graph

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::batch::batched::{batch, unbatch};
    use ndarray::array;

    #[allow(dead_code)]
    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_self_loops() {
        log_init_test();
        let mut graph = Graph::<f64>::build(&[(0, 1), (1, 1), (1, 2)], None).unwrap();
        graph.set_edata("w", array![[1.], [2.], [3.]]).unwrap();
        let looped = graph.add_self_loop();
        assert_eq!(looped.get_nb_edges(), 6);
        assert_eq!(looped.in_degree(0).unwrap(), 1);
        assert_eq!(
            looped.edata("w").unwrap(),
            &array![[1.], [2.], [3.], [0.], [0.], [0.]]
        );
        //
        let cleaned = looped.remove_self_loop();
        assert_eq!(cleaned.get_edges(), (&[0usize, 1][..], &[1usize, 2][..]));
        assert_eq!(cleaned.edata("w").unwrap(), &array![[1.], [3.]]);
    } // end of test_self_loops

    #[test]
    fn test_self_loops_in_batch() {
        log_init_test();
        let g1 = Graph::<f64>::build(&[(0, 1)], None).unwrap();
        let g2 = Graph::<f64>::build(&[(2, 0)], None).unwrap();
        let batched = batch(&[g1, g2]).unwrap().add_self_loop();
        assert_eq!(batched.get_batch_num_edges(), &[3, 4]);
        let graphs = unbatch(&batched).unwrap();
        assert_eq!(graphs[0].get_edges(), (&[0usize, 0, 1][..], &[1usize, 0, 1][..]));
        assert_eq!(
            graphs[1].get_edges(),
            (&[2usize, 0, 1, 2][..], &[0usize, 0, 1, 2][..])
        );
    } // end of test_self_loops_in_batch

    #[test]
    fn test_reverse() {
        let mut graph = Graph::<f32>::build(&[(0, 1), (0, 2)], None).unwrap();
        graph.set_edata("w", array![[1.], [2.]]).unwrap();
        let reversed = graph.reverse();
        assert_eq!(reversed.in_edges(0).unwrap(), vec![0, 1]);
        assert_eq!(reversed.edata("w").unwrap(), graph.edata("w").unwrap());
    } // end of test_reverse
} // end of mod tests
