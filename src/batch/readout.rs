//! Graph level readout.
//!
//! readout_nodes reduces the rows of a node feature over the nodes of each constituent of a batched graph,
//! giving one row per constituent. broadcast_nodes goes the other way, copying a per graph row to every node
//! of the graph. A plain graph is a batch of size 1.

use ndarray::{s, Array2, ArrayView2};

use crate::engine::funcs::Reducer;
use crate::errors::{GraphError, Result};
use crate::graph::{FeatureT, Graph};

use super::segments;

// one reduced row per segment. An empty segment gives a zero row.
fn readout_segments<F>(arr: &Array2<F>, counts: &[usize], reducer: Reducer) -> Array2<F>
where
    F: FeatureT,
{
    let ranges = segments(counts);
    let mut result = Array2::<F>::zeros((ranges.len(), arr.ncols()));
    for (i, (start, end)) in ranges.iter().enumerate() {
        let reduced = reducer.reduce_view(arr.slice(s![*start..*end, ..]));
        result.row_mut(i).assign(&reduced);
    }
    result
} // end of readout_segments

/// reduces node feature name over each constituent. Result has shape (batch_size, width).
pub fn readout_nodes<F>(graph: &Graph<F>, name: &str, reducer: Reducer) -> Result<Array2<F>>
where
    F: FeatureT,
{
    let arr = graph.ndata(name)?;
    log::debug!(
        "readout_nodes {} with {:?} over {} graphs",
        name,
        reducer,
        graph.batch_size()
    );
    Ok(readout_segments(arr, graph.get_batch_num_nodes(), reducer))
} // end of readout_nodes

/// reduces edge feature name over each constituent. Result has shape (batch_size, width).
pub fn readout_edges<F>(graph: &Graph<F>, name: &str, reducer: Reducer) -> Result<Array2<F>>
where
    F: FeatureT,
{
    let arr = graph.edata(name)?;
    log::debug!(
        "readout_edges {} with {:?} over {} graphs",
        name,
        reducer,
        graph.batch_size()
    );
    Ok(readout_segments(arr, graph.get_batch_num_edges(), reducer))
} // end of readout_edges

/// copies row i of graph_feats to every node of constituent i. graph_feats must have batch_size rows.
pub fn broadcast_nodes<F>(graph: &Graph<F>, graph_feats: ArrayView2<'_, F>) -> Result<Array2<F>>
where
    F: FeatureT,
{
    if graph_feats.nrows() != graph.batch_size() {
        log::error!(
            "broadcast_nodes, got {} rows for a batch of {} graphs",
            graph_feats.nrows(),
            graph.batch_size()
        );
        return Err(GraphError::Shape {
            name: String::from("graph features"),
            expected: graph.batch_size(),
            got: graph_feats.nrows(),
        });
    }
    let mut result = Array2::<F>::zeros((graph.get_nb_nodes(), graph_feats.ncols()));
    for (i, (start, end)) in segments(graph.get_batch_num_nodes()).iter().enumerate() {
        for v in *start..*end {
            result.row_mut(v).assign(&graph_feats.row(i));
        }
    }
    Ok(result)
} // end of broadcast_nodes

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::batch::batched::batch;
    use ndarray::array;

    #[allow(dead_code)]
    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_mean_readout_uniform_graphs() {
        log_init_test();
        let mut g1 = Graph::<f64>::build(&[(0, 1)], Some(3)).unwrap();
        g1.set_ndata("h", Array2::from_elem((3, 2), 1.5)).unwrap();
        let mut g2 = Graph::<f64>::build(&[(1, 0)], Some(2)).unwrap();
        g2.set_ndata("h", Array2::from_elem((2, 2), -4.)).unwrap();
        let batched = batch(&[g1, g2]).unwrap();
        let means = readout_nodes(&batched, "h", Reducer::Mean).unwrap();
        assert_eq!(means, array![[1.5, 1.5], [-4., -4.]]);
        let sums = readout_nodes(&batched, "h", Reducer::Sum).unwrap();
        assert_eq!(sums, array![[4.5, 4.5], [-8., -8.]]);
        //
        let back = broadcast_nodes(&batched, means.view()).unwrap();
        assert_eq!(&back, batched.ndata("h").unwrap());
    } // end of test_mean_readout_uniform_graphs

    #[test]
    fn test_edge_readout_and_empty_segment() {
        let mut g1 = Graph::<f32>::build(&[(0, 1), (1, 0)], None).unwrap();
        g1.set_edata("w", array![[1.], [3.]]).unwrap();
        let mut g2 = Graph::<f32>::build(&[], Some(1)).unwrap();
        g2.set_edata("w", Array2::zeros((0, 1))).unwrap();
        let batched = batch(&[g1, g2]).unwrap();
        let maxs = readout_edges(&batched, "w", Reducer::Max).unwrap();
        assert_eq!(maxs, array![[3f32], [0.]]);
        assert!(matches!(
            readout_edges(&batched, "nope", Reducer::Sum),
            Err(GraphError::MissingFeature(_))
        ));
    } // end of test_edge_readout_and_empty_segment

    #[test]
    fn test_broadcast_checks_rows() {
        let graph = Graph::<f64>::build(&[(0, 1)], None).unwrap();
        let feats = array![[1., 2.], [3., 4.]];
        assert!(matches!(
            broadcast_nodes(&graph, feats.view()),
            Err(GraphError::Shape { expected: 1, got: 2, .. })
        ));
        let res = broadcast_nodes(&graph, feats.slice(s![0..1, ..])).unwrap();
        assert_eq!(res, array![[1., 2.], [1., 2.]]);
    } // end of test_broadcast_checks_rows
} // end of mod tests
