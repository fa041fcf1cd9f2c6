//! Message passing : update_all and send_and_recv.
//!
//! For each (selected) edge e = (u,v) a message is computed by the message function from the rows of u, v and e.
//! Messages are then grouped by destination. The mailbox of v holds the messages of its inbound edges in ascending
//! edge id order, and the reduce function computes one row from it.
//!
//! Nodes without inbound (selected) edges get no mailbox, the reduce function is not called for them and the result
//! [NodeUpdate] has no row for them. The conversion to a dense column with [NodeUpdate::to_dense] decides
//! what isolated nodes get, see [IsolatedFill].

use cpu_time::ProcessTime;
use std::time::SystemTime;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::errors::{GraphError, Result};
use crate::graph::{FeatureSource, FeatureT, FeatureTable, Graph};

use super::funcs::{EdgeFn, EdgeRef, Mailbox, NodeFn, NodeRef, ReduceFn};
use super::params::PassParams;
use super::{check_rows, map_indices, stack_rows};

/// What a node without mailbox gets when a [NodeUpdate] is made dense.
pub enum IsolatedFill<'a, F> {
    /// a zero row
    Zero,
    /// its row in the given array (typically the previous value of the feature)
    Keep(ArrayView2<'a, F>),
}

/// Result of a message passing call : a row for each node having received at least one message.
#[derive(Clone, Debug)]
pub struct NodeUpdate<F> {
    nb_nodes: usize,
    /// receiving nodes, ascending
    nodes: Vec<usize>,
    /// row i is the result for nodes\[i\]
    rows: Array2<F>,
} // end of NodeUpdate

impl<F> NodeUpdate<F>
where
    F: FeatureT,
{
    /// number of nodes of the graph
    pub fn get_nb_nodes(&self) -> usize {
        self.nb_nodes
    }

    /// nodes having received messages, ascending
    pub fn get_nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// rows, aligned with get_nodes()
    pub fn get_rows(&self) -> &Array2<F> {
        &self.rows
    }

    /// width of rows, 0 if no node received anything
    pub fn get_width(&self) -> usize {
        self.rows.ncols()
    }

    /// number of receiving nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// row of node, None if node received no message
    pub fn get(&self, node: usize) -> Option<ArrayView1<'_, F>> {
        self.nodes
            .binary_search(&node)
            .ok()
            .map(|i| self.rows.row(i))
    }

    /// a (nb_nodes, width) array. Nodes without row are filled according to fill.
    pub fn to_dense(&self, fill: IsolatedFill<'_, F>) -> Result<Array2<F>> {
        let width = self.get_width();
        let mut dense = match fill {
            IsolatedFill::Zero => Array2::<F>::zeros((self.nb_nodes, width)),
            IsolatedFill::Keep(previous) => {
                check_rows("kept feature", self.nb_nodes, previous.nrows())?;
                if !self.is_empty() && previous.ncols() != width {
                    return Err(GraphError::Shape {
                        name: String::from("kept feature width"),
                        expected: width,
                        got: previous.ncols(),
                    });
                }
                previous.to_owned()
            }
        };
        for (i, node) in self.nodes.iter().enumerate() {
            dense.row_mut(*node).assign(&self.rows.row(i));
        }
        Ok(dense)
    } // end of to_dense
} // end of impl NodeUpdate

// the engine: messages on selected edges, mailboxes, reduction and optional apply.
#[allow(clippy::too_many_arguments)]
fn propagate<F, M, R>(
    graph: &Graph<F>,
    selected: &[usize],
    message_fn: &M,
    reduce_fn: &R,
    apply_fn: Option<&(dyn NodeFn<F> + Sync)>,
    node_features: &(dyn FeatureSource<F> + Sync),
    edge_features: &(dyn FeatureSource<F> + Sync),
    params: &PassParams,
) -> Result<NodeUpdate<F>>
where
    F: FeatureT,
    M: EdgeFn<F> + ?Sized,
    R: ReduceFn<F> + ?Sized,
{
    check_rows("node features", graph.get_nb_nodes(), node_features.nb_rows())?;
    check_rows("edge features", graph.get_nb_edges(), edge_features.nb_rows())?;
    //
    let cpu_start = ProcessTime::now();
    let sys_start = SystemTime::now();
    let parallel = params.get_parallel();
    let (src, dst) = graph.get_edges();
    // messages, row i for edge selected[i]
    let messages = map_indices(selected.len(), parallel, |i| {
        let eid = selected[i];
        let edge = EdgeRef::new(eid, src[eid], dst[eid], node_features, edge_features);
        log::trace!("message on edge {}", eid);
        message_fn
            .call(&edge)
            .map_err(|e| GraphError::from_user(format!("message function on edge {}", eid), e))
    })?;
    let messages = stack_rows(messages, "message")?;
    // position of each edge message in messages
    let mut slot: Vec<Option<usize>> = vec![None; graph.get_nb_edges()];
    for (i, eid) in selected.iter().enumerate() {
        slot[*eid] = Some(i);
    }
    // mailboxes. inbound edges are ascending so mailboxes are too.
    let mut receivers = Vec::<usize>::new();
    let mut mailbox_eids = Vec::<Vec<usize>>::new();
    for v in 0..graph.get_nb_nodes() {
        let eids: Vec<usize> = graph
            .inbound(v)
            .iter()
            .filter(|e| slot[**e].is_some())
            .copied()
            .collect();
        if !eids.is_empty() {
            receivers.push(v);
            mailbox_eids.push(eids);
        }
    }
    log::debug!(
        "propagate nb messages : {}, nb receiving nodes : {}",
        selected.len(),
        receivers.len()
    );
    let rows = map_indices(receivers.len(), parallel, |i| {
        let node = receivers[i];
        let eids = &mailbox_eids[i];
        let positions: Vec<usize> = eids.iter().filter_map(|e| slot[*e]).collect();
        let block = messages.select(Axis(0), &positions);
        let mailbox = Mailbox::new(node, eids, block.view());
        let reduced = reduce_fn
            .call(&mailbox)
            .map_err(|e| GraphError::from_user(format!("reduce function on node {}", node), e))?;
        match apply_fn {
            None => Ok(reduced),
            Some(apply_fn) => {
                let node_ref = NodeRef::new(node, node_features, Some(reduced.view()));
                apply_fn
                    .call(&node_ref)
                    .map_err(|e| GraphError::from_user(format!("apply function on node {}", node), e))
            }
        }
    })?;
    let rows = stack_rows(rows, "reduced")?;
    //
    log::debug!(
        "propagate done, sys time(ms) {:?} cpu time(ms) {:?}",
        sys_start.elapsed().map(|t| t.as_millis()).unwrap_or(0),
        cpu_start.elapsed().as_millis()
    );
    Ok(NodeUpdate {
        nb_nodes: graph.get_nb_nodes(),
        nodes: receivers,
        rows,
    })
} // end of propagate

/// Message passing along all edges.
/// node_features must have one row per node, edge_features one row per edge. Nothing is written into them.
pub fn update_all<F, M, R>(
    graph: &Graph<F>,
    message_fn: &M,
    reduce_fn: &R,
    node_features: &(dyn FeatureSource<F> + Sync),
    edge_features: &(dyn FeatureSource<F> + Sync),
    params: &PassParams,
) -> Result<NodeUpdate<F>>
where
    F: FeatureT,
    M: EdgeFn<F> + ?Sized,
    R: ReduceFn<F> + ?Sized,
{
    log::debug!("update_all nb edges : {}", graph.get_nb_edges());
    let selected: Vec<usize> = (0..graph.get_nb_edges()).collect();
    propagate(
        graph,
        &selected,
        message_fn,
        reduce_fn,
        None,
        node_features,
        edge_features,
        params,
    )
} // end of update_all

/// As update_all, then apply_fn is called on each receiving node with its reduced row
/// (see [NodeRef::reduced]) and its result replaces the reduced row.
#[allow(clippy::too_many_arguments)]
pub fn update_all_apply<F, M, R, U>(
    graph: &Graph<F>,
    message_fn: &M,
    reduce_fn: &R,
    apply_fn: &U,
    node_features: &(dyn FeatureSource<F> + Sync),
    edge_features: &(dyn FeatureSource<F> + Sync),
    params: &PassParams,
) -> Result<NodeUpdate<F>>
where
    F: FeatureT,
    M: EdgeFn<F> + ?Sized,
    R: ReduceFn<F> + ?Sized,
    U: NodeFn<F>,
{
    let selected: Vec<usize> = (0..graph.get_nb_edges()).collect();
    propagate(
        graph,
        &selected,
        message_fn,
        reduce_fn,
        Some(apply_fn as &(dyn NodeFn<F> + Sync)),
        node_features,
        edge_features,
        params,
    )
} // end of update_all_apply

/// Message passing restricted to the edges in edge_ids.
/// Ids must be in range and distinct. A node receives iff one of its inbound edges is selected.
pub fn send_and_recv<F, M, R>(
    graph: &Graph<F>,
    edge_ids: &[usize],
    message_fn: &M,
    reduce_fn: &R,
    node_features: &(dyn FeatureSource<F> + Sync),
    edge_features: &(dyn FeatureSource<F> + Sync),
    params: &PassParams,
) -> Result<NodeUpdate<F>>
where
    F: FeatureT,
    M: EdgeFn<F> + ?Sized,
    R: ReduceFn<F> + ?Sized,
{
    let mut seen = vec![false; graph.get_nb_edges()];
    for eid in edge_ids {
        graph.check_edge(*eid)?;
        if seen[*eid] {
            return Err(GraphError::Configuration(format!(
                "edge {} selected twice",
                eid
            )));
        }
        seen[*eid] = true;
    }
    log::debug!("send_and_recv nb edges selected : {}", edge_ids.len());
    propagate(
        graph,
        edge_ids,
        message_fn,
        reduce_fn,
        None,
        node_features,
        edge_features,
        params,
    )
} // end of send_and_recv

//=====================================================================================

impl<F> Graph<F>
where
    F: FeatureT,
{
    /// update_all on the graph's own tables. Returns a copy of the node table where out_name holds the result,
    /// nodes without mailbox getting a zero row. The graph is not modified.
    pub fn update_all<M, R>(
        &self,
        message_fn: &M,
        reduce_fn: &R,
        out_name: &str,
        params: &PassParams,
    ) -> Result<FeatureTable<F>>
    where
        M: EdgeFn<F> + ?Sized,
        R: ReduceFn<F> + ?Sized,
    {
        let update = update_all(
            self,
            message_fn,
            reduce_fn,
            self.get_ndata(),
            self.get_edata(),
            params,
        )?;
        let mut table = self.get_ndata().clone();
        table.set(out_name, update.to_dense(IsolatedFill::Zero)?)?;
        Ok(table)
    } // end of update_all
} // end of impl Graph

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::engine::funcs::*;
    use anyhow::anyhow;
    use ndarray::{array, Array1};

    #[allow(dead_code)]
    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // 0 -> 2, 1 -> 2, 2 -> 3, node 0 and 1 have no inbound edge
    fn get_graph() -> Graph<f64> {
        let mut graph = Graph::<f64>::build(&[(0, 2), (1, 2), (2, 3)], None).unwrap();
        graph
            .set_ndata("h", array![[1., 2.], [3., 6.], [10., 10.], [0., 0.]])
            .unwrap();
        graph.set_edata("w", array![[1.], [2.], [3.]]).unwrap();
        graph
    }

    #[test]
    fn test_copy_src_mean() {
        log_init_test();
        let graph = get_graph();
        let update = update_all(
            &graph,
            &CopySrc::new("h"),
            &Reducer::Mean,
            graph.get_ndata(),
            graph.get_edata(),
            &PassParams::default(),
        )
        .unwrap();
        assert_eq!(update.get_nodes(), &[2, 3]);
        assert_eq!(update.get(2).unwrap(), array![2., 4.]);
        assert_eq!(update.get(3).unwrap(), array![10., 10.]);
        assert!(update.get(0).is_none());
        assert!(update.get(1).is_none());
        //
        let dense = update.to_dense(IsolatedFill::Zero).unwrap();
        assert_eq!(dense.row(0), array![0., 0.]);
        assert_eq!(dense.row(2), array![2., 4.]);
        let kept = update
            .to_dense(IsolatedFill::Keep(graph.ndata("h").unwrap().view()))
            .unwrap();
        assert_eq!(kept.row(1), array![3., 6.]);
        assert_eq!(kept.row(3), array![10., 10.]);
    } // end of test_copy_src_mean

    #[test]
    fn test_weighted_sum_and_max() {
        log_init_test();
        let graph = get_graph();
        let params = PassParams::default();
        let update = update_all(
            &graph,
            &SrcMulEdge::new("h", "w"),
            &Reducer::Sum,
            graph.get_ndata(),
            graph.get_edata(),
            &params,
        )
        .unwrap();
        // 1 * [1,2] + 2 * [3,6]
        assert_eq!(update.get(2).unwrap(), array![7., 14.]);
        assert_eq!(update.get(3).unwrap(), array![30., 30.]);
        //
        let update = update_all(
            &graph,
            &CopyEdge::new("w"),
            &Reducer::Max,
            graph.get_ndata(),
            graph.get_edata(),
            &params,
        )
        .unwrap();
        assert_eq!(update.get(2).unwrap(), array![2.]);
    } // end of test_weighted_sum_and_max

    #[test]
    fn test_mailbox_order() {
        log_init_test();
        // parallel edges and inbound edges given out of source order
        let mut graph = Graph::<f64>::build(&[(3, 0), (1, 0), (3, 0), (2, 0)], None).unwrap();
        graph
            .set_ndata("h", array![[0.], [1.], [2.], [3.]])
            .unwrap();
        let sources = reduce_fn(|m: &Mailbox<'_, f64>| {
            assert_eq!(m.edge_ids(), &[0, 1, 2, 3]);
            Ok(m.messages().column(0).to_owned())
        });
        for parallel in [false, true] {
            let update = update_all(
                &graph,
                &CopySrc::new("h"),
                &sources,
                graph.get_ndata(),
                graph.get_edata(),
                &PassParams::new(parallel),
            )
            .unwrap();
            assert_eq!(update.get(0).unwrap(), array![3., 1., 3., 2.]);
        }
    } // end of test_mailbox_order

    #[test]
    fn test_layers_chain() {
        log_init_test();
        // a path 0 -> 1 -> 2, two layers bring the value of node 0 to node 2
        let mut graph = Graph::<f32>::build(&[(0, 1), (1, 2)], None).unwrap();
        graph.set_ndata("h", array![[5.], [0.], [0.]]).unwrap();
        let params = PassParams::default();
        let table = graph
            .update_all(&CopySrc::new("h"), &Reducer::Sum, "h1", &params)
            .unwrap();
        let update = update_all(
            &graph,
            &CopySrc::new("h1"),
            &Reducer::Sum,
            &table,
            graph.get_edata(),
            &params,
        )
        .unwrap();
        assert_eq!(update.get(2).unwrap(), array![5f32]);
        // the graph tables are untouched
        assert!(!graph.get_ndata().contains("h1"));
    } // end of test_layers_chain

    #[test]
    fn test_apply_function() {
        log_init_test();
        let graph = get_graph();
        let apply = node_fn(|n: &NodeRef<'_, f64>| {
            let reduced = n.reduced().ok_or_else(|| anyhow!("no reduced row"))?;
            Ok(&reduced + &n.data("h")?)
        });
        let update = update_all_apply(
            &graph,
            &CopySrc::new("h"),
            &Reducer::Sum,
            &apply,
            graph.get_ndata(),
            graph.get_edata(),
            &PassParams::default(),
        )
        .unwrap();
        assert_eq!(update.get(2).unwrap(), array![14., 18.]);
        assert_eq!(update.get(3).unwrap(), array![10., 10.]);
    } // end of test_apply_function

    #[test]
    fn test_send_and_recv() {
        log_init_test();
        let graph = get_graph();
        let params = PassParams::default();
        let update = send_and_recv(
            &graph,
            &[1],
            &CopySrc::new("h"),
            &Reducer::Sum,
            graph.get_ndata(),
            graph.get_edata(),
            &params,
        )
        .unwrap();
        assert_eq!(update.get_nodes(), &[2]);
        assert_eq!(update.get(2).unwrap(), array![3., 6.]);
        //
        let res = send_and_recv(
            &graph,
            &[1, 1],
            &CopySrc::new("h"),
            &Reducer::Sum,
            graph.get_ndata(),
            graph.get_edata(),
            &params,
        );
        assert!(matches!(res, Err(GraphError::Configuration(_))));
        let res = send_and_recv(
            &graph,
            &[3],
            &CopySrc::new("h"),
            &Reducer::Sum,
            graph.get_ndata(),
            graph.get_edata(),
            &params,
        );
        assert!(matches!(res, Err(GraphError::Configuration(_))));
    } // end of test_send_and_recv

    #[test]
    fn test_no_edges() {
        log_init_test();
        let mut graph = Graph::<f64>::build(&[], Some(3)).unwrap();
        graph.set_ndata("h", array![[1.], [2.], [3.]]).unwrap();
        let update = update_all(
            &graph,
            &CopySrc::new("h"),
            &Reducer::Mean,
            graph.get_ndata(),
            graph.get_edata(),
            &PassParams::default(),
        )
        .unwrap();
        assert!(update.is_empty());
        assert_eq!(update.to_dense(IsolatedFill::Zero).unwrap().dim(), (3, 0));
    } // end of test_no_edges

    #[test]
    fn test_failures_are_all_or_nothing() {
        log_init_test();
        let graph = get_graph();
        let failing = edge_fn(|e: &EdgeRef<'_, f64>| -> anyhow::Result<Array1<f64>> {
            if e.eid() == 2 {
                return Err(anyhow!("cannot send on edge 2"));
            }
            Ok(e.src("h")?.to_owned())
        });
        for parallel in [false, true] {
            let res = update_all(
                &graph,
                &failing,
                &Reducer::Sum,
                graph.get_ndata(),
                graph.get_edata(),
                &PassParams::new(parallel),
            );
            match res {
                Err(GraphError::Computation { context, source }) => {
                    assert_eq!(context, "message function on edge 2");
                    assert_eq!(source.to_string(), "cannot send on edge 2");
                }
                _ => panic!("expected a computation error"),
            }
        }
        // a failing reduce
        let failing = reduce_fn(|m: &Mailbox<'_, f64>| -> anyhow::Result<Array1<f64>> {
            if m.node() == 3 {
                return Err(anyhow!("reduce failed"));
            }
            Ok(m.messages().row(0).to_owned())
        });
        let res = update_all(
            &graph,
            &CopySrc::new("h"),
            &failing,
            graph.get_ndata(),
            graph.get_edata(),
            &PassParams::default(),
        );
        assert!(matches!(res, Err(GraphError::Computation { .. })));
        // a missing feature keeps its kind
        let res = update_all(
            &graph,
            &CopySrc::new("nope"),
            &Reducer::Sum,
            graph.get_ndata(),
            graph.get_edata(),
            &PassParams::default(),
        );
        assert!(matches!(res, Err(GraphError::MissingFeature(_))));
        // a closure returning a configuration error still fails as a computation
        let misconfigured = edge_fn(|e: &EdgeRef<'_, f64>| -> anyhow::Result<Array1<f64>> {
            if e.eid() == 1 {
                return Err(GraphError::Configuration(String::from("no weight on edge 1")).into());
            }
            Ok(e.src("h")?.to_owned())
        });
        let res = update_all(
            &graph,
            &misconfigured,
            &Reducer::Sum,
            graph.get_ndata(),
            graph.get_edata(),
            &PassParams::default(),
        );
        match res {
            Err(GraphError::Computation { context, source }) => {
                assert_eq!(context, "message function on edge 1");
                assert!(matches!(
                    source.downcast_ref::<GraphError>(),
                    Some(GraphError::Configuration(_))
                ));
            }
            _ => panic!("expected a computation error"),
        }
        // messages of different widths
        let ragged = edge_fn(|e: &EdgeRef<'_, f64>| -> anyhow::Result<Array1<f64>> {
            Ok(Array1::zeros(e.eid() + 1))
        });
        let res = update_all(
            &graph,
            &ragged,
            &Reducer::Sum,
            graph.get_ndata(),
            graph.get_edata(),
            &PassParams::default(),
        );
        assert!(matches!(res, Err(GraphError::Shape { .. })));
    } // end of test_failures_are_all_or_nothing

    #[test]
    fn test_feature_row_count_checked() {
        let graph = get_graph();
        let short = FeatureTable::<f64>::new(2);
        let res = update_all(
            &graph,
            &CopySrc::new("h"),
            &Reducer::Sum,
            &short,
            graph.get_edata(),
            &PassParams::default(),
        );
        assert!(matches!(res, Err(GraphError::Shape { expected: 4, got: 2, .. })));
    } // end of test_feature_row_count_checked
} // end of mod tests
