//! Interfaces of user supplied functions, and the builtins.
//!
//! - an [EdgeFn] computes a row from the source row, the destination row and the row of an edge.
//!   It is used as message function by update_all and as edge function by apply_edges.
//! - a [ReduceFn] computes one row from the mailbox of a node.
//! - a [NodeFn] computes one row from the rows of a node (and its reduced row in update_all_apply).
//!
//! Rows are accessed by feature name through [EdgeRef] and [NodeRef], so a function can combine
//! as many features as it needs. Closures are turned into these interfaces with [edge_fn], [reduce_fn] and [node_fn].

use anyhow::anyhow;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use num_traits::Float;

use crate::errors::{GraphError, Result};
use crate::graph::{FeatureSource, FeatureT};

/// What an edge function sees of an edge e = (src, dst).
pub struct EdgeRef<'a, F> {
    eid: usize,
    src_id: usize,
    dst_id: usize,
    nodes: &'a (dyn FeatureSource<F> + Sync),
    edges: &'a (dyn FeatureSource<F> + Sync),
} // end of EdgeRef

impl<'a, F> EdgeRef<'a, F>
where
    F: FeatureT,
{
    pub(crate) fn new(
        eid: usize,
        src_id: usize,
        dst_id: usize,
        nodes: &'a (dyn FeatureSource<F> + Sync),
        edges: &'a (dyn FeatureSource<F> + Sync),
    ) -> Self {
        EdgeRef {
            eid,
            src_id,
            dst_id,
            nodes,
            edges,
        }
    }

    /// edge id
    pub fn eid(&self) -> usize {
        self.eid
    }

    /// source node id
    pub fn src_id(&self) -> usize {
        self.src_id
    }

    /// destination node id
    pub fn dst_id(&self) -> usize {
        self.dst_id
    }

    /// row of the source node in node feature name
    pub fn src(&self, name: &str) -> Result<ArrayView1<'a, F>> {
        let column = self.nodes.dense(name)?;
        Ok(column.index_axis_move(Axis(0), self.src_id))
    }

    /// row of the destination node in node feature name
    pub fn dst(&self, name: &str) -> Result<ArrayView1<'a, F>> {
        let column = self.nodes.dense(name)?;
        Ok(column.index_axis_move(Axis(0), self.dst_id))
    }

    /// row of the edge in edge feature name
    pub fn edge(&self, name: &str) -> Result<ArrayView1<'a, F>> {
        let column = self.edges.dense(name)?;
        Ok(column.index_axis_move(Axis(0), self.eid))
    }
} // end of impl EdgeRef

/// The messages received by a node, one row per inbound edge in ascending edge id order.
/// Never empty: nodes without inbound edges get no mailbox.
pub struct Mailbox<'a, F> {
    node: usize,
    eids: &'a [usize],
    messages: ArrayView2<'a, F>,
} // end of Mailbox

impl<'a, F> Mailbox<'a, F> {
    pub(crate) fn new(node: usize, eids: &'a [usize], messages: ArrayView2<'a, F>) -> Self {
        Mailbox {
            node,
            eids,
            messages,
        }
    }

    /// the receiving node
    pub fn node(&self) -> usize {
        self.node
    }

    /// the edge ids having sent the messages, ascending
    pub fn edge_ids(&self) -> &[usize] {
        self.eids
    }

    /// messages, row i was sent along edge edge_ids()\[i\]
    pub fn messages(&self) -> ArrayView2<'a, F> {
        self.messages.clone()
    }

    /// number of messages
    pub fn len(&self) -> usize {
        self.eids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eids.is_empty()
    }
} // end of impl Mailbox

/// What a node function sees of a node.
pub struct NodeRef<'a, F> {
    id: usize,
    nodes: &'a (dyn FeatureSource<F> + Sync),
    reduced: Option<ArrayView1<'a, F>>,
} // end of NodeRef

impl<'a, F> NodeRef<'a, F>
where
    F: FeatureT,
{
    pub(crate) fn new(
        id: usize,
        nodes: &'a (dyn FeatureSource<F> + Sync),
        reduced: Option<ArrayView1<'a, F>>,
    ) -> Self {
        NodeRef { id, nodes, reduced }
    }

    /// node id
    pub fn id(&self) -> usize {
        self.id
    }

    /// row of the node in node feature name
    pub fn data(&self, name: &str) -> Result<ArrayView1<'a, F>> {
        let column = self.nodes.dense(name)?;
        Ok(column.index_axis_move(Axis(0), self.id))
    }

    /// reduced mailbox of the node when called from update_all_apply, None in apply_nodes
    pub fn reduced(&self) -> Option<ArrayView1<'a, F>> {
        self.reduced.clone()
    }
} // end of impl NodeRef

//=====================================================================================

/// A function computing a row from an edge. Message function in update_all, edge function in apply_edges.
pub trait EdgeFn<F>: Sync {
    fn call(&self, edge: &EdgeRef<'_, F>) -> anyhow::Result<Array1<F>>;
}

/// A function reducing a mailbox to one row.
pub trait ReduceFn<F>: Sync {
    fn call(&self, mailbox: &Mailbox<'_, F>) -> anyhow::Result<Array1<F>>;
}

/// A function computing a row for a node.
pub trait NodeFn<F>: Sync {
    fn call(&self, node: &NodeRef<'_, F>) -> anyhow::Result<Array1<F>>;
}

/// wraps a closure into an [EdgeFn]
pub struct EdgeClosure<C>(C);

impl<F, C> EdgeFn<F> for EdgeClosure<C>
where
    C: Fn(&EdgeRef<'_, F>) -> anyhow::Result<Array1<F>> + Sync,
{
    fn call(&self, edge: &EdgeRef<'_, F>) -> anyhow::Result<Array1<F>> {
        (self.0)(edge)
    }
}

/// makes an [EdgeFn] from a closure
pub fn edge_fn<F, C>(f: C) -> EdgeClosure<C>
where
    C: Fn(&EdgeRef<'_, F>) -> anyhow::Result<Array1<F>> + Sync,
{
    EdgeClosure(f)
}

/// wraps a closure into a [ReduceFn]
pub struct ReduceClosure<C>(C);

impl<F, C> ReduceFn<F> for ReduceClosure<C>
where
    C: Fn(&Mailbox<'_, F>) -> anyhow::Result<Array1<F>> + Sync,
{
    fn call(&self, mailbox: &Mailbox<'_, F>) -> anyhow::Result<Array1<F>> {
        (self.0)(mailbox)
    }
}

/// makes a [ReduceFn] from a closure
pub fn reduce_fn<F, C>(f: C) -> ReduceClosure<C>
where
    C: Fn(&Mailbox<'_, F>) -> anyhow::Result<Array1<F>> + Sync,
{
    ReduceClosure(f)
}

/// wraps a closure into a [NodeFn]
pub struct NodeClosure<C>(C);

impl<F, C> NodeFn<F> for NodeClosure<C>
where
    C: Fn(&NodeRef<'_, F>) -> anyhow::Result<Array1<F>> + Sync,
{
    fn call(&self, node: &NodeRef<'_, F>) -> anyhow::Result<Array1<F>> {
        (self.0)(node)
    }
}

/// makes a [NodeFn] from a closure
pub fn node_fn<F, C>(f: C) -> NodeClosure<C>
where
    C: Fn(&NodeRef<'_, F>) -> anyhow::Result<Array1<F>> + Sync,
{
    NodeClosure(f)
}

//=====================================================================================

// elementwise product, a row of width 1 is broadcast as a scalar (edge weights)
fn mul_rows<F>(a: ArrayView1<F>, b: ArrayView1<F>, what: &str) -> Result<Array1<F>>
where
    F: FeatureT,
{
    if a.len() == b.len() {
        Ok(&a * &b)
    } else if b.len() == 1 {
        Ok(&a * b[0])
    } else if a.len() == 1 {
        Ok(&b * a[0])
    } else {
        Err(GraphError::Shape {
            name: what.to_string(),
            expected: a.len(),
            got: b.len(),
        })
    }
} // end of mul_rows

/// message = source row
#[derive(Clone, Debug)]
pub struct CopySrc {
    field: String,
}

impl CopySrc {
    pub fn new(field: &str) -> Self {
        CopySrc {
            field: field.to_string(),
        }
    }
}

impl<F: FeatureT> EdgeFn<F> for CopySrc {
    fn call(&self, edge: &EdgeRef<'_, F>) -> anyhow::Result<Array1<F>> {
        Ok(edge.src(&self.field)?.to_owned())
    }
}

/// message = edge row
#[derive(Clone, Debug)]
pub struct CopyEdge {
    field: String,
}

impl CopyEdge {
    pub fn new(field: &str) -> Self {
        CopyEdge {
            field: field.to_string(),
        }
    }
}

impl<F: FeatureT> EdgeFn<F> for CopyEdge {
    fn call(&self, edge: &EdgeRef<'_, F>) -> anyhow::Result<Array1<F>> {
        Ok(edge.edge(&self.field)?.to_owned())
    }
}

/// message = source row * edge row elementwise. An edge row of width 1 scales the source row.
#[derive(Clone, Debug)]
pub struct SrcMulEdge {
    src_field: String,
    edge_field: String,
}

impl SrcMulEdge {
    pub fn new(src_field: &str, edge_field: &str) -> Self {
        SrcMulEdge {
            src_field: src_field.to_string(),
            edge_field: edge_field.to_string(),
        }
    }
}

impl<F: FeatureT> EdgeFn<F> for SrcMulEdge {
    fn call(&self, edge: &EdgeRef<'_, F>) -> anyhow::Result<Array1<F>> {
        let s = edge.src(&self.src_field)?;
        let e = edge.edge(&self.edge_field)?;
        Ok(mul_rows(s, e, &self.edge_field)?)
    }
}

/// edge score = sum of elementwise products of source and destination rows, a row of width 1
#[derive(Clone, Debug)]
pub struct SrcDotDst {
    src_field: String,
    dst_field: String,
}

impl SrcDotDst {
    pub fn new(src_field: &str, dst_field: &str) -> Self {
        SrcDotDst {
            src_field: src_field.to_string(),
            dst_field: dst_field.to_string(),
        }
    }
}

impl<F: FeatureT> EdgeFn<F> for SrcDotDst {
    fn call(&self, edge: &EdgeRef<'_, F>) -> anyhow::Result<Array1<F>> {
        let s = edge.src(&self.src_field)?;
        let d = edge.dst(&self.dst_field)?;
        if s.len() != d.len() {
            return Err(GraphError::Shape {
                name: self.dst_field.clone(),
                expected: s.len(),
                got: d.len(),
            }
            .into());
        }
        Ok(Array1::from_elem(1, s.dot(&d)))
    }
}

/// edge row = source row * destination row elementwise
#[derive(Clone, Debug)]
pub struct SrcMulDst {
    src_field: String,
    dst_field: String,
}

impl SrcMulDst {
    pub fn new(src_field: &str, dst_field: &str) -> Self {
        SrcMulDst {
            src_field: src_field.to_string(),
            dst_field: dst_field.to_string(),
        }
    }
}

impl<F: FeatureT> EdgeFn<F> for SrcMulDst {
    fn call(&self, edge: &EdgeRef<'_, F>) -> anyhow::Result<Array1<F>> {
        let s = edge.src(&self.src_field)?;
        let d = edge.dst(&self.dst_field)?;
        Ok(mul_rows(s, d, &self.dst_field)?)
    }
}

/// edge row = source row ++ destination row (++ edge row if an edge field is given)
#[derive(Clone, Debug)]
pub struct Concat {
    src_field: String,
    dst_field: String,
    edge_field: Option<String>,
}

impl Concat {
    pub fn new(src_field: &str, dst_field: &str, edge_field: Option<&str>) -> Self {
        Concat {
            src_field: src_field.to_string(),
            dst_field: dst_field.to_string(),
            edge_field: edge_field.map(|s| s.to_string()),
        }
    }
}

impl<F: FeatureT> EdgeFn<F> for Concat {
    fn call(&self, edge: &EdgeRef<'_, F>) -> anyhow::Result<Array1<F>> {
        let mut parts = vec![edge.src(&self.src_field)?, edge.dst(&self.dst_field)?];
        if let Some(field) = &self.edge_field {
            parts.push(edge.edge(field)?);
        }
        ndarray::concatenate(Axis(0), &parts).map_err(|e| anyhow!("concatenation failed : {}", e))
    }
}

//=====================================================================================

#[cfg_attr(doc, katexit::katexit)]
/// Builtin reductions over the first axis of a block of rows $m_{i}, i=1..n$ :
/// - Sum : $\sum_{i} m_{i}$
/// - Mean : $\frac{1}{n} \sum_{i} m_{i}$
/// - Max, Min : elementwise maximum and minimum.
///
/// They are associative and commutative, so they do not depend on the order of messages.
/// An empty block (only possible in readout of an empty graph) gives a zero row.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
    Max,
    Min,
}

impl Reducer {
    /// reduce rows to one row
    pub fn reduce_view<F: FeatureT>(&self, rows: ArrayView2<F>) -> Array1<F> {
        let (nb_rows, width) = rows.dim();
        if nb_rows == 0 {
            return Array1::<F>::zeros(width);
        }
        match self {
            Reducer::Sum => rows.sum_axis(Axis(0)),
            Reducer::Mean => {
                let sum = rows.sum_axis(Axis(0));
                match F::from_usize(nb_rows) {
                    Some(n) => sum / n,
                    None => sum,
                }
            }
            Reducer::Max => rows.fold_axis(Axis(0), F::neg_infinity(), |acc, x| {
                Float::max(*acc, *x)
            }),
            Reducer::Min => {
                rows.fold_axis(Axis(0), F::infinity(), |acc, x| Float::min(*acc, *x))
            }
        }
    } // end of reduce_view
} // end of impl Reducer

impl<F: FeatureT> ReduceFn<F> for Reducer {
    fn call(&self, mailbox: &Mailbox<'_, F>) -> anyhow::Result<Array1<F>> {
        Ok(self.reduce_view(mailbox.messages()))
    }
}

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::graph::FeatureTable;
    use ndarray::array;

    fn get_tables() -> (FeatureTable<f64>, FeatureTable<f64>) {
        let mut nodes = FeatureTable::<f64>::new(2);
        nodes
            .set("h", array![[1., 1., 1., 1.], [2., 2., 2., 2.]])
            .unwrap();
        nodes.set("x", array![[1.], [3.]]).unwrap();
        let mut edges = FeatureTable::<f64>::new(1);
        edges.set("w", array![[0.5]]).unwrap();
        (nodes, edges)
    }

    #[test]
    fn test_builtin_edge_functions() {
        let (nodes, edges) = get_tables();
        let edge = EdgeRef::new(0, 0, 1, &nodes, &edges);
        //
        let dot = EdgeFn::<f64>::call(&SrcDotDst::new("h", "h"), &edge).unwrap();
        assert_eq!(dot, array![8.]);
        let prod = EdgeFn::<f64>::call(&SrcMulDst::new("h", "h"), &edge).unwrap();
        assert_eq!(prod, array![2., 2., 2., 2.]);
        let scaled = EdgeFn::<f64>::call(&SrcMulEdge::new("h", "w"), &edge).unwrap();
        assert_eq!(scaled, array![0.5, 0.5, 0.5, 0.5]);
        let cat = EdgeFn::<f64>::call(&Concat::new("x", "x", Some("w")), &edge).unwrap();
        assert_eq!(cat, array![1., 3., 0.5]);
        let copied = EdgeFn::<f64>::call(&CopySrc::new("x"), &edge).unwrap();
        assert_eq!(copied, array![1.]);
        let copied = EdgeFn::<f64>::call(&CopyEdge::new("w"), &edge).unwrap();
        assert_eq!(copied, array![0.5]);
        // width mismatch
        let res = EdgeFn::<f64>::call(&SrcDotDst::new("h", "x"), &edge);
        assert!(res.is_err());
        // missing feature
        let err = EdgeFn::<f64>::call(&CopySrc::new("nope"), &edge).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GraphError>(),
            Some(GraphError::MissingFeature(_))
        ));
    } // end of test_builtin_edge_functions

    #[test]
    fn test_reducers() {
        let rows = array![[1., -2.], [3., 4.], [2., 1.]];
        assert_eq!(Reducer::Sum.reduce_view(rows.view()), array![6., 3.]);
        assert_eq!(Reducer::Mean.reduce_view(rows.view()), array![2., 1.]);
        assert_eq!(Reducer::Max.reduce_view(rows.view()), array![3., 4.]);
        assert_eq!(Reducer::Min.reduce_view(rows.view()), array![1., -2.]);
        let empty = ndarray::Array2::<f32>::zeros((0, 3));
        assert_eq!(Reducer::Max.reduce_view(empty.view()), array![0f32, 0., 0.]);
    } // end of test_reducers

    #[test]
    fn test_closures() {
        let (nodes, edges) = get_tables();
        let edge = EdgeRef::new(0, 1, 0, &nodes, &edges);
        let diff = edge_fn(|e: &EdgeRef<'_, f64>| Ok(&e.src("x")? - &e.dst("x")?));
        assert_eq!(diff.call(&edge).unwrap(), array![2.]);
        //
        let messages = array![[1.], [5.]];
        let eids = [3usize, 7];
        let mailbox = Mailbox::new(4, &eids, messages.view());
        let last = reduce_fn(|m: &Mailbox<'_, f64>| {
            let nb = m.len();
            Ok(m.messages().row(nb - 1).to_owned())
        });
        assert_eq!(last.call(&mailbox).unwrap(), array![5.]);
        assert_eq!(mailbox.edge_ids(), &[3, 7]);
        //
        let node = NodeRef::new(1, &nodes, None);
        let double = node_fn(|n: &NodeRef<'_, f64>| Ok(n.data("x")?.to_owned() * 2.));
        assert_eq!(double.call(&node).unwrap(), array![6.]);
        assert!(node.reduced().is_none());
    } // end of test_closures
} // end of mod tests
