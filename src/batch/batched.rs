//! Fusion of graphs into one batched graph and the inverse operation.

use std::borrow::Borrow;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::errors::{GraphError, Result};
use crate::graph::{Column, ColumnKind, FeatureT, FeatureTable, Graph};

use super::segments;

// names and kinds must agree in every graph
fn check_schemas(
    reference: &[(String, ColumnKind)],
    other: &[(String, ColumnKind)],
    what: &str,
    rank: usize,
) -> Result<()> {
    if reference != other {
        log::error!(
            "batch, {} features of graph {} are {:?}, graph 0 has {:?}",
            what,
            rank,
            other,
            reference
        );
        return Err(GraphError::Configuration(format!(
            "{} features of graph {} differ from those of graph 0",
            what, rank
        )));
    }
    Ok(())
} // end of check_schemas

// concatenation of the tables along rows, tables have equal schemas
fn concat_tables<F>(tables: &[&FeatureTable<F>], nb_rows: usize) -> Result<FeatureTable<F>>
where
    F: FeatureT,
{
    let mut table = FeatureTable::<F>::new(nb_rows);
    if tables.is_empty() {
        return Ok(table);
    }
    for (name, column) in tables[0].iter() {
        let fused = match column {
            Column::Dense(_) => {
                let mut views = Vec::<ArrayView2<F>>::with_capacity(tables.len());
                for t in tables {
                    views.push(t.get(name)?.view());
                }
                let arr: Array2<F> = ndarray::concatenate(Axis(0), &views).map_err(|e| {
                    GraphError::Configuration(format!("cannot concatenate feature {} : {}", name, e))
                })?;
                Column::Dense(arr)
            }
            Column::Index(_) => {
                let mut views = Vec::<ArrayView1<usize>>::with_capacity(tables.len());
                for t in tables {
                    views.push(t.get_index(name)?.view());
                }
                let arr: Array1<usize> = ndarray::concatenate(Axis(0), &views).map_err(|e| {
                    GraphError::Configuration(format!("cannot concatenate feature {} : {}", name, e))
                })?;
                Column::Index(arr)
            }
        };
        table.set_column(name, fused)?;
    }
    Ok(table)
} // end of concat_tables

/// Fuses graphs into one. Node ids of graph i are shifted by the number of nodes of the graphs before it,
/// edge ids likewise. All graphs must have the same node feature schema and the same edge feature schema
/// (names, kinds and widths). Batching already batched graphs flattens their bookkeeping.
pub fn batch<F, G>(graphs: &[G]) -> Result<Graph<F>>
where
    F: FeatureT,
    G: Borrow<Graph<F>>,
{
    if graphs.is_empty() {
        log::error!("batch called with no graph");
        return Err(GraphError::Configuration(String::from(
            "cannot batch an empty list of graphs",
        )));
    }
    let first = graphs[0].borrow();
    let nschema = first.get_ndata().schema();
    let eschema = first.get_edata().schema();
    //
    let nb_nodes: usize = graphs.iter().map(|g| g.borrow().get_nb_nodes()).sum();
    let nb_edges: usize = graphs.iter().map(|g| g.borrow().get_nb_edges()).sum();
    let mut src = Vec::<usize>::with_capacity(nb_edges);
    let mut dst = Vec::<usize>::with_capacity(nb_edges);
    let mut batch_num_nodes = Vec::<usize>::new();
    let mut batch_num_edges = Vec::<usize>::new();
    let mut ntables = Vec::<&FeatureTable<F>>::with_capacity(graphs.len());
    let mut etables = Vec::<&FeatureTable<F>>::with_capacity(graphs.len());
    let mut offset = 0;
    for (rank, g) in graphs.iter().enumerate() {
        let g = g.borrow();
        check_schemas(&nschema, &g.get_ndata().schema(), "node", rank)?;
        check_schemas(&eschema, &g.get_edata().schema(), "edge", rank)?;
        let (gsrc, gdst) = g.get_edges();
        src.extend(gsrc.iter().map(|u| u + offset));
        dst.extend(gdst.iter().map(|v| v + offset));
        batch_num_nodes.extend_from_slice(g.get_batch_num_nodes());
        batch_num_edges.extend_from_slice(g.get_batch_num_edges());
        ntables.push(g.get_ndata());
        etables.push(g.get_edata());
        offset += g.get_nb_nodes();
    }
    let ndata = concat_tables(&ntables, nb_nodes)?;
    let edata = concat_tables(&etables, nb_edges)?;
    log::debug!(
        "batch of {} graphs, batch size : {}, nb nodes : {}, nb edges : {}",
        graphs.len(),
        batch_num_nodes.len(),
        nb_nodes,
        nb_edges
    );
    Ok(Graph::from_parts(
        nb_nodes,
        src,
        dst,
        ndata,
        edata,
        batch_num_nodes,
        batch_num_edges,
    ))
} // end of batch

/// Splits a batched graph into its constituents, in batching order.
/// Each constituent is a plain graph (batch size 1) with copies of its feature rows.
pub fn unbatch<F>(graph: &Graph<F>) -> Result<Vec<Graph<F>>>
where
    F: FeatureT,
{
    let node_ranges = segments(graph.get_batch_num_nodes());
    let edge_ranges = segments(graph.get_batch_num_edges());
    let (src, dst) = graph.get_edges();
    let mut graphs = Vec::<Graph<F>>::with_capacity(graph.batch_size());
    let ranges = node_ranges.iter().zip(edge_ranges.iter());
    for (rank, ((nstart, nend), (estart, eend))) in ranges.enumerate() {
        let mut gsrc = Vec::<usize>::with_capacity(eend - estart);
        let mut gdst = Vec::<usize>::with_capacity(eend - estart);
        for eid in *estart..*eend {
            let (u, v) = (src[eid], dst[eid]);
            if u < *nstart || u >= *nend || v < *nstart || v >= *nend {
                log::error!("unbatch, edge {} ({},{}) leaves graph {}", eid, u, v, rank);
                return Err(GraphError::Configuration(format!(
                    "edge {} crosses the boundary of graph {}",
                    eid, rank
                )));
            }
            gsrc.push(u - nstart);
            gdst.push(v - nstart);
        }
        graphs.push(Graph::from_parts(
            nend - nstart,
            gsrc,
            gdst,
            graph.get_ndata().slice_rows(*nstart, *nend),
            graph.get_edata().slice_rows(*estart, *eend),
            vec![nend - nstart],
            vec![eend - estart],
        ));
    }
    log::debug!("unbatch into {} graphs", graphs.len());
    Ok(graphs)
} // end of unbatch

//=====================================================================================

// end of mod tests
