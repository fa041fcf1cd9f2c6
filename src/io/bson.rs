//! Bson dump and reload of a graph.
//!
//! The file is a sequence of bson documents. A bson document must not be larger than 16Mb, so the values
//! of a column are split into blocks of rows, each block getting its own document:
//!
//! 1. a header document with key "header", see [GraphBsonHeader] : format version, element type name
//!    (as given by std::any::type_name), number of nodes and edges, batch bookkeeping, number of columns.
//! 2. the topology, as two index columns "src" and "dst" laid out as below.
//! 3. for each feature column, node columns first, in table insertion order, a column document with keys
//!    "name", "kind" ("dense" or "index"), "width" and "nb_blocks", followed by nb_blocks block documents
//!    with key "values" (rows of the block concatenated). A block holds at most [MAX_VALUES_PER_BLOCK]
//!    values, or a single row if the width is larger.
//!
//! Bson requires usize to be encoded as i64. Dense values are stored as their bit pattern in an i64
//! (see [FeatureT::to_bits64]), so the reload is bit exact, Nan payloads included.

use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use bson::{doc, Document};
use ndarray::{Array1, Array2};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::errors::{GraphError, Result};
use crate::graph::{Column, FeatureT, FeatureTable, Graph};

const FORMAT_VERSION: i64 = 2;

/// maximum number of values in a block document. An i64 array entry takes at most 16 bytes.
pub const MAX_VALUES_PER_BLOCK: usize = 1 << 19;

/// Header of a graph dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphBsonHeader {
    /// version of dump format
    pub version: i64,
    /// element type of dense features, "f32" or "f64"
    pub type_name: String,
    pub nb_nodes: i64,
    pub nb_edges: i64,
    /// number of nodes of each constituent
    pub batch_num_nodes: Vec<i64>,
    /// number of edges of each constituent
    pub batch_num_edges: Vec<i64>,
    /// number of node feature columns
    pub nb_ndata: i64,
    /// number of edge feature columns
    pub nb_edata: i64,
} // end of GraphBsonHeader

fn to_i64(x: usize) -> Result<i64> {
    i64::from_usize(x).ok_or_else(|| GraphError::Io(format!("{} does not fit in i64", x)))
}

fn to_usize(x: i64) -> Result<usize> {
    usize::from_i64(x).ok_or_else(|| GraphError::Io(format!("{} is not a valid count or id", x)))
}

fn write_doc<W: Write>(doc: &Document, writer: &mut W, what: &str) -> Result<()> {
    doc.to_writer(writer).map_err(|e| {
        log::error!("bson dump of {} failed : {}", what, e);
        GraphError::Io(format!("bson dump of {} failed : {}", what, e))
    })
}

fn read_doc<R: Read>(reader: &mut R, what: &str) -> Result<Document> {
    Document::from_reader(reader).map_err(|e| {
        log::error!("bson reload of {} failed : {}", what, e);
        GraphError::Io(format!("could not read {} document : {}", what, e))
    })
}

// values of a column, rows concatenated
fn column_values<F>(name: &str, column: &Column<F>) -> Result<Vec<i64>>
where
    F: FeatureT,
{
    match column {
        // bit reinterpretation of u64 as i64, undone at reload
        Column::Dense(arr) => Ok(arr.iter().map(|x| x.to_bits64() as i64).collect()),
        Column::Index(arr) => arr
            .iter()
            .map(|x| to_i64(*x))
            .collect::<Result<Vec<i64>>>()
            .map_err(|e| GraphError::Io(format!("index column {} : {}", name, e))),
    }
} // end of column_values

// writes the column document then its blocks
fn write_column<F, W>(
    name: &str,
    column: &Column<F>,
    max_values: usize,
    writer: &mut W,
) -> Result<()>
where
    F: FeatureT,
    W: Write,
{
    let (kind, width) = match column {
        Column::Dense(arr) => ("dense", arr.ncols()),
        Column::Index(_) => ("index", 1),
    };
    let values = column_values(name, column)?;
    let rows_per_block = (max_values / width.max(1)).max(1);
    let block_len = rows_per_block * width.max(1);
    let blocks: Vec<&[i64]> = if width == 0 {
        Vec::new()
    } else {
        values.chunks(block_len).collect()
    };
    let column_doc = doc! {
        "name": name,
        "kind": kind,
        "width": to_i64(width)?,
        "nb_blocks": to_i64(blocks.len())?,
    };
    write_doc(&column_doc, writer, name)?;
    for block in blocks {
        write_doc(&doc! { "values": block.to_vec() }, writer, name)?;
    }
    Ok(())
} // end of write_column

// reads a column document and its blocks at the current position
fn read_column<F, R>(reader: &mut R, nb_rows: usize) -> Result<(String, Column<F>)>
where
    F: FeatureT,
    R: Read,
{
    let doc = read_doc(reader, "column")?;
    let io_err = |e: bson::document::ValueAccessError| GraphError::Io(format!("malformed column document : {}", e));
    let name = doc.get_str("name").map_err(io_err)?.to_string();
    let kind = doc.get_str("kind").map_err(io_err)?;
    let width = to_usize(doc.get_i64("width").map_err(io_err)?)?;
    let nb_blocks = to_usize(doc.get_i64("nb_blocks").map_err(io_err)?)?;
    let mut values = Vec::<i64>::with_capacity(nb_rows * width);
    for _ in 0..nb_blocks {
        let block = read_doc(reader, &name)?;
        let block_values = block.get_array("values").map_err(io_err)?;
        for b in block_values {
            let x = b
                .as_i64()
                .ok_or_else(|| GraphError::Io(format!("non integer value in column {}", name)))?;
            values.push(x);
        }
    }
    if values.len() != nb_rows * width {
        log::error!(
            "column {} has {} values, expected {} rows of width {}",
            name,
            values.len(),
            nb_rows,
            width
        );
        return Err(GraphError::Io(format!(
            "column {} has {} values, expected {}",
            name,
            values.len(),
            nb_rows * width
        )));
    }
    let column = match kind {
        "dense" => {
            let flat = values
                .iter()
                .map(|x| F::from_bits64(*x as u64))
                .collect::<Option<Vec<F>>>()
                .ok_or_else(|| GraphError::Io(format!("value of column {} is not a {}", name, std::any::type_name::<F>())))?;
            let arr = Array2::from_shape_vec((nb_rows, width), flat).map_err(|e| {
                GraphError::Io(format!("column {} has an inconsistent size : {}", name, e))
            })?;
            Column::Dense(arr)
        }
        "index" => {
            let ids = values
                .iter()
                .map(|x| to_usize(*x))
                .collect::<Result<Vec<usize>>>()?;
            Column::Index(Array1::from(ids))
        }
        other => {
            return Err(GraphError::Io(format!(
                "unknown column kind {} for {}",
                other, name
            )));
        }
    };
    Ok((name, column))
} // end of read_column

/// dumps graph (topology, batch bookkeeping and all features) in file path. The file is created or truncated.
pub fn bson_dump<F, P>(graph: &Graph<F>, path: P) -> Result<()>
where
    F: FeatureT,
    P: AsRef<Path>,
{
    dump_in_blocks(graph, path.as_ref(), MAX_VALUES_PER_BLOCK)
}

fn dump_in_blocks<F>(graph: &Graph<F>, path: &Path, max_values: usize) -> Result<()>
where
    F: FeatureT,
{
    log::info!("entering bson_dump, file : {}", path.display());
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| {
            log::error!("could not open file {} : {}", path.display(), e);
            GraphError::Io(format!("could not open file {} : {}", path.display(), e))
        })?;
    let mut bufwriter = BufWriter::new(file);
    //
    let header = GraphBsonHeader {
        version: FORMAT_VERSION,
        type_name: std::any::type_name::<F>().to_string(),
        nb_nodes: to_i64(graph.get_nb_nodes())?,
        nb_edges: to_i64(graph.get_nb_edges())?,
        batch_num_nodes: graph
            .get_batch_num_nodes()
            .iter()
            .map(|x| to_i64(*x))
            .collect::<Result<Vec<i64>>>()?,
        batch_num_edges: graph
            .get_batch_num_edges()
            .iter()
            .map(|x| to_i64(*x))
            .collect::<Result<Vec<i64>>>()?,
        nb_ndata: to_i64(graph.get_ndata().len())?,
        nb_edata: to_i64(graph.get_edata().len())?,
    };
    let bson_header = bson::to_bson(&header)
        .map_err(|e| GraphError::Io(format!("could not encode header : {}", e)))?;
    write_doc(&doc! { "header": bson_header }, &mut bufwriter, "header")?;
    //
    let (src, dst) = graph.get_edges();
    for (name, ids) in [("src", src), ("dst", dst)] {
        let column = Column::<F>::Index(Array1::from(ids.to_vec()));
        write_column(name, &column, max_values, &mut bufwriter)?;
    }
    //
    for table in [graph.get_ndata(), graph.get_edata()] {
        for (name, column) in table.iter() {
            write_column(name, column, max_values, &mut bufwriter)?;
            log::debug!("\t dumped column {}", name);
        }
    }
    bufwriter
        .flush()
        .map_err(|e| GraphError::Io(format!("could not flush {} : {}", path.display(), e)))?;
    log::info!("bson dump in file {} finished", path.display());
    Ok(())
} // end of dump_in_blocks

// reads the header document at the current position
fn read_header<R: Read>(reader: &mut R) -> Result<GraphBsonHeader> {
    let doc = read_doc(reader, "header")?;
    let bson_header = doc
        .get_document("header")
        .map_err(|_| GraphError::Io(String::from("could not find header in document")))?;
    let header: GraphBsonHeader = bson::from_document(bson_header.clone())
        .map_err(|e| GraphError::Io(format!("could not decode header : {}", e)))?;
    if header.version != FORMAT_VERSION {
        log::error!("header format version : {}", header.version);
        return Err(GraphError::Io(format!(
            "format version {} not supported",
            header.version
        )));
    }
    Ok(header)
} // end of read_header

// reads one of the topology columns
fn read_ids<F, R>(reader: &mut R, expected: &str, nb_edges: usize) -> Result<Vec<usize>>
where
    F: FeatureT,
    R: Read,
{
    match read_column::<F, R>(reader, nb_edges)? {
        (name, Column::Index(ids)) if name == expected => Ok(ids.to_vec()),
        (name, _) => {
            log::error!("expected topology column {}, got {}", expected, name);
            Err(GraphError::Io(format!(
                "malformed topology, expected index column {}",
                expected
            )))
        }
    }
} // end of read_ids

fn open_reader(path: &Path) -> Result<BufReader<std::fs::File>> {
    let file = OpenOptions::new().read(true).open(path).map_err(|e| {
        log::error!("could not open file {} : {}", path.display(), e);
        GraphError::Io(format!("could not open file {} : {}", path.display(), e))
    })?;
    Ok(BufReader::new(file))
}

/// returns the header of a dump. Useful to know the element type before reloading.
pub fn get_bson_header<P: AsRef<Path>>(path: P) -> Result<GraphBsonHeader> {
    let mut bufreader = open_reader(path.as_ref())?;
    read_header(&mut bufreader)
}

/// reloads a graph dumped by [bson_dump]. F must be the element type used at dump time.
pub fn bson_reload<F, P>(path: P) -> Result<Graph<F>>
where
    F: FeatureT,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    log::info!("entering bson_reload, file : {}", path.display());
    let mut bufreader = open_reader(path)?;
    let header = read_header(&mut bufreader)?;
    log::debug!("header : {:?}", header);
    let type_name = std::any::type_name::<F>();
    if header.type_name != type_name {
        log::error!(
            "header has type name : {}, reloading with : {}",
            header.type_name,
            type_name
        );
        return Err(GraphError::Io(format!(
            "dump holds {} values, cannot reload as {}",
            header.type_name, type_name
        )));
    }
    //
    let nb_nodes = to_usize(header.nb_nodes)?;
    let nb_edges = to_usize(header.nb_edges)?;
    let src = read_ids::<F, _>(&mut bufreader, "src", nb_edges)?;
    let dst = read_ids::<F, _>(&mut bufreader, "dst", nb_edges)?;
    let mut graph = Graph::<F>::from_src_dst(src, dst, Some(nb_nodes))?;
    let batch_num_nodes = header
        .batch_num_nodes
        .iter()
        .map(|x| to_usize(*x))
        .collect::<Result<Vec<usize>>>()?;
    let batch_num_edges = header
        .batch_num_edges
        .iter()
        .map(|x| to_usize(*x))
        .collect::<Result<Vec<usize>>>()?;
    graph.set_batch_info(batch_num_nodes, batch_num_edges)?;
    //
    let nb_ndata = to_usize(header.nb_ndata)?;
    let nb_edata = to_usize(header.nb_edata)?;
    for i in 0..nb_ndata + nb_edata {
        let (table, nb_rows): (&mut FeatureTable<F>, usize) = if i < nb_ndata {
            let nb_rows = graph.get_nb_nodes();
            (graph.get_ndata_mut(), nb_rows)
        } else {
            let nb_rows = graph.get_nb_edges();
            (graph.get_edata_mut(), nb_rows)
        };
        let (name, column) = read_column::<F, _>(&mut bufreader, nb_rows)?;
        table.set_column(&name, column)?;
        log::debug!("\t reloaded column {}", name);
    }
    log::info!(
        "bson reload done, nb nodes : {}, nb edges : {}",
        graph.get_nb_nodes(),
        graph.get_nb_edges()
    );
    Ok(graph)
} // end of bson_reload

//=====================================================================================

// end of mod tests
