//! Named feature tables attached to nodes or edges.
//!
//! A table has a fixed number of rows (the number of nodes or the number of edges of the graph owning it)
//! and maps a name to a column. A column is either dense, an `Array2<F>` with one row per entity and
//! the same width for all rows, or an index column `Array1<usize>` used to store provenance ids.
//! Names are kept in insertion order so that dumps and batches are reproducible.

use indexmap::IndexMap;
use ndarray::{s, Array1, Array2, ArrayView2, Axis};

use crate::errors::{GraphError, Result};

use super::FeatureT;

/// A column of a feature table.
#[derive(Clone, Debug, PartialEq)]
pub enum Column<F> {
    /// one row of width `ncols` per entity
    Dense(Array2<F>),
    /// one id per entity
    Index(Array1<usize>),
}

/// Describes the kind and width of a column, used to compare tables before batching.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnKind {
    Dense(usize),
    Index,
}

impl<F> Column<F>
where
    F: FeatureT,
{
    /// number of rows
    pub fn nb_rows(&self) -> usize {
        match self {
            Column::Dense(arr) => arr.nrows(),
            Column::Index(arr) => arr.len(),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Dense(arr) => ColumnKind::Dense(arr.ncols()),
            Column::Index(_) => ColumnKind::Index,
        }
    }

    /// copies rows in the order given by ids
    pub(crate) fn select_rows(&self, ids: &[usize]) -> Self {
        match self {
            Column::Dense(arr) => Column::Dense(arr.select(Axis(0), ids)),
            Column::Index(arr) => Column::Index(arr.select(Axis(0), ids)),
        }
    }

    /// copies rows in range [start, end)
    pub(crate) fn slice_rows(&self, start: usize, end: usize) -> Self {
        match self {
            Column::Dense(arr) => Column::Dense(arr.slice(s![start..end, ..]).to_owned()),
            Column::Index(arr) => Column::Index(arr.slice(s![start..end]).to_owned()),
        }
    }
} // end of impl Column

//=====================================================================================

/// Read access to dense columns by name.
/// Implemented by [FeatureTable] and by the overlay of a [FeatureScope](crate::engine::scope::FeatureScope)
/// so that user functions read features the same way in both cases.
pub trait FeatureSource<F> {
    /// number of rows of every column
    fn nb_rows(&self) -> usize;
    /// get a dense column
    fn dense(&self, name: &str) -> Result<ArrayView2<'_, F>>;
}

/// Feature table. F is the element type of dense columns.
/// Equality does not depend on the insertion order of columns.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureTable<F> {
    nb_rows: usize,
    columns: IndexMap<String, Column<F>, ahash::RandomState>,
} // end of struct FeatureTable

impl<F> FeatureTable<F>
where
    F: FeatureT,
{
    /// an empty table for nb_rows entities
    pub fn new(nb_rows: usize) -> Self {
        FeatureTable {
            nb_rows,
            columns: IndexMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// number of rows every column must have
    pub fn get_nb_rows(&self) -> usize {
        self.nb_rows
    }

    /// number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// column names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// iterates on (name, column) in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column<F>)> {
        self.columns.iter().map(|(k, c)| (k.as_str(), c))
    }

    /// insert or replace a column after checking its row count
    pub fn set_column(&mut self, name: &str, column: Column<F>) -> Result<()> {
        if column.nb_rows() != self.nb_rows {
            log::error!(
                "feature {} has {} rows, table needs {}",
                name,
                column.nb_rows(),
                self.nb_rows
            );
            return Err(GraphError::Shape {
                name: name.to_string(),
                expected: self.nb_rows,
                got: column.nb_rows(),
            });
        }
        self.columns.insert(name.to_string(), column);
        Ok(())
    } // end of set_column

    /// insert or replace a dense column
    pub fn set(&mut self, name: &str, arr: Array2<F>) -> Result<()> {
        self.set_column(name, Column::Dense(arr))
    }

    /// insert or replace an index column
    pub fn set_index(&mut self, name: &str, ids: Array1<usize>) -> Result<()> {
        self.set_column(name, Column::Index(ids))
    }

    pub fn get_column(&self, name: &str) -> Result<&Column<F>> {
        self.columns
            .get(name)
            .ok_or_else(|| GraphError::MissingFeature(name.to_string()))
    }

    /// get a dense column
    pub fn get(&self, name: &str) -> Result<&Array2<F>> {
        match self.get_column(name)? {
            Column::Dense(arr) => Ok(arr),
            Column::Index(_) => Err(GraphError::FeatureKind(name.to_string())),
        }
    }

    /// get an index column
    pub fn get_index(&self, name: &str) -> Result<&Array1<usize>> {
        match self.get_column(name)? {
            Column::Index(arr) => Ok(arr),
            Column::Dense(_) => Err(GraphError::FeatureKind(name.to_string())),
        }
    }

    /// removes a column, returns it if present
    pub fn remove(&mut self, name: &str) -> Option<Column<F>> {
        self.columns.shift_remove(name)
    }

    /// (name, kind) sorted by name. Two tables can be concatenated iff their schemas are equal.
    pub fn schema(&self) -> Vec<(String, ColumnKind)> {
        let mut schema: Vec<(String, ColumnKind)> = self
            .columns
            .iter()
            .map(|(k, c)| (k.clone(), c.kind()))
            .collect();
        schema.sort();
        schema
    }

    /// a new table holding copies of rows ids (in this order)
    pub fn select_rows(&self, ids: &[usize]) -> Self {
        let mut table = FeatureTable::new(ids.len());
        for (name, column) in &self.columns {
            table.columns.insert(name.clone(), column.select_rows(ids));
        }
        table
    }

    /// a new table holding copies of rows in [start, end)
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        let mut table = FeatureTable::new(end - start);
        for (name, column) in &self.columns {
            table
                .columns
                .insert(name.clone(), column.slice_rows(start, end));
        }
        table
    }

    /// a new table where row i is a copy of row origin\[i\] or a zero row if origin\[i\] is None.
    /// Index columns cannot be zero filled, they are dropped as soon as one row has no origin.
    pub(crate) fn gather_rows(&self, origin: &[Option<usize>]) -> Self {
        let mut table = FeatureTable::new(origin.len());
        let complete = origin.iter().all(|o| o.is_some());
        for (name, column) in &self.columns {
            match column {
                Column::Dense(arr) => {
                    let mut gathered = Array2::<F>::zeros((origin.len(), arr.ncols()));
                    for (i, o) in origin.iter().enumerate() {
                        if let Some(j) = o {
                            gathered.row_mut(i).assign(&arr.row(*j));
                        }
                    }
                    table.columns.insert(name.clone(), Column::Dense(gathered));
                }
                Column::Index(arr) => {
                    if complete {
                        let ids: Array1<usize> = origin.iter().flatten().map(|j| arr[*j]).collect();
                        table.columns.insert(name.clone(), Column::Index(ids));
                    } else {
                        log::debug!("gather_rows dropping index column {}", name);
                    }
                }
            }
        }
        table
    } // end of gather_rows
} // end of impl FeatureTable

impl<F> FeatureSource<F> for FeatureTable<F>
where
    F: FeatureT,
{
    fn nb_rows(&self) -> usize {
        self.nb_rows
    }

    fn dense(&self, name: &str) -> Result<ArrayView2<'_, F>> {
        self.get(name).map(|arr| arr.view())
    }
} // end of impl FeatureSource for FeatureTable

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use ndarray::array;

    #[allow(dead_code)]
    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_set_get_checks() {
        log_init_test();
        let mut table = FeatureTable::<f64>::new(3);
        table
            .set("h", array![[1., 2.], [3., 4.], [5., 6.]])
            .unwrap();
        assert_eq!(table.get("h").unwrap()[[2, 1]], 6.);
        // row count mismatch
        let res = table.set("bad", array![[1.], [2.]]);
        assert!(matches!(res, Err(GraphError::Shape { expected: 3, got: 2, .. })));
        assert!(!table.contains("bad"));
        // missing and wrong kind
        assert!(matches!(table.get("x"), Err(GraphError::MissingFeature(_))));
        table.set_index("_ID", array![7, 8, 9]).unwrap();
        assert!(matches!(table.get("_ID"), Err(GraphError::FeatureKind(_))));
        assert!(matches!(table.get_index("h"), Err(GraphError::FeatureKind(_))));
        assert_eq!(table.names().collect::<Vec<&str>>(), vec!["h", "_ID"]);
    } // end of test_set_get_checks

    #[test]
    fn test_select_and_gather() {
        log_init_test();
        let mut table = FeatureTable::<f32>::new(3);
        table.set("h", array![[1.], [2.], [3.]]).unwrap();
        table.set_index("_ID", array![10, 11, 12]).unwrap();
        //
        let selected = table.select_rows(&[2, 0]);
        assert_eq!(selected.get_nb_rows(), 2);
        assert_eq!(selected.get("h").unwrap(), &array![[3.], [1.]]);
        assert_eq!(selected.get_index("_ID").unwrap(), &array![12, 10]);
        //
        let gathered = table.gather_rows(&[Some(1), None]);
        assert_eq!(gathered.get("h").unwrap(), &array![[2.], [0.]]);
        assert!(!gathered.contains("_ID"));
        //
        let sliced = table.slice_rows(1, 3);
        assert_eq!(sliced.get("h").unwrap(), &array![[2.], [3.]]);
    } // end of test_select_and_gather

    #[test]
    fn test_schema_ignores_insertion_order() {
        let mut t1 = FeatureTable::<f64>::new(1);
        t1.set("a", array![[1.]]).unwrap();
        t1.set("b", array![[1., 2.]]).unwrap();
        let mut t2 = FeatureTable::<f64>::new(1);
        t2.set("b", array![[0., 0.]]).unwrap();
        t2.set("a", array![[0.]]).unwrap();
        assert_eq!(t1.schema(), t2.schema());
        t2.set("a", array![[0., 1.]]).unwrap();
        assert_ne!(t1.schema(), t2.schema());
    } // end of test_schema_ignores_insertion_order
} // end of mod tests
