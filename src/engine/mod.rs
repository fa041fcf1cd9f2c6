//! The computation engines.
//!
//! - [update_all](update::update_all) : message passing. A message is computed on every edge, messages are grouped
//!   by destination node in a [Mailbox](funcs::Mailbox) and reduced to one row per receiving node.
//! - [apply_edges](apply::apply_edges) : a new row per edge from the rows of its endpoints and its own row.
//! - [FeatureScope](scope::FeatureScope) : temporary features that are discarded at the end of the scope.
//!
//! User functions see features only through the [EdgeFn](funcs::EdgeFn), [ReduceFn](funcs::ReduceFn)
//! and [NodeFn](funcs::NodeFn) interfaces. Builtins implement the same interfaces.
//!
//! A call either produces its whole output or fails, no partial result is ever returned.
//! With [PassParams](params::PassParams) asking for parallelism, per edge and per node computations
//! are dispatched with rayon; results are the same as in the serial case.

use ndarray::Array2;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::errors::{GraphError, Result};
use crate::graph::FeatureT;

/// Parameters of engine calls.
pub mod params;

/// Message, reduce, edge and node functions and their builtins.
pub mod funcs;

pub mod update;

pub mod apply;

pub mod scope;

// maps f on 0..nb, serially or with rayon. Stops at first error.
pub(crate) fn map_indices<T, G>(nb: usize, parallel: bool, f: G) -> Result<Vec<T>>
where
    T: Send,
    G: Fn(usize) -> Result<T> + Sync + Send,
{
    if parallel {
        (0..nb).into_par_iter().map(f).collect()
    } else {
        (0..nb).map(f).collect()
    }
} // end of map_indices

// stack rows (all of the same length) into an Array2. No row gives a (0,0) array.
pub(crate) fn stack_rows<F>(rows: Vec<ndarray::Array1<F>>, what: &str) -> Result<Array2<F>>
where
    F: FeatureT,
{
    let nb_rows = rows.len();
    if nb_rows == 0 {
        return Ok(Array2::<F>::zeros((0, 0)));
    }
    let width = rows[0].len();
    let mut flat = Vec::<F>::with_capacity(nb_rows * width);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            log::error!(
                "{} row {} has width {}, first row had width {}",
                what,
                i,
                row.len(),
                width
            );
            return Err(GraphError::Shape {
                name: format!("{} row {}", what, i),
                expected: width,
                got: row.len(),
            });
        }
        flat.extend(row.iter());
    }
    Array2::from_shape_vec((nb_rows, width), flat).map_err(|_| GraphError::Shape {
        name: what.to_string(),
        expected: nb_rows * width,
        got: nb_rows * width,
    })
} // end of stack_rows

// checks a feature source has the row count of the graph side it is used for
pub(crate) fn check_rows(what: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        log::error!("{} has {} rows, graph needs {}", what, got, expected);
        return Err(GraphError::Shape {
            name: what.to_string(),
            expected,
            got,
        });
    }
    Ok(())
} // end of check_rows

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use ndarray::array;

    #[test]
    fn test_stack_rows() {
        let stacked = stack_rows(vec![array![1., 2.], array![3., 4.]], "message").unwrap();
        assert_eq!(stacked, array![[1., 2.], [3., 4.]]);
        let empty = stack_rows::<f64>(vec![], "message").unwrap();
        assert_eq!(empty.dim(), (0, 0));
        let res = stack_rows(vec![array![1., 2.], array![3.]], "message");
        assert!(matches!(res, Err(GraphError::Shape { expected: 2, got: 1, .. })));
    } // end of test_stack_rows

    #[test]
    fn test_map_indices_stops_on_error() {
        for parallel in [false, true] {
            let res = map_indices(100, parallel, |i| {
                if i == 42 {
                    Err(GraphError::Configuration(String::from("42")))
                } else {
                    Ok(i * 2)
                }
            });
            assert!(res.is_err());
            let res = map_indices(10, parallel, |i| Ok(i * 2)).unwrap();
            assert_eq!(res, (0..10).map(|i| i * 2).collect::<Vec<usize>>());
        }
    } // end of test_map_indices_stops_on_error
} // end of mod tests
