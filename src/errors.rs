//! Error taxonomy of the crate.
//!
//! - configuration errors are raised before any computation begins (malformed construction,
//!   out of range ids, incompatible graphs in a batch).
//! - shape errors are raised at the feature table boundary.
//! - computation errors wrap the failure of a user supplied function. A call raising
//!   it produces no output at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    /// malformed graph construction, out of range ids or batching incompatibility
    #[error("configuration error: {0}")]
    Configuration(String),

    /// row count or width mismatch on a named feature
    #[error("shape error on {name}: expected {expected}, got {got}")]
    Shape {
        name: String,
        expected: usize,
        got: usize,
    },

    /// no feature with this name
    #[error("missing feature: {0}")]
    MissingFeature(String),

    /// dense accessor used on an index column or the reverse
    #[error("feature {0} is not of the requested kind")]
    FeatureKind(String),

    /// a message, reduce, edge or node function failed
    #[error("computation error in {context}")]
    Computation {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// dump or reload failure
    #[error("io error: {0}")]
    Io(String),
}

impl GraphError {
    /// wraps the failure of a user function into a [GraphError::Computation].
    /// Only lookup failures raised by the feature tables inside a closure ([GraphError::MissingFeature],
    /// [GraphError::FeatureKind] and [GraphError::Shape]) are surfaced unchanged.
    /// Any other error, a `GraphError::Configuration` returned by the closure included, is wrapped.
    pub(crate) fn from_user(context: String, err: anyhow::Error) -> Self {
        match err.downcast::<GraphError>() {
            Ok(
                lookup @ (GraphError::MissingFeature(_)
                | GraphError::FeatureKind(_)
                | GraphError::Shape { .. }),
            ) => lookup,
            Ok(other) => GraphError::Computation {
                context,
                source: anyhow::Error::new(other),
            },
            Err(source) => GraphError::Computation { context, source },
        }
    }
} // end of impl GraphError

pub type Result<T> = std::result::Result<T, GraphError>;

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_user_error_wrapping() {
        let err = GraphError::from_user(String::from("edge 3"), anyhow::anyhow!("boom"));
        match err {
            GraphError::Computation { context, source } => {
                assert_eq!(context, "edge 3");
                assert_eq!(source.to_string(), "boom");
            }
            _ => panic!("expected a computation error"),
        }
        // our own errors go through unchanged
        let inner = anyhow::Error::from(GraphError::MissingFeature(String::from("h")));
        let err = GraphError::from_user(String::from("edge 0"), inner);
        assert!(matches!(err, GraphError::MissingFeature(name) if name == "h"));
        // other crate errors returned by a user function are still computation errors
        let inner = anyhow::Error::from(GraphError::Configuration(String::from("bad")));
        let err = GraphError::from_user(String::from("node 2"), inner);
        match err {
            GraphError::Computation { context, source } => {
                assert_eq!(context, "node 2");
                assert!(matches!(
                    source.downcast_ref::<GraphError>(),
                    Some(GraphError::Configuration(msg)) if msg == "bad"
                ));
            }
            _ => panic!("expected a computation error"),
        }
    } // end of test_user_error_wrapping
} // end of mod tests
