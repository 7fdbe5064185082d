//! Errors raised while building or running a network.

use thiserror::Error;

/// Everything that can go wrong when constructing layers or feeding data
/// through a `Network`.
///
/// Construction errors leave no partially built layer behind.
#[derive(Debug, Error)]
pub enum NetError {
    /// A layer or filter architecture is empty or has a zero-sized dimension.
    #[error("invalid architecture {architecture:?}: {reason}")]
    InvalidArchitecture {
        architecture: Vec<usize>,
        reason: String,
    },

    /// The convolution output size for one dimension is not a positive
    /// integer.
    #[error(
        "incompatible combination of input structure, filter structure, and \
         stride: ({input_length} - ({filter_length} - {stride})) / {stride} = \
         {result}"
    )]
    IncompatibleFilter {
        input_length: usize,
        filter_length: usize,
        stride: usize,
        result: f64,
    },

    /// The pooling extent cannot tile the input layer.
    #[error(
        "pooling extent {extent} not compatible with input architecture \
         {architecture:?}: {reason}"
    )]
    PoolingIncompatible {
        extent: usize,
        architecture: Vec<usize>,
        reason: String,
    },

    /// An input or target does not match the network's shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A network configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A configuration or example file could not be read.
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NetError>;

impl NetError {
    pub(crate) fn architecture<S: Into<String>>(architecture: &[usize],
                                                reason: S)
                                                -> Self {
        NetError::InvalidArchitecture {
            architecture: architecture.to_vec(),
            reason: reason.into(),
        }
    }

    pub(crate) fn pooling<S: Into<String>>(extent: usize,
                                           architecture: &[usize],
                                           reason: S)
                                           -> Self {
        NetError::PoolingIncompatible {
            extent,
            architecture: architecture.to_vec(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incompatible_filter_message_shows_arithmetic() {
        let err = NetError::IncompatibleFilter {
            input_length: 3,
            filter_length: 2,
            stride: 2,
            result: 1.5,
        };
        assert_eq!(err.to_string(),
                   "incompatible combination of input structure, filter \
                    structure, and stride: (3 - (2 - 2)) / 2 = 1.5");
    }

    #[test]
    fn config_errors_convert() {
        let parse: std::result::Result<Vec<usize>, _> =
            serde_json::from_str("[1,");
        let err: NetError = parse.unwrap_err().into();
        assert!(matches!(err, NetError::Config(_)));
    }
}
