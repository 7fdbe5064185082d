//! Nested-array inputs.

use crate::architecture::Shape;
use crate::errors::{NetError, Result};

use serde::{Deserialize, Serialize};

/// A network input: a number, or an array of nested tensors.
///
/// Deserializes from plain JSON numbers and arrays, so an image decoded to
/// `[[[r, g, b], ...], ...]` can be fed to a network with a `[w, h, 3]`
/// input architecture as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tensor {
    Value(f64),
    Array(Vec<Tensor>),
}

impl Tensor {
    /// Reads the tensor's leaves in row-major order, checking that it has
    /// exactly the given `shape`.
    pub fn flatten(&self, shape: &Shape) -> Result<Vec<f64>> {
        if let Tensor::Value(_) = *self {
            return Err(NetError::InvalidInput("input must be an array"
                .to_string()));
        }
        let mut values = Vec::with_capacity(shape.len());
        self.flatten_into(shape.dims(), 0, &mut values)?;
        Ok(values)
    }

    fn flatten_into(&self,
                    dims: &[usize],
                    depth: usize,
                    values: &mut Vec<f64>)
                    -> Result<()> {
        match (self, dims.get(depth)) {
            (&Tensor::Value(value), None) => {
                values.push(value);
                Ok(())
            }
            (&Tensor::Array(ref items), Some(&size)) => {
                if items.len() != size {
                    return Err(NetError::InvalidInput(format!(
                        "expected {} elements at depth {}, found {}",
                        size,
                        depth,
                        items.len()
                    )));
                }
                for item in items {
                    item.flatten_into(dims, depth + 1, values)?;
                }
                Ok(())
            }
            (&Tensor::Value(_), Some(_)) => {
                Err(NetError::InvalidInput(format!(
                    "expected an array at depth {}, found a number",
                    depth
                )))
            }
            (&Tensor::Array(_), None) => {
                Err(NetError::InvalidInput(format!(
                    "expected a number at depth {}, found an array",
                    depth
                )))
            }
        }
    }
}

impl From<f64> for Tensor {
    fn from(value: f64) -> Self {
        Tensor::Value(value)
    }
}

impl<T: Into<Tensor>> From<Vec<T>> for Tensor {
    fn from(items: Vec<T>) -> Self {
        Tensor::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Tensor>, const N: usize> From<[T; N]> for Tensor {
    fn from(items: [T; N]) -> Self {
        Tensor::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<'a> From<&'a [f64]> for Tensor {
    fn from(items: &'a [f64]) -> Self {
        Tensor::Array(items.iter().map(|&v| Tensor::Value(v)).collect())
    }
}
