//! Coordinate spaces for layers.
//!
//! A layer's *architecture* is the list of its per-dimension sizes. Neurons
//! are addressed by coordinate tuples drawn from the Cartesian product of
//! those sizes, enumerated in row-major order (the last dimension varies
//! fastest).

use crate::errors::{NetError, Result};

use std::fmt;

/// A validated, non-empty architecture with no zero-sized dimension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Validates `dims` as an architecture.
    pub fn new(dims: &[usize]) -> Result<Self> {
        if dims.is_empty() {
            return Err(NetError::architecture(
                dims,
                "architecture must have at least one dimension",
            ));
        }
        if dims.contains(&0) {
            return Err(NetError::architecture(
                dims,
                "every dimension must be a positive integer",
            ));
        }
        Ok(Shape { dims: dims.to_vec() })
    }

    /// The per-dimension sizes.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Number of coordinates in the space.
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the row-major position of `coord`, or `None` if it lies
    /// outside the space.
    pub fn offset(&self, coord: &[usize]) -> Option<usize> {
        if coord.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        for (&c, &d) in coord.iter().zip(&self.dims) {
            if c >= d {
                return None;
            }
            offset = offset * d + c;
        }
        Some(offset)
    }

    /// Iterates every coordinate of the space in row-major order.
    pub fn coords(&self) -> Coords {
        Coords::new(&self.dims)
    }
}

/// A multi-radix counter over an architecture.
///
/// Each dimension is a digit whose radix is that dimension's size; the
/// counter yields the current digits and then increments the last one,
/// carrying leftwards.
#[derive(Clone, Debug)]
pub struct Coords {
    radices: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl Coords {
    fn new(radices: &[usize]) -> Self {
        let empty = radices.is_empty() || radices.contains(&0);
        Coords {
            radices: radices.to_vec(),
            next: if empty { None } else { Some(vec![0; radices.len()]) },
        }
    }
}

impl Iterator for Coords {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut digits = current.clone();
        for i in (0..digits.len()).rev() {
            digits[i] += 1;
            if digits[i] < self.radices[i] {
                self.next = Some(digits);
                break;
            }
            digits[i] = 0;
        }
        Some(current)
    }
}

/// The position of a neuron within its layer.
///
/// Layers with channels (convolutional and pooling layers) prefix the
/// spatial position with the channel's filter index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordKey {
    pub filter: Option<usize>,
    pub position: Vec<usize>,
}

impl CoordKey {
    /// A key in a layer without channels.
    pub fn flat(position: Vec<usize>) -> Self {
        CoordKey { filter: None, position }
    }

    /// A key in channel `filter` of a channelled layer.
    pub fn channel(filter: usize, position: Vec<usize>) -> Self {
        CoordKey { filter: Some(filter), position }
    }
}

impl fmt::Display for CoordKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(filter) = self.filter {
            write!(f, "{}x", filter)?;
        }
        for (i, c) in self.position.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_architecture() {
        assert!(matches!(Shape::new(&[]),
                         Err(NetError::InvalidArchitecture { .. })));
    }

    #[test]
    fn rejects_zero_dimension() {
        assert!(matches!(Shape::new(&[3, 0, 2]),
                         Err(NetError::InvalidArchitecture { .. })));
    }

    #[test]
    fn length_is_product_of_dimensions() {
        assert_eq!(Shape::new(&[3]).unwrap().len(), 3);
        assert_eq!(Shape::new(&[3, 4]).unwrap().len(), 12);
        assert_eq!(Shape::new(&[3, 4, 5]).unwrap().len(), 60);
        assert_eq!(Shape::new(&[3, 4, 5, 6]).unwrap().len(), 360);
    }

    #[test]
    fn coords_are_row_major() {
        let shape = Shape::new(&[2, 3]).unwrap();
        let coords: Vec<_> = shape.coords().collect();
        assert_eq!(coords,
                   vec![vec![0, 0], vec![0, 1], vec![0, 2],
                        vec![1, 0], vec![1, 1], vec![1, 2]]);
    }

    #[test]
    fn coords_cover_space_exactly_once() {
        let shape = Shape::new(&[3, 4, 5]).unwrap();
        let coords: Vec<_> = shape.coords().collect();
        assert_eq!(coords.len(), 60);
        for (i, coord) in coords.iter().enumerate() {
            assert_eq!(shape.offset(coord), Some(i));
        }
    }

    #[test]
    fn offset_rejects_out_of_range() {
        let shape = Shape::new(&[2, 3]).unwrap();
        assert_eq!(shape.offset(&[1, 3]), None);
        assert_eq!(shape.offset(&[1]), None);
        assert_eq!(shape.offset(&[1, 2]), Some(5));
    }

    #[test]
    fn key_display_prefixes_filter() {
        assert_eq!(CoordKey::flat(vec![0, 3, 1]).to_string(), "0.3.1");
        assert_eq!(CoordKey::channel(3, vec![0, 3, 1]).to_string(), "3x0.3.1");
    }
}
