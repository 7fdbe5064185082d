use crate::architecture::Shape;
use crate::errors::Result;
use crate::graph::{Graph, NeuronKind, Weight};
use crate::layers::{self, Grid, Layer, LayerKind};
use crate::rectifier::Rectifier;

use rand::Rng;
use tracing::debug;

/// A fully connected layer of a neural network
///
/// Every neuron receives a connection from every neuron of the previous
/// layer, each with its own weight. This is the only kind of layer that may
/// serve as a network's input.
#[derive(Debug)]
pub struct FullyConnected {
    /// The rectifier used by every neuron in the layer; `None` for the input.
    rectifier: Option<Rectifier>,
    grid: Grid,
}

impl FullyConnected {
    /// Initializes an input layer, which has neither a rectifier nor incoming
    /// connections.
    pub fn input(graph: &mut Graph,
                 index: usize,
                 architecture: &[usize])
                 -> Result<Self> {
        let shape = Shape::new(architecture)?;
        let grid = Grid::build(shape, None, |_| {
            graph.add_neuron(NeuronKind::Input, index)
        });
        debug!(layer = index, neurons = grid.len(), "built input layer");
        Ok(FullyConnected {
            rectifier: None,
            grid,
        })
    }

    /// Initializes a new, untrained layer.
    ///
    /// Arguments:
    ///
    ///  * `index` - the position of the layer within its network.
    ///  * `architecture` - the number of neurons along each dimension.
    ///  * `in_layer` - the layer feeding this one.
    ///  * `rectifier` - the activation function to be used for this layer's
    ///                  output.
    ///
    /// Each neuron's incoming weights start out random and sum to 1.
    pub fn new<R>(graph: &mut Graph,
                  index: usize,
                  architecture: &[usize],
                  in_layer: &dyn Layer,
                  rectifier: Rectifier,
                  rng: &mut R)
                  -> Result<Self>
        where R: Rng + ?Sized
    {
        let shape = Shape::new(architecture)?;
        let sources = in_layer.neurons();
        let grid = Grid::build(shape, None, |_| {
            let neuron =
                graph.add_neuron(NeuronKind::Weighted(rectifier), index);
            let weights = layers::normalized_weights(rng, sources.len());
            for (&source, weight) in sources.iter().zip(weights) {
                let param = graph.add_param(weight);
                graph.connect(source, neuron, Weight::Owned(param));
            }
            neuron
        });
        debug!(layer = index,
               architecture = ?architecture,
               neurons = grid.len(),
               "built fully connected layer");
        Ok(FullyConnected {
            rectifier: Some(rectifier),
            grid,
        })
    }
}

impl Layer for FullyConnected {
    fn kind(&self) -> LayerKind {
        LayerKind::FullyConnected
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn rectifier(&self) -> Option<Rectifier> {
        self.rectifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::CoordKey;
    use crate::errors::NetError;

    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn input_layer_sizes() {
        for (architecture, expected) in &[(vec![3], 3),
                                          (vec![3, 4], 12),
                                          (vec![3, 4, 5], 60),
                                          (vec![3, 4, 5, 6], 360)] {
            let mut graph = Graph::new();
            let layer = FullyConnected::input(&mut graph, 0, architecture)
                .unwrap();
            assert_eq!(layer.neurons().len(), *expected);
            assert_eq!(graph.neuron_count(), *expected);
            assert_eq!(layer.rectifier(), None);
            assert_eq!(layer.channels(), None);
        }
    }

    #[test]
    fn empty_architecture() {
        let mut graph = Graph::new();
        let err = FullyConnected::input(&mut graph, 0, &[]).unwrap_err();
        assert!(matches!(err, NetError::InvalidArchitecture { .. }));
        assert_eq!(graph.neuron_count(), 0);
    }

    #[test]
    fn hidden_layer_sizes() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for (architecture, expected) in &[(vec![3], 3),
                                          (vec![3, 4], 12),
                                          (vec![3, 4, 5], 60)] {
            let mut graph = Graph::new();
            let input = FullyConnected::input(&mut graph, 0, &[2]).unwrap();
            let layer = FullyConnected::new(&mut graph,
                                            1,
                                            architecture,
                                            &input,
                                            Rectifier::ReLU,
                                            &mut rng)
                .unwrap();
            assert_eq!(layer.neurons().len(), *expected);
            assert_eq!(layer.architecture(), &architecture[..]);
        }
    }

    #[test]
    fn hidden_layer_rejects_zero_dimension() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[2]).unwrap();
        let result = FullyConnected::new(&mut graph,
                                         1,
                                         &[4, 0],
                                         &input,
                                         Rectifier::ReLU,
                                         &mut rng);
        assert!(matches!(result, Err(NetError::InvalidArchitecture { .. })));
        assert_eq!(graph.neuron_count(), 2);
    }

    #[test]
    fn connects_to_every_input_neuron() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[2, 3]).unwrap();
        let layer = FullyConnected::new(&mut graph,
                                        1,
                                        &[4],
                                        &input,
                                        Rectifier::Sigmoid,
                                        &mut rng)
            .unwrap();
        assert_eq!(graph.connection_count(), 24);
        for &id in input.neurons() {
            assert_eq!(graph.neuron(id).outgoing().len(), 4);
        }
        for &id in layer.neurons() {
            let neuron = graph.neuron(id);
            assert_eq!(neuron.incoming().len(), 6);
            assert_eq!(neuron.kind(), NeuronKind::Weighted(Rectifier::Sigmoid));
            assert_eq!(neuron.layer(), 1);
        }
    }

    #[test]
    fn incoming_weights_sum_to_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[5]).unwrap();
        let layer = FullyConnected::new(&mut graph,
                                        1,
                                        &[3],
                                        &input,
                                        Rectifier::Identity,
                                        &mut rng)
            .unwrap();
        for &id in layer.neurons() {
            let sum: f64 = graph.neuron(id)
                .incoming()
                .iter()
                .map(|&c| graph.weight(graph.connection(c).weight))
                .sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn neurons_are_addressable_by_coordinate() {
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[2, 2]).unwrap();
        let keys: Vec<_> = input.grid().keys().collect();
        assert_eq!(keys[3], CoordKey::flat(vec![1, 1]));
        assert_eq!(input.neuron_at(&keys[3]), Some(input.neurons()[3]));
    }
}
