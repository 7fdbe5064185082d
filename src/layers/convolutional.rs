use crate::architecture::{CoordKey, Shape};
use crate::errors::{NetError, Result};
use crate::graph::{Graph, NeuronId, NeuronKind, ParamId, Weight};
use crate::layers::{self, Grid, Layer, LayerKind};
use crate::rectifier::Rectifier;

use rand::Rng;
use tracing::debug;

/// One output channel's set of shared weights.
///
/// A filter holds one parameter per coordinate of its own architecture.
/// Every connection at the same relative offset uses the same parameter,
/// whatever the output position and whatever the input channel.
#[derive(Clone, Debug)]
pub struct Filter {
    shape: Shape,
    params: Vec<ParamId>,
}

impl Filter {
    fn new<R>(graph: &mut Graph, shape: Shape, rng: &mut R) -> Self
        where R: Rng + ?Sized
    {
        let params = layers::normalized_weights(rng, shape.len())
            .into_iter()
            .map(|weight| graph.add_param(weight))
            .collect();
        Filter { shape, params }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Parameters in row-major offset order.
    pub fn params(&self) -> &[ParamId] {
        &self.params
    }

    /// The parameter used at relative `offset`.
    pub fn param_at(&self, offset: &[usize]) -> Option<ParamId> {
        self.shape.offset(offset).map(|i| self.params[i])
    }

    /// Current weight values in row-major offset order.
    pub fn weights(&self, graph: &Graph) -> Vec<f64> {
        self.params.iter().map(|&p| graph.param(p)).collect()
    }
}

/// A convolutional layer with `depth` filters.
#[derive(Debug)]
pub struct Convolutional {
    stride: usize,
    rectifier: Rectifier,
    filters: Vec<Filter>,
    grid: Grid,
}

impl Convolutional {
    /// Builds a convolutional layer over `in_layer`.
    ///
    /// The layer's spatial architecture is derived from the input's and the
    /// filter's: see `output_architecture`. If `in_layer` has channels, each
    /// offset of the filter connects to that input coordinate in every
    /// channel.
    pub fn new<R>(graph: &mut Graph,
                  index: usize,
                  depth: usize,
                  filter_architecture: &[usize],
                  stride: usize,
                  in_layer: &dyn Layer,
                  rectifier: Rectifier,
                  rng: &mut R)
                  -> Result<Self>
        where R: Rng + ?Sized
    {
        let filter_shape = Shape::new(filter_architecture)?;
        if depth == 0 {
            return Err(NetError::architecture(filter_architecture,
                                              "convolution depth must be \
                                               positive"));
        }
        let architecture = output_architecture(in_layer.architecture(),
                                               filter_architecture,
                                               stride)?;
        let out_shape = Shape::new(&architecture)?;

        // Resolve every source neuron before touching the graph so that a
        // failure leaves nothing behind.
        let offsets: Vec<Vec<usize>> = filter_shape.coords().collect();
        let in_channels: Vec<Option<usize>> = match in_layer.channels() {
            Some(n) => (0..n).map(Some).collect(),
            None => vec![None],
        };
        let mut plan: Vec<Vec<(usize, NeuronId)>> =
            Vec::with_capacity(out_shape.len());
        for position in out_shape.coords() {
            let mut sources =
                Vec::with_capacity(offsets.len() * in_channels.len());
            for (o, offset) in offsets.iter().enumerate() {
                let coord: Vec<usize> = position.iter()
                    .zip(offset)
                    .map(|(&c, &d)| c * stride + d)
                    .collect();
                for &filter in &in_channels {
                    let key = CoordKey {
                        filter,
                        position: coord.clone(),
                    };
                    let source = in_layer.neuron_at(&key).ok_or_else(|| {
                        NetError::architecture(
                            filter_architecture,
                            format!("filter reaches outside input at {}", key),
                        )
                    })?;
                    sources.push((o, source));
                }
            }
            plan.push(sources);
        }

        let filters: Vec<Filter> = (0..depth)
            .map(|_| Filter::new(graph, filter_shape.clone(), rng))
            .collect();

        let positions = plan.len();
        let mut next = 0;
        let grid = Grid::build(out_shape, Some(depth), |_| {
            let filter = &filters[next / positions];
            let sources = &plan[next % positions];
            next += 1;
            let neuron =
                graph.add_neuron(NeuronKind::Weighted(rectifier), index);
            for &(offset, source) in sources {
                graph.connect(source,
                              neuron,
                              Weight::Shared(filter.params[offset]));
            }
            neuron
        });
        debug!(layer = index,
               depth,
               stride,
               architecture = ?architecture,
               neurons = grid.len(),
               "built convolutional layer");

        Ok(Convolutional {
            stride,
            rectifier,
            filters,
            grid,
        })
    }

    pub fn depth(&self) -> usize {
        self.filters.len()
    }

    pub fn stride(&self) -> usize {
        self.stride
    }
}

impl Layer for Convolutional {
    fn kind(&self) -> LayerKind {
        LayerKind::Convolutional
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn rectifier(&self) -> Option<Rectifier> {
        Some(self.rectifier)
    }

    fn filters(&self) -> &[Filter] {
        &self.filters
    }
}

/// Computes the spatial architecture of a convolution.
///
/// Along each dimension the output has
/// `(input - (filter - stride)) / stride` positions, which must be a
/// positive integer.
pub fn output_architecture(input: &[usize],
                           filter: &[usize],
                           stride: usize)
                           -> Result<Vec<usize>> {
    if input.len() != filter.len() {
        return Err(NetError::architecture(
            filter,
            format!("filter has {} dimensions but input has {}",
                    filter.len(),
                    input.len()),
        ));
    }
    input.iter()
        .zip(filter)
        .map(|(&input_length, &filter_length)| {
            let result = (input_length as f64 -
                          (filter_length as f64 - stride as f64)) /
                         stride as f64;
            if result.is_finite() && result.fract() == 0.0 && result >= 1.0 {
                Ok(result as usize)
            } else {
                Err(NetError::IncompatibleFilter {
                    input_length,
                    filter_length,
                    stride,
                    result,
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::FullyConnected;

    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn conv(graph: &mut Graph,
            in_layer: &dyn Layer,
            depth: usize,
            filter: &[usize],
            stride: usize)
            -> Result<Convolutional> {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        Convolutional::new(graph,
                           1,
                           depth,
                           filter,
                           stride,
                           in_layer,
                           Rectifier::ReLU,
                           &mut rng)
    }

    #[test]
    fn output_architecture_formula() {
        assert_eq!(output_architecture(&[9, 9, 3], &[3, 3, 1], 1).unwrap(),
                   vec![7, 7, 3]);
        assert_eq!(output_architecture(&[6, 6, 3], &[3, 3, 3], 3).unwrap(),
                   vec![2, 2, 1]);
        assert_eq!(output_architecture(&[8, 8], &[2, 2], 2).unwrap(),
                   vec![4, 4]);
    }

    #[test]
    fn neuron_count_is_depth_times_positions() {
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[6, 6, 3]).unwrap();
        let layer = conv(&mut graph, &input, 1, &[3, 3, 3], 3).unwrap();
        assert_eq!(layer.neurons().len(), 4);
        assert_eq!(layer.architecture(), &[2, 2, 1]);

        let layer = conv(&mut graph, &input, 3, &[3, 3, 3], 3).unwrap();
        assert_eq!(layer.neurons().len(), 12);
        assert_eq!(layer.channels(), Some(3));
        assert_eq!(layer.depth(), 3);
    }

    #[test]
    fn non_integer_result_is_incompatible() {
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[3, 3, 3]).unwrap();
        let before = graph.neuron_count();
        match conv(&mut graph, &input, 1, &[2, 2, 2], 2) {
            Err(NetError::IncompatibleFilter { input_length,
                                               filter_length,
                                               stride,
                                               result }) => {
                assert_eq!(input_length, 3);
                assert_eq!(filter_length, 2);
                assert_eq!(stride, 2);
                assert_abs_diff_eq!(result, 1.5);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(graph.neuron_count(), before);
        assert!(graph.params().is_empty());
    }

    #[test]
    fn filter_larger_than_input_is_incompatible() {
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[2, 4]).unwrap();
        match conv(&mut graph, &input, 1, &[3, 1], 1) {
            Err(NetError::IncompatibleFilter { result, .. }) => {
                assert_abs_diff_eq!(result, 0.0)
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn overshooting_stride_is_incompatible() {
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[5]).unwrap();
        match conv(&mut graph, &input, 1, &[2], 2) {
            Err(NetError::IncompatibleFilter { result, .. }) => {
                assert_abs_diff_eq!(result, 2.5)
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(conv(&mut graph, &input, 1, &[2], 0),
                         Err(NetError::IncompatibleFilter { .. })));
    }

    #[test]
    fn filter_rank_must_match_input() {
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[4, 4, 3]).unwrap();
        assert!(matches!(conv(&mut graph, &input, 1, &[2, 2], 2),
                         Err(NetError::InvalidArchitecture { .. })));
        assert!(matches!(conv(&mut graph, &input, 0, &[2, 2, 3], 2),
                         Err(NetError::InvalidArchitecture { .. })));
    }

    #[test]
    fn filter_weights_sum_to_one() {
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[9, 9, 3]).unwrap();
        let layer = conv(&mut graph, &input, 4, &[3, 3, 1], 1).unwrap();
        assert_eq!(layer.filters().len(), 4);
        for filter in layer.filters() {
            let weights = filter.weights(&graph);
            assert_eq!(weights.len(), 9);
            assert_abs_diff_eq!(weights.iter().sum::<f64>(), 1.0,
                                epsilon = 1e-12);
        }
    }

    #[test]
    fn weights_are_shared_across_positions() {
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[4, 4]).unwrap();
        let layer = conv(&mut graph, &input, 2, &[2, 2], 2).unwrap();
        assert_eq!(graph.params().len(), 8);
        for key in layer.grid().keys() {
            let filter = &layer.filters()[key.filter.unwrap()];
            let neuron = graph.neuron(layer.neuron_at(&key).unwrap());
            let params: Vec<_> = neuron.incoming()
                .iter()
                .map(|&c| graph.connection(c).weight)
                .collect();
            let expected: Vec<_> =
                filter.params().iter().map(|&p| Weight::Shared(p)).collect();
            assert_eq!(params, expected);
        }
    }

    #[test]
    fn connects_to_strided_input_coordinates() {
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[4, 4]).unwrap();
        let layer = conv(&mut graph, &input, 1, &[2, 2], 2).unwrap();
        let neuron = layer.neuron_at(&CoordKey::channel(0, vec![1, 0]))
            .unwrap();
        let sources: Vec<_> = graph.neuron(neuron)
            .incoming()
            .iter()
            .map(|&c| graph.connection(c).source)
            .collect();
        let expected: Vec<_> = [[2, 0], [2, 1], [3, 0], [3, 1]]
            .iter()
            .map(|c| input.neuron_at(&CoordKey::flat(c.to_vec())).unwrap())
            .collect();
        assert_eq!(sources, expected);
    }

    #[test]
    fn channelled_input_shares_weight_across_channels() {
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, &[4, 4, 1]).unwrap();
        let first = conv(&mut graph, &input, 2, &[2, 2, 1], 1).unwrap();
        assert_eq!(first.architecture(), &[3, 3, 1]);
        let second = conv(&mut graph, &first, 1, &[2, 2, 1], 1).unwrap();
        assert_eq!(second.architecture(), &[2, 2, 1]);

        let filter = &second.filters()[0];
        for &id in second.neurons() {
            let incoming = graph.neuron(id).incoming();
            // 4 offsets, each wired into both input channels
            assert_eq!(incoming.len(), 8);
            for (pair, &param) in incoming.chunks(2).zip(filter.params()) {
                let a = graph.connection(pair[0]);
                let b = graph.connection(pair[1]);
                assert_eq!(a.weight, Weight::Shared(param));
                assert_eq!(b.weight, Weight::Shared(param));
                assert_eq!(graph.neuron(a.source).layer(), 1);
                assert_ne!(a.source, b.source);
            }
        }
    }
}
