use crate::architecture::{CoordKey, Shape};
use crate::errors::{NetError, Result};
use crate::graph::{Graph, NeuronId, NeuronKind, Weight};
use crate::layers::{Grid, Layer, LayerKind};
use crate::rectifier::Rectifier;

use itertools::iproduct;
use tracing::debug;

/// A max-pooling layer.
///
/// Each pooling neuron watches a `spatial_extent × spatial_extent` window
/// over the first two dimensions of one input channel and passes on the
/// largest activation in it. Pooling connections have a fixed weight of 1
/// and the layer has nothing to train.
#[derive(Debug)]
pub struct Pooling {
    spatial_extent: usize,
    grid: Grid,
}

impl Pooling {
    pub fn new(graph: &mut Graph,
               index: usize,
               spatial_extent: usize,
               in_layer: &dyn Layer)
               -> Result<Self> {
        let input = in_layer.architecture();
        let architecture = output_architecture(input, spatial_extent)?;
        let channels = in_layer.channels().ok_or_else(|| {
            NetError::pooling(spatial_extent,
                              input,
                              "input layer has no channels to pool over")
        })?;
        let out_shape = Shape::new(&architecture)?;

        let mut plan: Vec<Vec<NeuronId>> =
            Vec::with_capacity(channels * out_shape.len());
        for channel in 0..channels {
            for position in out_shape.coords() {
                let mut window = Vec::with_capacity(spatial_extent *
                                                    spatial_extent);
                for (i, j) in iproduct!(0..spatial_extent, 0..spatial_extent) {
                    let mut coord = position.clone();
                    coord[0] = position[0] * spatial_extent + i;
                    coord[1] = position[1] * spatial_extent + j;
                    let key = CoordKey::channel(channel, coord);
                    let source = in_layer.neuron_at(&key).ok_or_else(|| {
                        NetError::pooling(spatial_extent,
                                          input,
                                          format!("window reaches outside \
                                                   input at {}",
                                                  key))
                    })?;
                    window.push(source);
                }
                plan.push(window);
            }
        }

        let mut windows = plan.into_iter();
        let grid = Grid::build(out_shape, Some(channels), |_| {
            let neuron = graph.add_neuron(NeuronKind::Pooling, index);
            for source in windows.next().into_iter().flatten() {
                graph.connect(source, neuron, Weight::Fixed(1.0));
            }
            neuron
        });
        debug!(layer = index,
               spatial_extent,
               architecture = ?architecture,
               neurons = grid.len(),
               "built pooling layer");

        Ok(Pooling {
            spatial_extent,
            grid,
        })
    }

    pub fn spatial_extent(&self) -> usize {
        self.spatial_extent
    }
}

impl Layer for Pooling {
    fn kind(&self) -> LayerKind {
        LayerKind::Pooling
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn rectifier(&self) -> Option<Rectifier> {
        None
    }
}

/// Divides the first two dimensions of `input` by `spatial_extent`, keeping
/// the rest.
pub fn output_architecture(input: &[usize],
                           spatial_extent: usize)
                           -> Result<Vec<usize>> {
    if spatial_extent < 2 {
        return Err(NetError::pooling(spatial_extent,
                                     input,
                                     "spatial extent must be an integer \
                                      greater than 1"));
    }
    if input.len() < 2 {
        return Err(NetError::pooling(spatial_extent,
                                     input,
                                     "input must have at least two \
                                      dimensions"));
    }
    let mut architecture = input.to_vec();
    for dim in architecture.iter_mut().take(2) {
        if *dim % spatial_extent != 0 {
            let reason = format!("{} % {} = {}",
                                 dim,
                                 spatial_extent,
                                 *dim % spatial_extent);
            return Err(NetError::pooling(spatial_extent, input, reason));
        }
        *dim /= spatial_extent;
    }
    Ok(architecture)
}
