//! Layer kinds and the configuration surface used to assemble them.

mod convolutional;
mod dense;
mod pooling;

pub use self::convolutional::{Convolutional, Filter};
pub use self::dense::FullyConnected;
pub use self::pooling::Pooling;

use crate::architecture::{CoordKey, Shape};
use crate::errors::Result;
use crate::graph::{Graph, NeuronId};
use crate::rectifier::Rectifier;

use rand::distributions::{Distribution, Open01};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three supported layer kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayerKind {
    FullyConnected,
    Convolutional,
    Pooling,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            LayerKind::FullyConnected => "FULLY_CONNECTED",
            LayerKind::Convolutional => "CONVOLUTIONAL",
            LayerKind::Pooling => "POOLING",
        };
        f.write_str(name)
    }
}

/// A layer of neurons living in a network's `Graph`.
///
/// Layers only describe topology: which neurons they own and where those
/// neurons sit in the layer's coordinate space. All numeric state lives in
/// the graph.
pub trait Layer: fmt::Debug {
    fn kind(&self) -> LayerKind;

    /// The index of the layer's neurons by coordinate.
    fn grid(&self) -> &Grid;

    /// The rectifier applied by this layer's neurons, if it has one.
    fn rectifier(&self) -> Option<Rectifier>;

    /// Shared weight sets, for layers that have them.
    fn filters(&self) -> &[Filter] {
        &[]
    }

    /// The spatial architecture of the layer.
    fn architecture(&self) -> &[usize] {
        self.grid().shape().dims()
    }

    /// The number of channels, or `None` for a flat layer.
    fn channels(&self) -> Option<usize> {
        self.grid().channels()
    }

    /// All neurons in canonical order.
    fn neurons(&self) -> &[NeuronId] {
        self.grid().neurons()
    }

    fn neuron_at(&self, key: &CoordKey) -> Option<NeuronId> {
        self.grid().get(key)
    }

    /// Activates every neuron of the layer.
    fn forward(&self, graph: &mut Graph) {
        for &id in self.neurons() {
            graph.activate(id);
        }
    }

    /// Propagates error through every neuron of the layer, updating its
    /// weights as it goes. `targets` is given only for the output layer.
    fn backward(&self,
                graph: &mut Graph,
                targets: Option<&[f64]>,
                learning_rate: f64) {
        for (i, &id) in self.neurons().iter().enumerate() {
            let target = targets.and_then(|t| t.get(i).copied());
            graph.propagate(id, target, learning_rate);
        }
    }
}

/// Neurons of one layer indexed by `CoordKey`.
///
/// Neurons are stored channel-major, then row-major over the spatial
/// architecture.
#[derive(Clone, Debug)]
pub struct Grid {
    shape: Shape,
    channels: Option<usize>,
    neurons: Vec<NeuronId>,
}

impl Grid {
    /// Allocates one neuron per key, calling `make` in canonical order.
    pub(crate) fn build<F>(shape: Shape, channels: Option<usize>, mut make: F) -> Self
        where F: FnMut(&CoordKey) -> NeuronId
    {
        let mut grid = Grid {
            shape,
            channels,
            neurons: Vec::new(),
        };
        let keys: Vec<CoordKey> = grid.keys().collect();
        grid.neurons = keys.iter().map(|key| make(key)).collect();
        grid
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn channels(&self) -> Option<usize> {
        self.channels
    }

    pub fn neurons(&self) -> &[NeuronId] {
        &self.neurons
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn get(&self, key: &CoordKey) -> Option<NeuronId> {
        let offset = self.shape.offset(&key.position)?;
        let channel = match (self.channels, key.filter) {
            (None, None) => 0,
            (Some(n), Some(f)) if f < n => f,
            _ => return None,
        };
        self.neurons.get(channel * self.shape.len() + offset).copied()
    }

    /// Every key of the grid in canonical order.
    pub fn keys(&self) -> Box<dyn Iterator<Item = CoordKey> + '_> {
        match self.channels {
            None => Box::new(self.shape.coords().map(CoordKey::flat)),
            Some(n) => Box::new((0..n).flat_map(move |f| {
                self.shape.coords().map(move |c| CoordKey::channel(f, c))
            })),
        }
    }
}

/// Configuration for one non-input layer.
///
/// Serialized as `{"type": "CONVOLUTIONAL", "options": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerSpec {
    FullyConnected {
        architecture: Vec<usize>,
        rectifier: Rectifier,
    },
    Convolutional {
        depth: usize,
        filter_architecture: Vec<usize>,
        stride: usize,
        rectifier: Rectifier,
    },
    Pooling {
        spatial_extent: usize,
    },
}

impl LayerSpec {
    pub fn kind(&self) -> LayerKind {
        match *self {
            LayerSpec::FullyConnected { .. } => LayerKind::FullyConnected,
            LayerSpec::Convolutional { .. } => LayerKind::Convolutional,
            LayerSpec::Pooling { .. } => LayerKind::Pooling,
        }
    }

    /// Builds the layer at position `index`, wiring it to `in_layer`.
    pub(crate) fn build<R>(&self,
                           graph: &mut Graph,
                           index: usize,
                           in_layer: &dyn Layer,
                           rng: &mut R)
                           -> Result<Box<dyn Layer>>
        where R: Rng + ?Sized
    {
        let layer: Box<dyn Layer> = match *self {
            LayerSpec::FullyConnected { ref architecture, rectifier } => {
                Box::new(FullyConnected::new(graph,
                                             index,
                                             architecture,
                                             in_layer,
                                             rectifier,
                                             rng)?)
            }
            LayerSpec::Convolutional { depth,
                                       ref filter_architecture,
                                       stride,
                                       rectifier } => {
                Box::new(Convolutional::new(graph,
                                            index,
                                            depth,
                                            filter_architecture,
                                            stride,
                                            in_layer,
                                            rectifier,
                                            rng)?)
            }
            LayerSpec::Pooling { spatial_extent } => {
                Box::new(Pooling::new(graph, index, spatial_extent, in_layer)?)
            }
        };
        Ok(layer)
    }
}

/// Draws `n` random positive weights that sum to 1.
pub(crate) fn normalized_weights<R>(rng: &mut R, n: usize) -> Vec<f64>
    where R: Rng + ?Sized
{
    let mut weights: Vec<f64> = (0..n).map(|_| Open01.sample(rng)).collect();
    let sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}
