//! A [Feedforward neural network]
//! (https://en.wikipedia.org/wiki/Feedforward_neural_network) built from
//! individual neurons.
//!
//! # Example
//!
//! Let's set up a small network for the XOR function:
//!
//! ```
//! # use synapses::feed_forward::*;
//! let config = NetworkConfig::new(&[2], 0.01)
//!     .layer(LayerSpec::FullyConnected {
//!         architecture: vec![3],
//!         rectifier: Rectifier::ReLU,
//!     })
//!     .layer(LayerSpec::FullyConnected {
//!         architecture: vec![1],
//!         rectifier: Rectifier::Step,
//!     })
//!     .seed(7);
//! let mut network = Network::from_config(&config).unwrap();
//!
//! // One training step on each example
//! let examples = [([0.0, 0.0], [0.0]),
//!                 ([0.0, 1.0], [1.0]),
//!                 ([1.0, 0.0], [1.0]),
//!                 ([1.0, 1.0], [0.0])];
//! for (input, target) in &examples {
//!     network.learn(&Tensor::from(*input), target).unwrap();
//! }
//! assert_eq!(network.predictions(), 4);
//!
//! let output = network.predict(&Tensor::from([1.0, 0.0])).unwrap();
//! assert_eq!(output.len(), 1);
//! ```

pub use crate::config::NetworkConfig;
pub use crate::errors::{NetError, Result};
pub use crate::layers::{Layer, LayerKind, LayerSpec};
pub use crate::rectifier::Rectifier;
pub use crate::tensor::Tensor;

use crate::graph::Graph;
use crate::layers::FullyConnected;

use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// A strictly layered network of neurons.
///
/// The first layer is always a fully connected input layer. Topology is
/// fixed once a layer is added; training only changes weights and biases.
#[derive(Debug)]
pub struct Network {
    graph: Graph,
    layers: Vec<Box<dyn Layer>>,
    learning_rate: f64,
    rng: ChaCha8Rng,
    predictions: usize,
    successes: usize,
    /// Prediction count at which the next progress line is logged.
    next_report: usize,
}

impl Network {
    /// Creates a network consisting only of an input layer, with weights to
    /// be initialised from the thread RNG.
    pub fn new(input_architecture: &[usize], learning_rate: f64) -> Result<Self> {
        Network::seeded(input_architecture,
                        learning_rate,
                        rand::thread_rng().gen())
    }

    /// Creates a network consisting only of an input layer, whose later
    /// layers draw their initial weights from `seed`.
    pub fn seeded(input_architecture: &[usize],
                  learning_rate: f64,
                  seed: u64)
                  -> Result<Self> {
        let mut graph = Graph::new();
        let input = FullyConnected::input(&mut graph, 0, input_architecture)?;
        Ok(Network {
            graph,
            layers: vec![Box::new(input)],
            learning_rate,
            rng: ChaCha8Rng::seed_from_u64(seed),
            predictions: 0,
            successes: 0,
            next_report: 2,
        })
    }

    /// Builds every layer described by `config`.
    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut network = Network::seeded(&config.input_architecture,
                                          config.learning_rate,
                                          seed)?;
        for spec in &config.layers {
            network.add_layer(spec)?;
        }
        Ok(network)
    }

    /// Appends a layer fed by the current output layer.
    pub fn add_layer(&mut self, spec: &LayerSpec) -> Result<&mut Self> {
        let index = self.layers.len();
        let layer = spec.build(&mut self.graph,
                               index,
                               self.layers[index - 1].as_ref(),
                               &mut self.rng)?;
        self.layers.push(layer);
        Ok(self)
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn input_layer(&self) -> &dyn Layer {
        self.layers[0].as_ref()
    }

    pub fn output_layer(&self) -> &dyn Layer {
        self.layers[self.layers.len() - 1].as_ref()
    }

    /// The graph holding every neuron, connection and weight.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, rate: f64) {
        self.learning_rate = rate;
    }

    /// Returns the number of values the network expects as input.
    pub fn input_len(&self) -> usize {
        self.input_layer().neurons().len()
    }

    /// Returns the number of values the network produces.
    pub fn output_len(&self) -> usize {
        self.output_layer().neurons().len()
    }

    /// Cached activations of layer `index`, in canonical neuron order.
    pub fn activations(&self, index: usize) -> Option<Vec<f64>> {
        self.layers.get(index).map(|layer| {
            layer.neurons()
                .iter()
                .map(|&id| self.graph.neuron(id).activation())
                .collect()
        })
    }

    /// Feeds `input` through the network, returning the output layer's
    /// activations.
    ///
    /// `input` must be nested exactly like the input architecture. Weights
    /// are left untouched.
    pub fn predict(&mut self, input: &Tensor) -> Result<Vec<f64>> {
        let values = input.flatten(self.layers[0].grid().shape())?;
        for (&id, value) in self.layers[0].neurons().iter().zip(values) {
            self.graph.set_activation(id, value);
        }
        for layer in &self.layers[1..] {
            layer.forward(&mut self.graph);
        }
        Ok(self.activations(self.layers.len() - 1).unwrap_or_default())
    }

    /// Predicts `input`, records whether the prediction matched `target`
    /// exactly, then adjusts weights towards `target`.
    ///
    /// Layers are updated from the output backwards, and each layer's error
    /// is computed from the weights of the layer after it as already updated
    /// during this call.
    pub fn learn(&mut self, input: &Tensor, target: &[f64]) -> Result<()> {
        if target.len() != self.output_len() {
            return Err(NetError::InvalidInput(format!(
                "target has {} values but the output layer has {} neurons",
                target.len(),
                self.output_len()
            )));
        }
        let prediction = self.predict(input)?;
        let correct = prediction.iter().zip_eq(target).all(|(p, t)| p == t);

        self.predictions += 1;
        if correct {
            self.successes += 1;
        }
        if self.predictions == self.next_report {
            self.next_report *= 2;
            debug!(prediction = ?prediction,
                   target = ?target,
                   "prediction #{}: cumulative {:.2}% accuracy",
                   self.predictions,
                   self.accuracy().unwrap_or(0.0) * 100.0);
        }

        self.back_propagate(target);
        Ok(())
    }

    fn back_propagate(&mut self, target: &[f64]) {
        if let Some((output, hidden)) = self.layers[1..].split_last() {
            output.backward(&mut self.graph, Some(target), self.learning_rate);
            for layer in hidden.iter().rev() {
                layer.backward(&mut self.graph, None, self.learning_rate);
            }
        }
    }

    /// Number of `learn` calls so far.
    pub fn predictions(&self) -> usize {
        self.predictions
    }

    /// Number of `learn` calls whose prediction matched the target exactly.
    pub fn successes(&self) -> usize {
        self.successes
    }

    /// Fraction of exact matches over every `learn` call so far.
    pub fn accuracy(&self) -> Option<f64> {
        if self.predictions == 0 {
            None
        } else {
            Some(self.successes as f64 / self.predictions as f64)
        }
    }
}
