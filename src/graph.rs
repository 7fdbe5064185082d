//! The neuron graph.
//!
//! Every neuron, connection and trainable parameter of a network lives in a
//! single `Graph` arena and is referred to by index. Convolutional weight
//! sharing is expressed by several connections holding the same `ParamId`.

use crate::rectifier::Rectifier;

pub type NeuronId = usize;
pub type ConnectionId = usize;
pub type ParamId = usize;

/// The weight carried by a connection.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Weight {
    /// A parameter used by this connection alone.
    Owned(ParamId),
    /// A filter parameter shared with other connections.
    Shared(ParamId),
    /// A constant that is never trained.
    Fixed(f64),
}

impl Weight {
    /// The trainable parameter behind this weight, if any.
    pub fn param(&self) -> Option<ParamId> {
        match *self {
            Weight::Owned(id) | Weight::Shared(id) => Some(id),
            Weight::Fixed(_) => None,
        }
    }
}

/// A directed edge between two neurons.
#[derive(Clone, Debug)]
pub struct Connection {
    pub source: NeuronId,
    pub destination: NeuronId,
    pub weight: Weight,
}

/// How a neuron computes its activation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NeuronKind {
    /// Holds an externally assigned value.
    Input,
    /// Rectifies a weighted sum of its inputs.
    Weighted(Rectifier),
    /// Passes on the largest of its inputs.
    Pooling,
}

#[derive(Clone, Debug)]
pub struct Neuron {
    kind: NeuronKind,
    layer: usize,
    bias: f64,
    activation: f64,
    derivative: f64,
    error: f64,
    incoming: Vec<ConnectionId>,
    outgoing: Vec<ConnectionId>,
    /// For pooling neurons, the input picked by the last activation.
    selected: Option<NeuronId>,
}

impl Neuron {
    fn new(kind: NeuronKind, layer: usize) -> Self {
        Neuron {
            kind,
            layer,
            bias: 0.0,
            activation: 0.0,
            derivative: 0.0,
            error: 0.0,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            selected: None,
        }
    }

    pub fn kind(&self) -> NeuronKind {
        self.kind
    }

    /// Index of the owning layer within its network.
    pub fn layer(&self) -> usize {
        self.layer
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn activation(&self) -> f64 {
        self.activation
    }

    pub fn derivative(&self) -> f64 {
        self.derivative
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn incoming(&self) -> &[ConnectionId] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[ConnectionId] {
        &self.outgoing
    }

    /// The input a pooling neuron routed its last activation from.
    pub fn selected(&self) -> Option<NeuronId> {
        self.selected
    }
}

/// Arena of neurons, connections and trainable parameters.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    neurons: Vec<Neuron>,
    connections: Vec<Connection>,
    params: Vec<f64>,
}

impl Graph {
    pub fn new() -> Self {
        Graph::default()
    }

    pub fn add_neuron(&mut self, kind: NeuronKind, layer: usize) -> NeuronId {
        self.neurons.push(Neuron::new(kind, layer));
        self.neurons.len() - 1
    }

    pub fn add_param(&mut self, value: f64) -> ParamId {
        self.params.push(value);
        self.params.len() - 1
    }

    /// Connects `source` to `destination`, registering the edge on both
    /// ends.
    pub fn connect(&mut self,
                   source: NeuronId,
                   destination: NeuronId,
                   weight: Weight)
                   -> ConnectionId {
        let id = self.connections.len();
        self.connections.push(Connection {
            source,
            destination,
            weight,
        });
        self.neurons[source].outgoing.push(id);
        self.neurons[destination].incoming.push(id);
        id
    }

    pub fn neuron(&self, id: NeuronId) -> &Neuron {
        &self.neurons[id]
    }

    pub fn connection(&self, id: ConnectionId) -> &Connection {
        &self.connections[id]
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The trainable parameter table.
    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn param(&self, id: ParamId) -> f64 {
        self.params[id]
    }

    /// Resolves the current value of `weight`.
    pub fn weight(&self, weight: Weight) -> f64 {
        match weight {
            Weight::Owned(id) | Weight::Shared(id) => self.params[id],
            Weight::Fixed(value) => value,
        }
    }

    pub(crate) fn set_activation(&mut self, id: NeuronId, value: f64) {
        self.neurons[id].activation = value;
    }

    /// Recomputes the activation and derivative of neuron `id` from its
    /// inputs' cached activations.
    pub fn activate(&mut self, id: NeuronId) {
        let neuron = &self.neurons[id];
        match neuron.kind {
            NeuronKind::Input => {}
            NeuronKind::Pooling => {
                let mut max = f64::NEG_INFINITY;
                let mut selected = None;
                for &c in &neuron.incoming {
                    let source = self.connections[c].source;
                    let activation = self.neurons[source].activation;
                    if activation > max {
                        max = activation;
                        selected = Some(source);
                    }
                }
                // No rectifier: take the winning input's derivative.
                let derivative =
                    selected.map_or(0.0, |s| self.neurons[s].derivative);
                let neuron = &mut self.neurons[id];
                neuron.activation = max;
                neuron.derivative = derivative;
                neuron.selected = selected;
            }
            NeuronKind::Weighted(rectifier) => {
                let sum = neuron.incoming.iter().fold(neuron.bias, |sum, &c| {
                    let connection = &self.connections[c];
                    sum + self.weight(connection.weight) *
                          self.neurons[connection.source].activation
                });
                let neuron = &mut self.neurons[id];
                neuron.activation = rectifier.f(sum);
                neuron.derivative = rectifier.fprime(sum);
            }
        }
    }

    /// Computes the error of neuron `id` and applies its weight and bias
    /// updates.
    ///
    /// With a `target` the neuron is treated as an output neuron and its
    /// error is `target - activation`. Otherwise the error is gathered from
    /// the neurons it feeds, reading their weights as they currently stand.
    pub fn propagate(&mut self,
                     id: NeuronId,
                     target: Option<f64>,
                     learning_rate: f64) {
        let error = match target {
            Some(target) => target - self.neurons[id].activation,
            None => {
                let downstream: f64 = self.neurons[id]
                    .outgoing
                    .iter()
                    .map(|&c| self.downstream_error(c))
                    .sum();
                self.neurons[id].derivative * downstream
            }
        };

        let Graph { neurons, connections, params } = self;
        let neuron = &neurons[id];
        if neuron.kind != NeuronKind::Pooling {
            for &c in &neuron.incoming {
                let connection = &connections[c];
                if let Some(param) = connection.weight.param() {
                    params[param] += learning_rate * error *
                                     neurons[connection.source].activation;
                }
            }
        }

        let neuron = &mut neurons[id];
        neuron.error = error;
        if neuron.kind != NeuronKind::Pooling {
            neuron.bias += learning_rate * error;
        }
    }

    /// The error contribution flowing back along connection `c`.
    fn downstream_error(&self, c: ConnectionId) -> f64 {
        let connection = &self.connections[c];
        let destination = &self.neurons[connection.destination];
        if destination.kind == NeuronKind::Pooling &&
           destination.selected != Some(connection.source) {
            return 0.0;
        }
        self.weight(connection.weight) * destination.error
    }
}
