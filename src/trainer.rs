//! Utilities for training networks.

use crate::errors::{NetError, Result};
use crate::feed_forward::Network;
use crate::tensor::Tensor;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

/// A labelled training example.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub input: Tensor,
    pub target: Vec<f64>,
}

impl Example {
    pub fn new<I: Into<Tensor>>(input: I, target: &[f64]) -> Self {
        Example {
            input: input.into(),
            target: target.to_vec(),
        }
    }

    /// Reads a JSON array of `{"input": ..., "target": [...]}` records.
    pub fn load_all<P: AsRef<Path>>(path: P) -> Result<Vec<Example>> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// A builder for training a network.
#[derive(Debug)]
pub struct Trainer {
    network: Network,
    logging: Logging,
    stop_condition: StopCondition,
}

impl Trainer {
    /// Creates a new Trainer instance.
    ///
    /// The trainer is initialized with some default values. These defaults are:
    ///
    /// * Stops after 1000 epochs.
    /// * Logs on training completion.
    pub fn new(network: Network) -> Self {
        Trainer {
            network,
            logging: Logging::Completion,
            stop_condition: StopCondition::Epochs(1000),
        }
    }

    /// Sets the type of logging to be emitted during training.
    pub fn logging(mut self, logging: Logging) -> Self {
        self.logging = logging;
        self
    }

    /// Sets the condition to finish training.
    pub fn stop_condition<C>(mut self, condition: C) -> Self
        where C: Into<StopCondition>
    {
        self.stop_condition = condition.into();
        self
    }

    /// Trains the network on the provided labelled data.
    ///
    /// Each epoch feeds every example to `Network::learn` once, in order.
    ///
    /// Returns:
    ///   The trained network, or an error if an example does not fit it.
    pub fn train(mut self, examples: &[Example]) -> Result<Network> {
        if examples.is_empty() {
            return Err(NetError::InvalidInput("no training examples"
                .to_string()));
        }

        let start_time = Instant::now();
        let mut epoch = 0;
        let mut accuracy;
        loop {
            let successes = self.network.successes();
            for example in examples {
                self.network.learn(&example.input, &example.target)?;
            }
            accuracy = (self.network.successes() - successes) as f64 /
                       examples.len() as f64;
            epoch += 1;

            self.logging.epoch(epoch, accuracy);
            if self.stop_condition.should_stop(epoch, accuracy, start_time) {
                break;
            }
        }
        self.logging.completion(epoch, accuracy, start_time);
        Ok(self.network)
    }
}

/// Fraction of `examples` the network currently predicts exactly.
///
/// Only runs `Network::predict`, so weights and training counters are left
/// alone.
pub fn evaluate(network: &mut Network, examples: &[Example]) -> Result<f64> {
    if examples.is_empty() {
        return Ok(0.0);
    }
    let mut correct = 0;
    for example in examples {
        if network.predict(&example.input)? == example.target {
            correct += 1;
        }
    }
    Ok(correct as f64 / examples.len() as f64)
}

/// Logging frequency to use during training
#[derive(Copy, Clone, Debug)]
pub enum Logging {
    /// Nothing will be logged
    Silent,
    /// A summary will be logged at completion
    Completion,
    /// A summary will be logged after every `n` epochs
    Epochs(usize),
}

impl Logging {
    /// Performs logging at the current `epoch` of training.
    fn epoch(&self, epoch: usize, accuracy: f64) {
        if let Logging::Epochs(freq) = *self {
            if freq > 0 && epoch % freq == 0 {
                info!("Epoch {}:\taccuracy={:.2}%", epoch, accuracy * 100.0);
            }
        }
    }

    /// Performs logging at the end of training.
    fn completion(&self, epochs: usize, accuracy: f64, start_time: Instant) {
        if let Logging::Silent = *self {
            return;
        }
        info!("Ran {} epochs in {:.1} seconds.",
              epochs,
              start_time.elapsed().as_secs_f64());
        info!("Final accuracy: {:.2}%", accuracy * 100.0);
    }
}

/// When to stop training
#[derive(Copy, Clone, Debug)]
pub enum StopCondition {
    /// Stops after the provided number of epochs
    Epochs(usize),
    /// Stops once an epoch's exact-match accuracy reaches the threshold
    Accuracy(f64),
    /// Stops after the provided duration
    Duration(Duration),
}

impl From<Duration> for StopCondition {
    fn from(duration: Duration) -> StopCondition {
        StopCondition::Duration(duration)
    }
}

impl StopCondition {
    /// Returns true if training is complete.
    fn should_stop(&self,
                   epoch: usize,
                   accuracy: f64,
                   start_time: Instant)
                   -> bool {
        match *self {
            StopCondition::Epochs(epochs) => epoch >= epochs,
            StopCondition::Accuracy(threshold) => accuracy >= threshold,
            StopCondition::Duration(duration) => start_time.elapsed() > duration,
        }
    }
}
